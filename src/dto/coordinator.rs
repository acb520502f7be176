//! DTO definitions used by the coordinator REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{
        AccusationEntity, AnnouncementPriority, AnswerKind, ClueEntity, EvidenceEntity,
        MysteryEntity, SuspectEntity, TeamEntity, VictimEntity,
    },
    dto::{common::SubmissionView, format_system_time},
};

/// Payload to register a new team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateTeamRequest {
    /// Display name for the team.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

/// Staff-visible unlock flags of a team.
#[derive(Debug, Serialize, ToSchema)]
pub struct GateFlagsView {
    pub finale_approved: bool,
    pub side_quest_solved: bool,
    pub formula_completed: bool,
}

/// Full projection of a team for staff screens, join code included.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamDetail {
    pub id: Uuid,
    pub name: String,
    pub join_code: String,
    pub completed_clue_ids: Vec<Uuid>,
    pub completed: usize,
    pub gate_flags: GateFlagsView,
    pub created_at: String,
}

impl From<TeamEntity> for TeamDetail {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            join_code: team.join_code,
            completed: team.completed_clue_ids.len(),
            completed_clue_ids: team.completed_clue_ids,
            gate_flags: GateFlagsView {
                finale_approved: team.gate_flags.finale_approved,
                side_quest_solved: team.gate_flags.side_quest_solved,
                formula_completed: team.gate_flags.formula_completed,
            },
            created_at: format_system_time(team.created_at),
        }
    }
}

/// One row of the live progress board.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamProgressRow {
    pub team_id: Uuid,
    pub name: String,
    pub completed: usize,
    pub total: usize,
    /// Title of the clue the team is currently on, absent when finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_clue_title: Option<String>,
}

/// Live progress of every team.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressOverview {
    pub teams: Vec<TeamProgressRow>,
}

/// Payload to create or update a clue.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClueInput {
    /// Position in the hunt sequence.
    pub order_index: u32,
    /// Short headline shown to teams.
    pub title: String,
    /// The riddle/instructions body.
    pub body: String,
    /// What kind of answer the clue expects.
    pub answer_kind: AnswerKind,
    /// Expected answer or barcode value; ignored for photo clues.
    #[serde(default)]
    pub expected_answer: String,
    /// Optional illustration shown with the clue.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Validate for ClueInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.title.trim().is_empty() {
            let mut err = ValidationError::new("title_required");
            err.message = Some("Clue title must not be empty".into());
            errors.add("title", err);
        }
        if self.body.trim().is_empty() {
            let mut err = ValidationError::new("body_required");
            err.message = Some("Clue body must not be empty".into());
            errors.add("body", err);
        }
        if !matches!(self.answer_kind, AnswerKind::Photo)
            && self.expected_answer.trim().is_empty()
        {
            let mut err = ValidationError::new("expected_answer_required");
            err.message =
                Some("Text and scan clues must declare their expected answer".into());
            errors.add("expected_answer", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Full projection of a clue for staff screens, expected answer included.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClueDetail {
    pub id: Uuid,
    pub order_index: u32,
    pub title: String,
    pub body: String,
    pub answer_kind: AnswerKind,
    pub expected_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: String,
}

impl From<ClueEntity> for ClueDetail {
    fn from(clue: ClueEntity) -> Self {
        Self {
            id: clue.id,
            order_index: clue.order_index,
            title: clue.title,
            body: clue.body,
            answer_kind: clue.answer_kind,
            expected_answer: clue.expected_answer,
            image_url: clue.image_url,
            created_at: format_system_time(clue.created_at),
        }
    }
}

/// A pending submission enriched with the names staff needs to judge it.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionQueueItem {
    #[serde(flatten)]
    pub submission: SubmissionView,
    /// Name of the submitting team.
    pub team_name: String,
    /// Title of the answered clue.
    pub clue_title: String,
    /// Expected answer of the clue, shown to help the decision.
    pub expected_answer: String,
}

/// Payload declining a submission with optional feedback for the team.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectRequest {
    /// Feedback forwarded to the team; a generic retry prompt is used when absent.
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Payload creating or editing a broadcast announcement.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnnouncementInput {
    /// Optional headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Message body.
    pub message: String,
    /// Display priority.
    #[serde(default)]
    pub priority: AnnouncementPriority,
}

impl Validate for AnnouncementInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.message.trim().is_empty() {
            let mut err = ValidationError::new("message_required");
            err.message = Some("Announcement message must not be empty".into());
            errors.add("message", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Victim details supplied by the mystery setup form.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VictimInput {
    pub name: String,
    pub photo_url: String,
    pub age: u32,
    pub occupation: String,
    pub bio: String,
    pub last_seen: String,
}

impl From<VictimInput> for VictimEntity {
    fn from(input: VictimInput) -> Self {
        Self {
            name: input.name,
            photo_url: input.photo_url,
            age: input.age,
            occupation: input.occupation,
            bio: input.bio,
            last_seen: input.last_seen,
        }
    }
}

/// Suspect details supplied by the mystery setup form.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SuspectInput {
    /// Existing id when editing; a fresh one is allocated when absent.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub photo_url: String,
    pub age: u32,
    pub occupation: String,
    pub relationship: String,
    pub alibi: String,
    pub motive: String,
    pub is_culprit: bool,
}

impl From<SuspectInput> for SuspectEntity {
    fn from(input: SuspectInput) -> Self {
        Self {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            name: input.name,
            photo_url: input.photo_url,
            age: input.age,
            occupation: input.occupation,
            relationship: input.relationship,
            alibi: input.alibi,
            motive: input.motive,
            is_culprit: input.is_culprit,
        }
    }
}

/// Evidence details supplied by the mystery setup form.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EvidenceInput {
    /// Existing id when editing; a fresh one is allocated when absent.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub found_at: String,
    /// Gate the item behind a completed clue.
    #[serde(default)]
    pub unlock_clue_id: Option<Uuid>,
    #[serde(default)]
    pub related_suspect_id: Option<Uuid>,
}

impl From<EvidenceInput> for EvidenceEntity {
    fn from(input: EvidenceInput) -> Self {
        Self {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            title: input.title,
            description: input.description,
            image_url: input.image_url,
            found_at: input.found_at,
            unlock_clue_id: input.unlock_clue_id,
            related_suspect_id: input.related_suspect_id,
        }
    }
}

/// Payload configuring the side mystery.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MysteryInput {
    /// Global switch making the mystery visible to teams.
    pub active: bool,
    /// Clue that unlocks the mystery; `None` opens it immediately.
    #[serde(default)]
    pub trigger_clue_id: Option<Uuid>,
    pub victim: VictimInput,
    pub suspects: Vec<SuspectInput>,
    #[serde(default)]
    pub evidence: Vec<EvidenceInput>,
}

impl Validate for MysteryInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.suspects.is_empty() {
            let mut err = ValidationError::new("suspects_required");
            err.message = Some("A mystery needs at least one suspect".into());
            errors.add("suspects", err);
        }
        if self.suspects.iter().filter(|s| s.is_culprit).count() != 1 {
            let mut err = ValidationError::new("single_culprit");
            err.message = Some("Exactly one suspect must be the culprit".into());
            errors.add("suspects", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// An accusation enriched with its team name for the status board.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccusationRow {
    pub team_id: Uuid,
    pub team_name: String,
    pub suspect_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub correct: bool,
    pub submitted_at: String,
}

impl AccusationRow {
    /// Attach the team name looked up by the service layer.
    pub fn from_entity(accusation: AccusationEntity, team_name: String) -> Self {
        Self {
            team_id: accusation.team_id,
            team_name,
            suspect_id: accusation.suspect_id,
            reasoning: accusation.reasoning,
            correct: accusation.correct,
            submitted_at: format_system_time(accusation.submitted_at),
        }
    }
}

/// Coordinator projection of the mystery plus all recorded accusations.
#[derive(Debug, Serialize, ToSchema)]
pub struct MysteryStatus {
    pub configured: bool,
    pub active: bool,
    pub revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_clue_id: Option<Uuid>,
    pub accusations: Vec<AccusationRow>,
}

impl MysteryStatus {
    /// Build the status view from the stored mystery and accusation rows.
    pub fn project(mystery: Option<&MysteryEntity>, accusations: Vec<AccusationRow>) -> Self {
        Self {
            configured: mystery.is_some(),
            active: mystery.map(|m| m.active).unwrap_or(false),
            revealed: mystery.map(|m| m.revealed).unwrap_or(false),
            trigger_clue_id: mystery.and_then(|m| m.trigger_clue_id),
            accusations,
        }
    }
}

/// Payload saving the finale configuration.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinaleConfigInput {
    #[serde(default)]
    pub map_image_url: Option<String>,
    #[serde(default)]
    pub map_description: Option<String>,
    /// Formula text with a `???` placeholder for the missing part.
    #[serde(default)]
    pub formula_text: Option<String>,
    /// The exact answer teams must type.
    pub missing_answer: String,
}

impl Validate for FinaleConfigInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.missing_answer.trim().is_empty() {
            let mut err = ValidationError::new("missing_answer_required");
            err.message = Some("The finale answer must not be empty".into());
            errors.add("missing_answer", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// One row of the finale approval board: a team that finished every clue.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinaleTeamRow {
    pub team_id: Uuid,
    pub name: String,
    pub completed: usize,
    pub total: usize,
    pub approved: bool,
    pub formula_completed: bool,
}
