//! DTO definitions for the player-facing REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{
        AccusationEntity, AnswerKind, EvidenceEntity, MysteryEntity, SuspectEntity, TeamEntity,
        VictimEntity,
    },
    dto::{common::ClueSummary, format_system_time, validation::validate_join_code},
};

/// Payload used to join the hunt with a team's code.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Six-digit join code handed out by staff.
    pub join_code: String,
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_join_code(&self.join_code) {
            errors.add("join_code", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Identity of the joined team, echoed back to the player client.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamProfile {
    pub id: Uuid,
    pub name: String,
    /// Number of clues the team has completed.
    pub completed: usize,
}

impl From<TeamEntity> for TeamProfile {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            completed: team.completed_clue_ids.len(),
        }
    }
}

/// The team's position in the hunt, as shown on the player dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    /// Number of clues completed.
    pub completed: usize,
    /// Number of clues in the hunt.
    pub total: usize,
    /// True once every clue has been completed.
    pub finished: bool,
    /// The next clue to solve; absent when the sequence is complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_clue: Option<ClueSummary>,
}

/// Payload for submitting an answer to the current clue.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Clue being answered.
    pub clue_id: Uuid,
    /// Kind of answer carried; must match the clue's expected kind.
    pub answer_kind: AnswerKind,
    /// Text answer or scanned value. Required for text/scan submissions.
    #[serde(default)]
    pub text: Option<String>,
    /// Base64-encoded photo bytes. Required for photo submissions.
    #[serde(default)]
    pub photo_base64: Option<String>,
    /// Original filename hint forwarded to the media service.
    #[serde(default)]
    pub filename: Option<String>,
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match self.answer_kind {
            AnswerKind::Text | AnswerKind::Scan => {
                if self.text.as_deref().is_none_or(|t| t.trim().is_empty()) {
                    let mut err = ValidationError::new("text_required");
                    err.message = Some("A non-empty answer is required".into());
                    errors.add("text", err);
                }
            }
            AnswerKind::Photo => {
                if self.photo_base64.as_deref().is_none_or(str::is_empty) {
                    let mut err = ValidationError::new("photo_required");
                    err.message = Some("A photo payload is required".into());
                    errors.add("photo_base64", err);
                }
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// One row of the public leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub team_id: Uuid,
    pub name: String,
    pub completed: usize,
}

/// Teams ordered by completed clue count, descending.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub teams: Vec<LeaderboardEntry>,
}

/// The case-file victim as shown to players.
#[derive(Debug, Serialize, ToSchema)]
pub struct VictimView {
    pub name: String,
    pub photo_url: String,
    pub age: u32,
    pub occupation: String,
    pub bio: String,
    pub last_seen: String,
}

impl From<VictimEntity> for VictimView {
    fn from(victim: VictimEntity) -> Self {
        Self {
            name: victim.name,
            photo_url: victim.photo_url,
            age: victim.age,
            occupation: victim.occupation,
            bio: victim.bio,
            last_seen: victim.last_seen,
        }
    }
}

/// A suspect as shown to players. The culprit flag only appears after the
/// coordinator reveals the mystery.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuspectView {
    pub id: Uuid,
    pub name: String,
    pub photo_url: String,
    pub age: u32,
    pub occupation: String,
    pub relationship: String,
    pub alibi: String,
    pub motive: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_culprit: Option<bool>,
}

impl SuspectView {
    /// Project a suspect, exposing the culprit flag only when revealed.
    pub fn project(suspect: SuspectEntity, revealed: bool) -> Self {
        Self {
            id: suspect.id,
            name: suspect.name,
            photo_url: suspect.photo_url,
            age: suspect.age,
            occupation: suspect.occupation,
            relationship: suspect.relationship,
            alibi: suspect.alibi,
            motive: suspect.motive,
            is_culprit: revealed.then_some(suspect.is_culprit),
        }
    }
}

/// An evidence item as shown to players.
#[derive(Debug, Serialize, ToSchema)]
pub struct EvidenceView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub found_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_suspect_id: Option<Uuid>,
}

impl From<EvidenceEntity> for EvidenceView {
    fn from(evidence: EvidenceEntity) -> Self {
        Self {
            id: evidence.id,
            title: evidence.title,
            description: evidence.description,
            image_url: evidence.image_url,
            found_at: evidence.found_at,
            related_suspect_id: evidence.related_suspect_id,
        }
    }
}

/// A team's recorded accusation.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccusationView {
    pub suspect_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub correct: bool,
    pub submitted_at: String,
}

impl From<AccusationEntity> for AccusationView {
    fn from(accusation: AccusationEntity) -> Self {
        Self {
            suspect_id: accusation.suspect_id,
            reasoning: accusation.reasoning,
            correct: accusation.correct,
            submitted_at: format_system_time(accusation.submitted_at),
        }
    }
}

/// The side mystery as visible to one team at a point in time.
#[derive(Debug, Serialize, ToSchema)]
pub struct MysteryView {
    /// Whether staff has switched the mystery on at all.
    pub active: bool,
    /// Whether the team has unlocked the mystery content.
    pub unlocked: bool,
    /// Whether the culprit has been revealed to everyone.
    pub revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victim: Option<VictimView>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suspects: Vec<SuspectView>,
    /// Evidence the team has unlocked so far.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub evidence: Vec<EvidenceView>,
    /// Total number of evidence items, unlocked or not.
    pub evidence_total: usize,
    /// The team's accusation, once made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accusation: Option<AccusationView>,
}

impl MysteryView {
    /// View for a team that has not unlocked (or cannot see) the mystery.
    pub fn locked(mystery: Option<&MysteryEntity>) -> Self {
        Self {
            active: mystery.map(|m| m.active).unwrap_or(false),
            unlocked: false,
            revealed: false,
            victim: None,
            suspects: Vec::new(),
            evidence: Vec::new(),
            evidence_total: 0,
            accusation: None,
        }
    }
}

/// Payload recording a team's accusation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccusationRequest {
    /// Accused suspect.
    pub suspect_id: Uuid,
    /// Optional reasoning shown to the coordinator.
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// The finale as visible to one team at a point in time.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinaleView {
    /// The team has completed every clue.
    pub eligible: bool,
    /// Staff has granted this team access.
    pub approved: bool,
    /// Both conditions hold; content fields are present.
    pub open: bool,
    /// The team already solved the formula.
    pub formula_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula_text: Option<String>,
}

/// Payload carrying a team's attempt at the finale formula.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FormulaAttemptRequest {
    /// The missing part of the formula, as typed by the team.
    pub answer: String,
}

/// Grading of a formula attempt.
#[derive(Debug, Serialize, ToSchema)]
pub struct FormulaAttemptResponse {
    pub correct: bool,
}
