use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// What kind of answer a clue expects and a submission carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Free-form text typed by the team.
    Text,
    /// A photo taken by the team and stored in the media service.
    Photo,
    /// A QR/barcode value captured by the team's scanner.
    Scan,
}

impl AnswerKind {
    /// Stable string form used in storage filters and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerKind::Text => "text",
            AnswerKind::Photo => "photo",
            AnswerKind::Scan => "scan",
        }
    }
}

/// Lifecycle state of a submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Awaiting a coordinator decision.
    Pending,
    /// Accepted; the clue counts towards the team's progress.
    Approved,
    /// Declined; the team may submit again.
    Rejected,
    /// The photo transfer exhausted its retries; the team may submit again.
    UploadFailed,
}

impl SubmissionStatus {
    /// Stable string form used in storage filters and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::UploadFailed => "upload_failed",
        }
    }

    /// Whether this status blocks a new submission for the same team/clue pair.
    ///
    /// `Rejected` and `UploadFailed` are excluded so teams can retry.
    pub fn blocks_resubmission(&self) -> bool {
        matches!(self, SubmissionStatus::Pending | SubmissionStatus::Approved)
    }
}

/// Per-clue progress bookkeeping attached to a team, used for duration tracking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClueProgressEntity {
    /// Clue this entry tracks.
    pub clue_id: Uuid,
    /// When the clue became the team's current clue.
    pub unlocked_at: Option<SystemTime>,
    /// When the team last submitted an answer for it.
    pub submitted_at: Option<SystemTime>,
    /// Last observed review outcome for the clue.
    pub status: ClueProgressStatus,
}

/// Coarse status recorded per clue on the team document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClueProgressStatus {
    /// The clue is (or was) visible to the team with no submission yet.
    Unlocked,
    /// An answer has been submitted and awaits review.
    Submitted,
    /// The clue was approved and counts towards progress.
    Approved,
    /// The latest submission for the clue was rejected.
    Rejected,
}

/// Staff-controlled unlock flags carried on the team document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateFlagsEntity {
    /// Staff has granted this team access to the finale content.
    #[serde(default)]
    pub finale_approved: bool,
    /// The team resolved the side mystery with a correct accusation.
    #[serde(default)]
    pub side_quest_solved: bool,
    /// The team solved the finale formula.
    #[serde(default)]
    pub formula_completed: bool,
}

/// A registered team and its hunt progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Display name chosen at registration.
    pub name: String,
    /// Short human-readable token players use to join (6 ASCII digits, unique).
    pub join_code: String,
    /// Clues this team has completed. Set semantics: membership is idempotent.
    pub completed_clue_ids: Vec<Uuid>,
    /// Per-clue timing/status side channel. Best-effort, never authoritative.
    #[serde(default)]
    pub per_clue_status: Vec<ClueProgressEntity>,
    /// Staff-controlled unlock flags.
    #[serde(default)]
    pub gate_flags: GateFlagsEntity,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time this team was updated.
    pub updated_at: SystemTime,
}

impl TeamEntity {
    /// Build a fresh team with no progress.
    pub fn new(name: String, join_code: String) -> Self {
        let timestamp = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            name,
            join_code,
            completed_clue_ids: Vec::new(),
            per_clue_status: Vec::new(),
            gate_flags: GateFlagsEntity::default(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Whether the team has completed the given clue.
    pub fn has_completed(&self, clue_id: Uuid) -> bool {
        self.completed_clue_ids.contains(&clue_id)
    }

    /// Idempotently add a clue to the completed set.
    ///
    /// Returns `true` when the clue was newly added, `false` when it was
    /// already present (re-delivered approval events are a no-op).
    pub fn complete_clue(&mut self, clue_id: Uuid) -> bool {
        if self.has_completed(clue_id) {
            return false;
        }
        self.completed_clue_ids.push(clue_id);
        self.updated_at = SystemTime::now();
        true
    }

    /// Borrow (creating on first touch) the per-clue progress entry for a clue.
    pub fn progress_entry(&mut self, clue_id: Uuid) -> &mut ClueProgressEntity {
        if let Some(position) = self
            .per_clue_status
            .iter()
            .position(|entry| entry.clue_id == clue_id)
        {
            return &mut self.per_clue_status[position];
        }

        self.per_clue_status.push(ClueProgressEntity {
            clue_id,
            unlocked_at: None,
            submitted_at: None,
            status: ClueProgressStatus::Unlocked,
        });
        self.per_clue_status
            .last_mut()
            .expect("entry was just pushed")
    }

    /// Clear all hunt progress, keeping identity and join code.
    pub fn reset_progress(&mut self) {
        self.completed_clue_ids.clear();
        self.per_clue_status.clear();
        self.gate_flags = GateFlagsEntity::default();
        self.updated_at = SystemTime::now();
    }
}

/// One step in the fixed ordered sequence teams must complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClueEntity {
    /// Stable identifier for the clue.
    pub id: Uuid,
    /// Position in the hunt sequence. Unique, gap-tolerant; ascending order
    /// defines "next clue".
    pub order_index: u32,
    /// Short headline shown to teams.
    pub title: String,
    /// The riddle/instructions body.
    pub body: String,
    /// What kind of answer this clue expects.
    pub answer_kind: AnswerKind,
    /// Expected answer or barcode value; empty for photo clues.
    pub expected_answer: String,
    /// Optional illustration shown with the clue.
    pub image_url: Option<String>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// A team's attempt at a clue, carrying its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionEntity {
    /// Stable identifier for the submission.
    pub id: Uuid,
    /// Owning team.
    pub team_id: Uuid,
    /// Clue this submission answers.
    pub clue_id: Uuid,
    /// Kind of answer carried.
    pub answer_kind: AnswerKind,
    /// Trimmed text / scanned value / media URL. Empty string while a photo
    /// upload is still in flight.
    pub content: String,
    /// Opaque deletion handle for the stored media asset, photo-only.
    pub media_delete_handle: Option<String>,
    /// Lifecycle state.
    pub status: SubmissionStatus,
    /// True only while a photo's binary transfer is outstanding.
    pub uploading: bool,
    /// Coordinator feedback, set only on rejection.
    pub feedback: Option<String>,
    /// Creation timestamp.
    pub submitted_at: SystemTime,
}

impl SubmissionEntity {
    /// Build a pending text or scan submission with its content already final.
    pub fn answered(team_id: Uuid, clue_id: Uuid, answer_kind: AnswerKind, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            clue_id,
            answer_kind,
            content,
            media_delete_handle: None,
            status: SubmissionStatus::Pending,
            uploading: false,
            feedback: None,
            submitted_at: SystemTime::now(),
        }
    }

    /// Build the optimistic placeholder for a photo whose upload is in flight.
    pub fn photo_placeholder(team_id: Uuid, clue_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            clue_id,
            answer_kind: AnswerKind::Photo,
            content: String::new(),
            media_delete_handle: None,
            status: SubmissionStatus::Pending,
            uploading: true,
            feedback: None,
            submitted_at: SystemTime::now(),
        }
    }
}

/// One-shot message delivered to a single team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEntity {
    /// Stable identifier for the notification.
    pub id: Uuid,
    /// Team this notification belongs to.
    pub team_id: Uuid,
    /// Human-readable message.
    pub message: String,
    /// Consumed flag; a read notification is never surfaced again.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl NotificationEntity {
    /// Build a fresh unread notification for a team.
    pub fn new(team_id: Uuid, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            message,
            read: false,
            created_at: SystemTime::now(),
        }
    }
}

/// Display priority of a broadcast announcement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementPriority {
    /// Regular informational message.
    #[default]
    Normal,
    /// Urgent message highlighted in clients.
    High,
}

/// Broadcast message visible to all teams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnouncementEntity {
    /// Stable identifier for the announcement.
    pub id: Uuid,
    /// Optional headline.
    pub title: Option<String>,
    /// Message body.
    pub message: String,
    /// Display priority.
    #[serde(default)]
    pub priority: AnnouncementPriority,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Set when a coordinator edits the announcement after sending it.
    pub edited_at: Option<SystemTime>,
}

impl AnnouncementEntity {
    /// Build a fresh announcement.
    pub fn new(title: Option<String>, message: String, priority: AnnouncementPriority) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            message,
            priority,
            created_at: SystemTime::now(),
            edited_at: None,
        }
    }
}

/// The victim presented in the side mystery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VictimEntity {
    /// Victim display name.
    pub name: String,
    /// Portrait URL.
    pub photo_url: String,
    /// Age shown on the case file.
    pub age: u32,
    /// Occupation shown on the case file.
    pub occupation: String,
    /// Backstory text.
    pub bio: String,
    /// Where the victim was last seen.
    pub last_seen: String,
}

/// A suspect in the side mystery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuspectEntity {
    /// Stable identifier for the suspect.
    pub id: Uuid,
    /// Suspect display name.
    pub name: String,
    /// Portrait URL.
    pub photo_url: String,
    /// Age shown on the case file.
    pub age: u32,
    /// Occupation shown on the case file.
    pub occupation: String,
    /// Relationship to the victim.
    pub relationship: String,
    /// The suspect's claimed alibi.
    pub alibi: String,
    /// The suspect's possible motive.
    pub motive: String,
    /// Whether this suspect is the culprit. Never exposed to players before
    /// the reveal.
    pub is_culprit: bool,
}

/// A piece of evidence, optionally gated behind a completed clue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceEntity {
    /// Stable identifier for the evidence item.
    pub id: Uuid,
    /// Evidence headline.
    pub title: String,
    /// What was found.
    pub description: String,
    /// Optional photo of the evidence.
    pub image_url: Option<String>,
    /// Where the evidence was found.
    pub found_at: String,
    /// When set, the evidence is visible only to teams that completed this clue.
    pub unlock_clue_id: Option<Uuid>,
    /// Optional link to a suspect the evidence points at.
    pub related_suspect_id: Option<Uuid>,
}

/// Singleton document describing the side mystery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MysteryEntity {
    /// Global staff switch; a disabled mystery is invisible to every team.
    pub active: bool,
    /// Clue that unlocks the mystery for a team once completed. `None` means
    /// the mystery opens immediately when active.
    pub trigger_clue_id: Option<Uuid>,
    /// Whether the culprit has been revealed to everyone.
    pub revealed: bool,
    /// When the reveal happened.
    pub revealed_at: Option<SystemTime>,
    /// The case file victim.
    pub victim: VictimEntity,
    /// The suspect roster.
    pub suspects: Vec<SuspectEntity>,
    /// Evidence items, some gated behind clue completion.
    pub evidence: Vec<EvidenceEntity>,
}

impl MysteryEntity {
    /// Look up a suspect by id.
    pub fn suspect(&self, suspect_id: Uuid) -> Option<&SuspectEntity> {
        self.suspects.iter().find(|s| s.id == suspect_id)
    }
}

/// A team's one-shot accusation against a suspect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccusationEntity {
    /// Stable identifier for the accusation.
    pub id: Uuid,
    /// Accusing team.
    pub team_id: Uuid,
    /// Accused suspect.
    pub suspect_id: Uuid,
    /// Optional reasoning written by the team.
    pub reasoning: Option<String>,
    /// Graded at creation against the suspect's culprit flag.
    pub correct: bool,
    /// Creation timestamp.
    pub submitted_at: SystemTime,
}

/// Singleton document describing the finale content shown to approved teams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinaleConfigEntity {
    /// Treasure map image.
    pub map_image_url: Option<String>,
    /// Location description / hints.
    pub map_description: Option<String>,
    /// Formula with a `???` placeholder for the missing part.
    pub formula_text: Option<String>,
    /// The exact answer teams must type for the missing part.
    pub missing_answer: String,
    /// Last time a coordinator saved the config.
    pub updated_at: SystemTime,
}

impl FinaleConfigEntity {
    /// Whether an attempt matches the configured answer.
    ///
    /// Matching is case-insensitive and ignores leading/trailing whitespace.
    pub fn answer_matches(&self, attempt: &str) -> bool {
        !self.missing_answer.trim().is_empty()
            && attempt.trim().eq_ignore_ascii_case(self.missing_answer.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_clue_is_idempotent() {
        let mut team = TeamEntity::new("The Owls".into(), "123456".into());
        let clue = Uuid::new_v4();

        assert!(team.complete_clue(clue));
        assert!(!team.complete_clue(clue));
        assert_eq!(team.completed_clue_ids.len(), 1);
    }

    #[test]
    fn reset_progress_clears_everything_but_identity() {
        let mut team = TeamEntity::new("The Owls".into(), "123456".into());
        let clue = Uuid::new_v4();
        team.complete_clue(clue);
        team.progress_entry(clue).status = ClueProgressStatus::Approved;
        team.gate_flags.finale_approved = true;

        let id = team.id;
        team.reset_progress();

        assert_eq!(team.id, id);
        assert_eq!(team.join_code, "123456");
        assert!(team.completed_clue_ids.is_empty());
        assert!(team.per_clue_status.is_empty());
        assert!(!team.gate_flags.finale_approved);
    }

    #[test]
    fn finale_answer_matching_ignores_case_and_whitespace() {
        let config = FinaleConfigEntity {
            map_image_url: None,
            map_description: None,
            formula_text: Some("X marks ??? spot".into()),
            missing_answer: "The Old Oak".into(),
            updated_at: SystemTime::now(),
        };

        assert!(config.answer_matches("the old oak"));
        assert!(config.answer_matches("  THE OLD OAK  "));
        assert!(!config.answer_matches("the young oak"));
    }

    #[test]
    fn empty_finale_answer_never_matches() {
        let config = FinaleConfigEntity {
            map_image_url: None,
            map_description: None,
            formula_text: None,
            missing_answer: "   ".into(),
            updated_at: SystemTime::now(),
        };

        assert!(!config.answer_matches(""));
        assert!(!config.answer_matches("   "));
    }

    #[test]
    fn resubmission_blocking_excludes_failed_states() {
        assert!(SubmissionStatus::Pending.blocks_resubmission());
        assert!(SubmissionStatus::Approved.blocks_resubmission());
        assert!(!SubmissionStatus::Rejected.blocks_resubmission());
        assert!(!SubmissionStatus::UploadFailed.blocks_resubmission());
    }
}
