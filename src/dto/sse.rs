use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::common::{AnnouncementView, NotificationView, SubmissionView};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event with a plain-text data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to the coordinator SSE client when it connects.
pub struct CoordinatorHandshake {
    /// Token the coordinator must echo in `X-Coordinator-Token` headers.
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when a submission is created or changes state.
pub struct SubmissionEvent {
    pub submission: SubmissionView,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when a submission document is removed.
pub struct SubmissionDeletedEvent {
    pub submission_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event carrying a fresh one-shot notification to its team.
pub struct NotificationEvent {
    pub notification: NotificationView,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when an announcement is created or edited.
pub struct AnnouncementEvent {
    pub announcement: AnnouncementView,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when a team's progress changes.
pub struct TeamProgressEvent {
    pub team_id: Uuid,
    pub name: String,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when a team is created or deleted.
pub struct TeamRosterEvent {
    pub team_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when the clue sequence changes.
pub struct ClueChangedEvent {
    pub clue_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when the mystery configuration or reveal state changes.
pub struct MysteryChangedEvent {
    pub active: bool,
    pub revealed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted to a team when its finale access is granted or revoked.
pub struct FinaleGrantEvent {
    pub team_id: Uuid,
    pub approved: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted to the coordinator stream when a team records an accusation.
pub struct AccusationEvent {
    pub team_id: Uuid,
    pub suspect_id: Uuid,
    pub correct: bool,
}
