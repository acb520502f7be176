use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{
        AnnouncementEntity, AnnouncementPriority, AnswerKind, ClueEntity, NotificationEntity,
        SubmissionEntity, SubmissionStatus,
    },
    dto::format_system_time,
};

/// Player-facing projection of a clue. Never carries the expected answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClueSummary {
    pub id: Uuid,
    pub order_index: u32,
    pub title: String,
    pub body: String,
    pub answer_kind: AnswerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<ClueEntity> for ClueSummary {
    fn from(clue: ClueEntity) -> Self {
        Self {
            id: clue.id,
            order_index: clue.order_index,
            title: clue.title,
            body: clue.body,
            answer_kind: clue.answer_kind,
            image_url: clue.image_url,
        }
    }
}

/// Projection of a submission exposed to REST and SSE clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmissionView {
    pub id: Uuid,
    pub team_id: Uuid,
    pub clue_id: Uuid,
    pub answer_kind: AnswerKind,
    /// Answer text / scanned value / media URL; empty while a photo upload is
    /// still in flight.
    pub content: String,
    pub status: SubmissionStatus,
    pub uploading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub submitted_at: String,
}

impl From<SubmissionEntity> for SubmissionView {
    fn from(submission: SubmissionEntity) -> Self {
        Self {
            id: submission.id,
            team_id: submission.team_id,
            clue_id: submission.clue_id,
            answer_kind: submission.answer_kind,
            content: submission.content,
            status: submission.status,
            uploading: submission.uploading,
            feedback: submission.feedback,
            submitted_at: format_system_time(submission.submitted_at),
        }
    }
}

/// Projection of a broadcast announcement.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnnouncementView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    pub priority: AnnouncementPriority,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
}

impl From<AnnouncementEntity> for AnnouncementView {
    fn from(announcement: AnnouncementEntity) -> Self {
        Self {
            id: announcement.id,
            title: announcement.title,
            message: announcement.message,
            priority: announcement.priority,
            created_at: format_system_time(announcement.created_at),
            edited_at: announcement.edited_at.map(format_system_time),
        }
    }
}

/// Projection of a one-shot team notification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationView {
    pub id: Uuid,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

impl From<NotificationEntity> for NotificationView {
    fn from(notification: NotificationEntity) -> Self {
        Self {
            id: notification.id,
            message: notification.message,
            read: notification.read,
            created_at: format_system_time(notification.created_at),
        }
    }
}

/// Generic action acknowledgement used by coordinator endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}
