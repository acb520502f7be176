//! BSON document shapes for the hunt collections.
//!
//! Each document mirrors its entity with the id mapped to `_id` and top-level
//! timestamps converted to BSON datetimes so range filters (e.g. the
//! stalled-upload sweep) work natively.

use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AccusationEntity, AnnouncementEntity, AnnouncementPriority, AnswerKind, ClueEntity,
    ClueProgressEntity, EvidenceEntity, FinaleConfigEntity, GateFlagsEntity, MysteryEntity,
    NotificationEntity, SubmissionEntity, SubmissionStatus, SuspectEntity, TeamEntity,
    VictimEntity,
};

/// Fixed `_id` used by the singleton mystery and finale documents.
pub const SINGLETON_DOC_ID: &str = "current";

#[derive(Debug, Serialize, Deserialize)]
pub struct TeamDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    join_code: String,
    completed_clue_ids: Vec<Uuid>,
    #[serde(default)]
    per_clue_status: Vec<ClueProgressEntity>,
    #[serde(default)]
    gate_flags: GateFlagsEntity,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<TeamEntity> for TeamDocument {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            join_code: value.join_code,
            completed_clue_ids: value.completed_clue_ids,
            per_clue_status: value.per_clue_status,
            gate_flags: value.gate_flags,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<TeamDocument> for TeamEntity {
    fn from(value: TeamDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            join_code: value.join_code,
            completed_clue_ids: value.completed_clue_ids,
            per_clue_status: value.per_clue_status,
            gate_flags: value.gate_flags,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClueDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    order_index: u32,
    title: String,
    body: String,
    answer_kind: AnswerKind,
    expected_answer: String,
    image_url: Option<String>,
    created_at: DateTime,
}

impl From<ClueEntity> for ClueDocument {
    fn from(value: ClueEntity) -> Self {
        Self {
            id: value.id,
            order_index: value.order_index,
            title: value.title,
            body: value.body,
            answer_kind: value.answer_kind,
            expected_answer: value.expected_answer,
            image_url: value.image_url,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<ClueDocument> for ClueEntity {
    fn from(value: ClueDocument) -> Self {
        Self {
            id: value.id,
            order_index: value.order_index,
            title: value.title,
            body: value.body,
            answer_kind: value.answer_kind,
            expected_answer: value.expected_answer,
            image_url: value.image_url,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    team_id: Uuid,
    clue_id: Uuid,
    answer_kind: AnswerKind,
    content: String,
    media_delete_handle: Option<String>,
    status: SubmissionStatus,
    uploading: bool,
    feedback: Option<String>,
    submitted_at: DateTime,
}

impl From<SubmissionEntity> for SubmissionDocument {
    fn from(value: SubmissionEntity) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            clue_id: value.clue_id,
            answer_kind: value.answer_kind,
            content: value.content,
            media_delete_handle: value.media_delete_handle,
            status: value.status,
            uploading: value.uploading,
            feedback: value.feedback,
            submitted_at: DateTime::from_system_time(value.submitted_at),
        }
    }
}

impl From<SubmissionDocument> for SubmissionEntity {
    fn from(value: SubmissionDocument) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            clue_id: value.clue_id,
            answer_kind: value.answer_kind,
            content: value.content,
            media_delete_handle: value.media_delete_handle,
            status: value.status,
            uploading: value.uploading,
            feedback: value.feedback,
            submitted_at: value.submitted_at.to_system_time(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    team_id: Uuid,
    message: String,
    read: bool,
    created_at: DateTime,
}

impl From<NotificationEntity> for NotificationDocument {
    fn from(value: NotificationEntity) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            message: value.message,
            read: value.read,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<NotificationDocument> for NotificationEntity {
    fn from(value: NotificationDocument) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            message: value.message,
            read: value.read,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnnouncementDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    title: Option<String>,
    message: String,
    #[serde(default)]
    priority: AnnouncementPriority,
    created_at: DateTime,
    edited_at: Option<DateTime>,
}

impl From<AnnouncementEntity> for AnnouncementDocument {
    fn from(value: AnnouncementEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            message: value.message,
            priority: value.priority,
            created_at: DateTime::from_system_time(value.created_at),
            edited_at: value.edited_at.map(DateTime::from_system_time),
        }
    }
}

impl From<AnnouncementDocument> for AnnouncementEntity {
    fn from(value: AnnouncementDocument) -> Self {
        Self {
            id: value.id,
            title: value.title,
            message: value.message,
            priority: value.priority,
            created_at: value.created_at.to_system_time(),
            edited_at: value.edited_at.map(|at| at.to_system_time()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccusationDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    team_id: Uuid,
    suspect_id: Uuid,
    reasoning: Option<String>,
    correct: bool,
    submitted_at: DateTime,
}

impl From<AccusationEntity> for AccusationDocument {
    fn from(value: AccusationEntity) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            suspect_id: value.suspect_id,
            reasoning: value.reasoning,
            correct: value.correct,
            submitted_at: DateTime::from_system_time(value.submitted_at),
        }
    }
}

impl From<AccusationDocument> for AccusationEntity {
    fn from(value: AccusationDocument) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            suspect_id: value.suspect_id,
            reasoning: value.reasoning,
            correct: value.correct,
            submitted_at: value.submitted_at.to_system_time(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MysteryDocument {
    #[serde(rename = "_id")]
    id: String,
    active: bool,
    trigger_clue_id: Option<Uuid>,
    revealed: bool,
    revealed_at: Option<DateTime>,
    victim: VictimEntity,
    suspects: Vec<SuspectEntity>,
    evidence: Vec<EvidenceEntity>,
}

impl From<MysteryEntity> for MysteryDocument {
    fn from(value: MysteryEntity) -> Self {
        Self {
            id: SINGLETON_DOC_ID.to_owned(),
            active: value.active,
            trigger_clue_id: value.trigger_clue_id,
            revealed: value.revealed,
            revealed_at: value.revealed_at.map(DateTime::from_system_time),
            victim: value.victim,
            suspects: value.suspects,
            evidence: value.evidence,
        }
    }
}

impl From<MysteryDocument> for MysteryEntity {
    fn from(value: MysteryDocument) -> Self {
        Self {
            active: value.active,
            trigger_clue_id: value.trigger_clue_id,
            revealed: value.revealed,
            revealed_at: value.revealed_at.map(|at| at.to_system_time()),
            victim: value.victim,
            suspects: value.suspects,
            evidence: value.evidence,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinaleConfigDocument {
    #[serde(rename = "_id")]
    id: String,
    map_image_url: Option<String>,
    map_description: Option<String>,
    formula_text: Option<String>,
    missing_answer: String,
    updated_at: DateTime,
}

impl From<FinaleConfigEntity> for FinaleConfigDocument {
    fn from(value: FinaleConfigEntity) -> Self {
        Self {
            id: SINGLETON_DOC_ID.to_owned(),
            map_image_url: value.map_image_url,
            map_description: value.map_description,
            formula_text: value.formula_text,
            missing_answer: value.missing_answer,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<FinaleConfigDocument> for FinaleConfigEntity {
    fn from(value: FinaleConfigDocument) -> Self {
        Self {
            map_image_url: value.map_image_url,
            map_description: value.map_description,
            formula_text: value.formula_text,
            missing_answer: value.missing_answer,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}

pub fn singleton_doc_id() -> Document {
    doc! {"_id": SINGLETON_DOC_ID}
}
