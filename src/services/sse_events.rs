use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::{AnnouncementEntity, NotificationEntity, SubmissionEntity, TeamEntity},
    dto::sse::{
        AccusationEvent, AnnouncementEvent, ClueChangedEvent, FinaleGrantEvent,
        MysteryChangedEvent, NotificationEvent, ServerEvent, SubmissionDeletedEvent,
        SubmissionEvent, SystemStatus, TeamProgressEvent, TeamRosterEvent,
    },
    state::SharedState,
};

const EVENT_SUBMISSION_CREATED: &str = "submission.created";
const EVENT_SUBMISSION_UPDATED: &str = "submission.updated";
const EVENT_SUBMISSION_DELETED: &str = "submission.deleted";
const EVENT_NOTIFICATION_CREATED: &str = "notification.created";
const EVENT_ANNOUNCEMENT_CREATED: &str = "announcement.created";
const EVENT_ANNOUNCEMENT_UPDATED: &str = "announcement.updated";
const EVENT_TEAM_PROGRESS: &str = "team.progress";
const EVENT_TEAM_CREATED: &str = "team.created";
const EVENT_TEAM_DELETED: &str = "team.deleted";
const EVENT_CLUE_CHANGED: &str = "clue.changed";
const EVENT_MYSTERY_CHANGED: &str = "mystery.changed";
const EVENT_FINALE_CHANGED: &str = "finale.changed";
const EVENT_FINALE_GRANT: &str = "finale.grant";
const EVENT_ACCUSATION_RECORDED: &str = "mystery.accusation";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Announce a freshly created submission to the review queue and to its team.
pub fn broadcast_submission_created(state: &SharedState, submission: &SubmissionEntity) {
    let payload = SubmissionEvent {
        submission: submission.clone().into(),
    };
    send_coordinator_event(state, EVENT_SUBMISSION_CREATED, &payload);
    send_team_event(state, submission.team_id, EVENT_SUBMISSION_CREATED, &payload);
}

/// Announce a submission state change (patch, review decision, sweep).
pub fn broadcast_submission_updated(state: &SharedState, submission: &SubmissionEntity) {
    let payload = SubmissionEvent {
        submission: submission.clone().into(),
    };
    send_coordinator_event(state, EVENT_SUBMISSION_UPDATED, &payload);
    send_team_event(state, submission.team_id, EVENT_SUBMISSION_UPDATED, &payload);
}

/// Announce the removal of a submission document.
pub fn broadcast_submission_deleted(state: &SharedState, team_id: Uuid, submission_id: Uuid) {
    let payload = SubmissionDeletedEvent { submission_id };
    send_coordinator_event(state, EVENT_SUBMISSION_DELETED, &payload);
    send_team_event(state, team_id, EVENT_SUBMISSION_DELETED, &payload);
}

/// Deliver a one-shot notification to its owning team.
pub fn broadcast_notification(state: &SharedState, notification: &NotificationEntity) {
    let payload = NotificationEvent {
        notification: notification.clone().into(),
    };
    send_team_event(
        state,
        notification.team_id,
        EVENT_NOTIFICATION_CREATED,
        &payload,
    );
}

/// Broadcast a new announcement to every connected client.
pub fn broadcast_announcement_created(state: &SharedState, announcement: &AnnouncementEntity) {
    let payload = AnnouncementEvent {
        announcement: announcement.clone().into(),
    };
    send_public_event(state, EVENT_ANNOUNCEMENT_CREATED, &payload);
}

/// Broadcast an edited announcement to every connected client.
pub fn broadcast_announcement_updated(state: &SharedState, announcement: &AnnouncementEntity) {
    let payload = AnnouncementEvent {
        announcement: announcement.clone().into(),
    };
    send_public_event(state, EVENT_ANNOUNCEMENT_UPDATED, &payload);
}

/// Broadcast a team's new progress tally (feeds leaderboards).
pub fn broadcast_team_progress(state: &SharedState, team: &TeamEntity, total_clues: usize) {
    let payload = TeamProgressEvent {
        team_id: team.id,
        name: team.name.clone(),
        completed: team.completed_clue_ids.len(),
        total: total_clues,
    };
    send_public_event(state, EVENT_TEAM_PROGRESS, &payload);
    send_coordinator_event(state, EVENT_TEAM_PROGRESS, &payload);
}

/// Announce a new team to the coordinator stream.
pub fn broadcast_team_created(state: &SharedState, team_id: Uuid) {
    let payload = TeamRosterEvent { team_id };
    send_coordinator_event(state, EVENT_TEAM_CREATED, &payload);
}

/// Announce a deleted team to both streams.
pub fn broadcast_team_deleted(state: &SharedState, team_id: Uuid) {
    let payload = TeamRosterEvent { team_id };
    send_public_event(state, EVENT_TEAM_DELETED, &payload);
    send_coordinator_event(state, EVENT_TEAM_DELETED, &payload);
}

/// Announce a change to the clue sequence.
pub fn broadcast_clue_changed(state: &SharedState, clue_id: Uuid) {
    let payload = ClueChangedEvent { clue_id };
    send_public_event(state, EVENT_CLUE_CHANGED, &payload);
}

/// Announce a mystery configuration or reveal change.
pub fn broadcast_mystery_changed(state: &SharedState, active: bool, revealed: bool) {
    let payload = MysteryChangedEvent { active, revealed };
    send_public_event(state, EVENT_MYSTERY_CHANGED, &payload);
}

/// Announce a finale configuration change.
pub fn broadcast_finale_changed(state: &SharedState) {
    send_public_event(state, EVENT_FINALE_CHANGED, &serde_json::json!({}));
}

/// Tell one team that its finale access was granted or revoked.
pub fn broadcast_finale_grant(state: &SharedState, team_id: Uuid, approved: bool) {
    let payload = FinaleGrantEvent { team_id, approved };
    send_team_event(state, team_id, EVENT_FINALE_GRANT, &payload);
    send_coordinator_event(state, EVENT_FINALE_GRANT, &payload);
}

/// Tell the coordinator stream that a team recorded an accusation.
pub fn broadcast_accusation_recorded(
    state: &SharedState,
    team_id: Uuid,
    suspect_id: Uuid,
    correct: bool,
) {
    let payload = AccusationEvent {
        team_id,
        suspect_id,
        correct,
    };
    send_coordinator_event(state, EVENT_ACCUSATION_RECORDED, &payload);
}

/// Broadcast the degraded flag to every connected client.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
    send_coordinator_event(state, EVENT_SYSTEM_STATUS, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_coordinator_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.coordinator_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize coordinator SSE payload"),
    }
}

fn send_team_event(state: &SharedState, team_id: Uuid, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.team_sse(team_id).broadcast(event),
        Err(err) => {
            warn!(event, %team_id, error = %err, "failed to serialize team SSE payload");
        }
    }
}
