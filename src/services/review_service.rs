//! Review engine: coordinator decisions over pending submissions and their
//! cascade into team progress.
//!
//! Approvals are idempotent: re-delivered approve calls (duplicate events,
//! double taps) neither duplicate the completed-clue entry nor emit a second
//! completion announcement. Media cleanup is fire-and-forget; a failed
//! deletion is logged and never blocks the decision.

use std::{collections::HashMap, time::SystemTime};

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{
        hunt_store::SubmissionFilter,
        models::{
            AnnouncementEntity, AnnouncementPriority, ClueProgressStatus, NotificationEntity,
            SubmissionEntity, SubmissionStatus, TeamEntity,
        },
    },
    dto::{
        common::SubmissionView,
        coordinator::{RejectRequest, SubmissionQueueItem},
    },
    error::ServiceError,
    services::{progress, sse_events},
    state::{
        SharedState,
        lifecycle::{LifecycleEvent, SubmissionState},
    },
};

/// Message sent to a team when a rejection carries no written feedback.
const GENERIC_RETRY_PROMPT: &str = "Your answer was not accepted. Take another look and try again!";

/// Accept a pending submission and advance the owning team's progress.
pub async fn approve(
    state: &SharedState,
    submission_id: Uuid,
) -> Result<SubmissionView, ServiceError> {
    let store = state.require_hunt_store().await?;

    let submission = store
        .find_submission(submission_id)
        .await?
        .ok_or_else(|| not_found(submission_id))?;

    // Duplicate event delivery: approving an approved submission is a no-op.
    if submission.status == SubmissionStatus::Approved {
        return Ok(submission.into());
    }

    let next = SubmissionState::of(&submission).apply(LifecycleEvent::Approve)?;

    let mut approved = submission;
    approved.status = next.status;
    approved.uploading = next.uploading;
    store.save_submission(approved.clone()).await?;

    // Approved photos have served their purpose; release the stored asset.
    spawn_media_cleanup(state, approved.media_delete_handle.clone());

    // Cascade into the team document. The store offers no cross-collection
    // transaction; the submission transition above stands even if this write
    // fails, and a re-approve is a safe no-op.
    let clues = store.list_clues().await?;
    let total_clues = clues.len();

    match store.find_team(approved.team_id).await? {
        Some(mut team) => {
            let newly_completed = team.complete_clue(approved.clue_id);

            let entry = team.progress_entry(approved.clue_id);
            entry.status = ClueProgressStatus::Approved;

            if let Some(next_clue) = progress::current_clue(&team, &clues) {
                let next_id = next_clue.id;
                let next_entry = team.progress_entry(next_id);
                if next_entry.unlocked_at.is_none() {
                    next_entry.unlocked_at = Some(SystemTime::now());
                }
            }

            store.save_team(team.clone()).await?;
            sse_events::broadcast_team_progress(state, &team, total_clues);

            if newly_completed && progress::is_sequence_complete(&team, total_clues) {
                celebrate_completion(state, &team).await;
            }
        }
        None => {
            warn!(
                submission_id = %approved.id,
                team_id = %approved.team_id,
                "approved submission references a missing team; progress not advanced"
            );
        }
    }

    sse_events::broadcast_submission_updated(state, &approved);
    Ok(approved.into())
}

/// Decline a pending submission, notifying the team with feedback.
pub async fn reject(
    state: &SharedState,
    submission_id: Uuid,
    request: RejectRequest,
) -> Result<SubmissionView, ServiceError> {
    let store = state.require_hunt_store().await?;

    let submission = store
        .find_submission(submission_id)
        .await?
        .ok_or_else(|| not_found(submission_id))?;

    if submission.status == SubmissionStatus::Rejected {
        return Ok(submission.into());
    }

    let next = SubmissionState::of(&submission).apply(LifecycleEvent::Reject)?;

    let feedback = request
        .feedback
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty());

    let mut rejected = submission;
    rejected.status = next.status;
    rejected.uploading = next.uploading;
    rejected.feedback = feedback.clone();
    store.save_submission(rejected.clone()).await?;

    spawn_media_cleanup(state, rejected.media_delete_handle.clone());

    // Best-effort side channel on the team document.
    if let Ok(Some(mut team)) = store.find_team(rejected.team_id).await {
        team.progress_entry(rejected.clue_id).status = ClueProgressStatus::Rejected;
        if let Err(err) = store.save_team(team).await {
            warn!(team_id = %rejected.team_id, error = %err, "failed to record rejection status");
        }
    }

    let message = feedback.unwrap_or_else(|| GENERIC_RETRY_PROMPT.to_owned());
    let notification = NotificationEntity::new(rejected.team_id, message);
    store.save_notification(notification.clone()).await?;
    sse_events::broadcast_notification(state, &notification);

    sse_events::broadcast_submission_updated(state, &rejected);
    Ok(rejected.into())
}

/// Remove a failed or rejected submission, cleaning up its media asset.
///
/// Deleting a pending submission is not a supported transition.
pub async fn delete(state: &SharedState, submission_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_hunt_store().await?;

    let submission = store
        .find_submission(submission_id)
        .await?
        .ok_or_else(|| not_found(submission_id))?;

    if !SubmissionState::of(&submission).deletable() {
        return Err(ServiceError::InvalidState(format!(
            "only rejected or failed submissions can be deleted (status: {})",
            submission.status.as_str()
        )));
    }

    spawn_media_cleanup(state, submission.media_delete_handle.clone());
    store.delete_submission(submission_id).await?;
    sse_events::broadcast_submission_deleted(state, submission.team_id, submission_id);
    Ok(())
}

/// The review queue: pending submissions enriched with team and clue names.
pub async fn pending_queue(state: &SharedState) -> Result<Vec<SubmissionQueueItem>, ServiceError> {
    let store = state.require_hunt_store().await?;

    let pending = store
        .list_submissions(SubmissionFilter {
            statuses: Some(vec![SubmissionStatus::Pending]),
            ..SubmissionFilter::default()
        })
        .await?;

    let teams: HashMap<Uuid, String> = store
        .list_teams()
        .await?
        .into_iter()
        .map(|team| (team.id, team.name))
        .collect();
    let clues: HashMap<Uuid, (String, String)> = store
        .list_clues()
        .await?
        .into_iter()
        .map(|clue| (clue.id, (clue.title, clue.expected_answer)))
        .collect();

    Ok(pending
        .into_iter()
        .map(|submission| queue_item(submission, &teams, &clues))
        .collect())
}

fn queue_item(
    submission: SubmissionEntity,
    teams: &HashMap<Uuid, String>,
    clues: &HashMap<Uuid, (String, String)>,
) -> SubmissionQueueItem {
    let team_name = teams
        .get(&submission.team_id)
        .cloned()
        .unwrap_or_else(|| "unknown team".to_owned());
    let (clue_title, expected_answer) = clues
        .get(&submission.clue_id)
        .cloned()
        .unwrap_or_else(|| ("unknown clue".to_owned(), String::new()));

    SubmissionQueueItem {
        submission: submission.into(),
        team_name,
        clue_title,
        expected_answer,
    }
}

/// Emit the one-shot completion announcement for a team that just finished.
async fn celebrate_completion(state: &SharedState, team: &TeamEntity) {
    let announcement = AnnouncementEntity::new(
        Some("Hunt complete!".to_owned()),
        format!(
            "Team {} has solved every clue. Congratulations!",
            team.name
        ),
        AnnouncementPriority::High,
    );

    let result = async {
        let store = state.require_hunt_store().await?;
        store.save_announcement(announcement.clone()).await?;
        Ok::<_, ServiceError>(())
    }
    .await;

    match result {
        Ok(()) => sse_events::broadcast_announcement_created(state, &announcement),
        Err(err) => warn!(team_id = %team.id, error = %err, "failed to record completion announcement"),
    }
}

/// Fire-and-forget deletion of a stored media asset.
fn spawn_media_cleanup(state: &SharedState, delete_handle: Option<String>) {
    let Some(handle) = delete_handle else {
        return;
    };
    let Some(media) = state.media_store() else {
        return;
    };

    tokio::spawn(async move {
        if let Err(err) = media.delete(handle).await {
            warn!(error = %err, "best-effort media deletion failed");
        }
    });
}

fn not_found(submission_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("submission `{submission_id}` not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            hunt_store::{HuntStore, memory::MemoryHuntStore},
            models::{AnswerKind, ClueEntity},
        },
        services::{progress, submission_service},
        state::AppState,
    };
    use std::sync::Arc;

    async fn test_state() -> (SharedState, Arc<dyn HuntStore>) {
        let state = AppState::new(AppConfig::default(), None);
        let store: Arc<dyn HuntStore> = Arc::new(MemoryHuntStore::new());
        state.install_hunt_store(store.clone()).await;
        (state, store)
    }

    async fn seed_clue(store: &Arc<dyn HuntStore>, order_index: u32) -> ClueEntity {
        let clue = ClueEntity {
            id: Uuid::new_v4(),
            order_index,
            title: format!("Clue {order_index}"),
            body: "body".into(),
            answer_kind: AnswerKind::Text,
            expected_answer: "answer".into(),
            image_url: None,
            created_at: SystemTime::now(),
        };
        store.save_clue(clue.clone()).await.unwrap();
        clue
    }

    async fn seed_team(store: &Arc<dyn HuntStore>) -> TeamEntity {
        let team = TeamEntity::new("The Owls".into(), "123456".into());
        store.save_team(team.clone()).await.unwrap();
        team
    }

    async fn seed_pending(
        store: &Arc<dyn HuntStore>,
        team_id: Uuid,
        clue_id: Uuid,
    ) -> SubmissionEntity {
        let submission =
            SubmissionEntity::answered(team_id, clue_id, AnswerKind::Text, "answer".into());
        store.save_submission(submission.clone()).await.unwrap();
        submission
    }

    #[tokio::test]
    async fn approval_advances_the_team_and_unlocks_the_next_clue() {
        let (state, store) = test_state().await;
        let clue_a = seed_clue(&store, 0).await;
        let clue_b = seed_clue(&store, 1).await;
        let team = seed_team(&store).await;

        // Current clue is A; approving A's submission moves the team to B.
        let clues = store.list_clues().await.unwrap();
        assert_eq!(progress::current_clue(&team, &clues).unwrap().id, clue_a.id);

        let submission = submission_service::submit(
            &state,
            &team,
            crate::dto::player::SubmitAnswerRequest {
                clue_id: clue_a.id,
                answer_kind: AnswerKind::Text,
                text: Some("answer".into()),
                photo_base64: None,
                filename: None,
            },
        )
        .await
        .unwrap();

        let view = approve(&state, submission.id).await.unwrap();
        assert_eq!(view.status, SubmissionStatus::Approved);

        let team = store.find_team(team.id).await.unwrap().unwrap();
        assert_eq!(team.completed_clue_ids, vec![clue_a.id]);
        assert_eq!(progress::current_clue(&team, &clues).unwrap().id, clue_b.id);

        let next_entry = team
            .per_clue_status
            .iter()
            .find(|entry| entry.clue_id == clue_b.id)
            .expect("next clue should be stamped");
        assert!(next_entry.unlocked_at.is_some());
    }

    #[tokio::test]
    async fn double_approval_is_idempotent() {
        let (state, store) = test_state().await;
        let clue = seed_clue(&store, 0).await;
        let team = seed_team(&store).await;
        let submission = seed_pending(&store, team.id, clue.id).await;

        approve(&state, submission.id).await.unwrap();
        approve(&state, submission.id).await.unwrap();

        let team = store.find_team(team.id).await.unwrap().unwrap();
        assert_eq!(team.completed_clue_ids, vec![clue.id]);

        // Completing the only clue finished the hunt; the celebration must
        // have been emitted exactly once despite the duplicate approval.
        let announcements = store.list_announcements().await.unwrap();
        assert_eq!(announcements.len(), 1);
        assert!(announcements[0].message.contains("The Owls"));
        assert_eq!(announcements[0].priority, AnnouncementPriority::High);
    }

    #[tokio::test]
    async fn in_flight_upload_cannot_be_approved() {
        let (state, store) = test_state().await;
        let team = seed_team(&store).await;
        let placeholder = SubmissionEntity::photo_placeholder(team.id, Uuid::new_v4());
        store.save_submission(placeholder.clone()).await.unwrap();

        let err = approve(&state, placeholder.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rejection_records_feedback_and_notifies_the_team() {
        let (state, store) = test_state().await;
        let clue = seed_clue(&store, 0).await;
        let team = seed_team(&store).await;
        let submission = seed_pending(&store, team.id, clue.id).await;

        let view = reject(
            &state,
            submission.id,
            RejectRequest {
                feedback: Some("Look closer at the statue".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(view.status, SubmissionStatus::Rejected);
        assert_eq!(view.feedback.as_deref(), Some("Look closer at the statue"));

        let notifications = store.list_notifications(team.id, true).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "Look closer at the statue");
        assert!(!notifications[0].read);
    }

    #[tokio::test]
    async fn rejection_without_feedback_sends_the_generic_prompt() {
        let (state, store) = test_state().await;
        let clue = seed_clue(&store, 0).await;
        let team = seed_team(&store).await;
        let submission = seed_pending(&store, team.id, clue.id).await;

        reject(&state, submission.id, RejectRequest::default())
            .await
            .unwrap();

        let notifications = store.list_notifications(team.id, true).await.unwrap();
        assert_eq!(notifications[0].message, GENERIC_RETRY_PROMPT);
    }

    #[tokio::test]
    async fn only_terminal_failures_can_be_deleted() {
        let (state, store) = test_state().await;
        let clue = seed_clue(&store, 0).await;
        let team = seed_team(&store).await;
        let pending = seed_pending(&store, team.id, clue.id).await;

        let err = delete(&state, pending.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        reject(&state, pending.id, RejectRequest::default())
            .await
            .unwrap();
        delete(&state, pending.id).await.unwrap();
        assert!(store.find_submission(pending.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn queue_joins_team_and_clue_names() {
        let (state, store) = test_state().await;
        let clue = seed_clue(&store, 0).await;
        let team = seed_team(&store).await;
        seed_pending(&store, team.id, clue.id).await;

        let queue = pending_queue(&state).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].team_name, "The Owls");
        assert_eq!(queue[0].clue_title, "Clue 0");
        assert_eq!(queue[0].expected_answer, "answer");
    }

    #[tokio::test]
    async fn completion_announcement_uses_the_live_clue_count() {
        let (state, store) = test_state().await;
        let clue_a = seed_clue(&store, 0).await;
        let clue_b = seed_clue(&store, 1).await;
        let team = seed_team(&store).await;

        let first = seed_pending(&store, team.id, clue_a.id).await;
        approve(&state, first.id).await.unwrap();
        assert!(store.list_announcements().await.unwrap().is_empty());

        let second = seed_pending(&store, team.id, clue_b.id).await;
        approve(&state, second.id).await.unwrap();
        assert_eq!(store.list_announcements().await.unwrap().len(), 1);
    }
}
