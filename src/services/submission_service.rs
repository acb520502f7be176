//! Submission pipeline: validation, duplicate suppression, and the optimistic
//! placeholder protocol for photo uploads.
//!
//! Text and scan answers are a single synchronous write. Photos are written
//! as a `pending`/`uploading` placeholder first so the review queue sees them
//! arrive in real time; a background task then transfers the bytes within a
//! bounded timeout/retry budget and patches the same document with the final
//! URL, or marks it `upload_failed` once the budget is spent.

use std::{sync::Arc, time::SystemTime};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        hunt_store::{HuntStore, SubmissionFilter},
        models::{AnswerKind, ClueProgressStatus, SubmissionEntity, TeamEntity},
    },
    dto::{common::SubmissionView, player::SubmitAnswerRequest},
    error::ServiceError,
    media::{MediaStore, StoredMedia},
    services::sse_events,
    state::{
        SharedState,
        lifecycle::{LifecycleEvent, SubmissionState},
    },
};

/// Fallback filename forwarded to the media service when the client sends none.
const DEFAULT_PHOTO_FILENAME: &str = "photo.jpg";

/// Record a team's answer for a clue.
///
/// Returns the stored submission immediately; for photos the returned view is
/// the placeholder and the content URL arrives later through the team's SSE
/// stream.
pub async fn submit(
    state: &SharedState,
    team: &TeamEntity,
    request: SubmitAnswerRequest,
) -> Result<SubmissionView, ServiceError> {
    let store = state.require_hunt_store().await?;

    let clue = store
        .find_clue(request.clue_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("clue `{}` not found", request.clue_id)))?;

    if clue.answer_kind != request.answer_kind {
        return Err(ServiceError::InvalidInput(format!(
            "clue expects a {} answer, got {}",
            clue.answer_kind.as_str(),
            request.answer_kind.as_str()
        )));
    }

    if team.has_completed(clue.id) {
        return Err(ServiceError::InvalidState(
            "this clue has already been completed".into(),
        ));
    }

    guard_duplicates(store.as_ref(), team.id, clue.id).await?;

    match request.answer_kind {
        AnswerKind::Text | AnswerKind::Scan => {
            let content = request
                .text
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_owned();
            if content.is_empty() {
                return Err(ServiceError::InvalidInput(
                    "a non-empty answer is required".into(),
                ));
            }

            let submission =
                SubmissionEntity::answered(team.id, clue.id, request.answer_kind, content);
            store.save_submission(submission.clone()).await?;

            touch_per_clue_status(state, team.id, clue.id).await;
            sse_events::broadcast_submission_created(state, &submission);
            Ok(submission.into())
        }
        AnswerKind::Photo => {
            let media = state.media_store().ok_or_else(|| {
                ServiceError::InvalidState("media uploads are not configured".into())
            })?;

            let bytes = BASE64.decode(request.photo_base64.unwrap_or_default()).map_err(|_| {
                ServiceError::InvalidInput("photo payload is not valid base64".into())
            })?;
            if bytes.is_empty() {
                return Err(ServiceError::InvalidInput("photo payload is empty".into()));
            }
            let filename = request
                .filename
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PHOTO_FILENAME.to_owned());

            let placeholder = SubmissionEntity::photo_placeholder(team.id, clue.id);
            store.save_submission(placeholder.clone()).await?;

            touch_per_clue_status(state, team.id, clue.id).await;
            sse_events::broadcast_submission_created(state, &placeholder);

            tokio::spawn(run_media_transfer(
                state.clone(),
                media,
                placeholder.id,
                bytes,
                filename,
            ));

            Ok(placeholder.into())
        }
    }
}

/// List a team's own submissions, newest first.
pub async fn list_for_team(
    state: &SharedState,
    team_id: Uuid,
) -> Result<Vec<SubmissionView>, ServiceError> {
    let store = state.require_hunt_store().await?;
    let submissions = store
        .list_submissions(SubmissionFilter {
            team_id: Some(team_id),
            ..SubmissionFilter::default()
        })
        .await?;
    Ok(submissions.into_iter().map(Into::into).collect())
}

/// Best-effort duplicate suppression for one `(team, clue)` pair.
///
/// This is a read-then-write check, not a compare-and-swap: two concurrent
/// submits can both pass it and produce two documents. The review engine's
/// idempotent approval bounds the damage, so the window is accepted.
async fn guard_duplicates(
    store: &dyn HuntStore,
    team_id: Uuid,
    clue_id: Uuid,
) -> Result<(), ServiceError> {
    let existing = store
        .list_submissions(SubmissionFilter::active_pair(team_id, clue_id))
        .await?;
    if existing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Duplicate(
            "an answer for this clue is already pending or approved".into(),
        ))
    }
}

/// Stamp the team's per-clue side channel with the submission time.
///
/// Failure here never fails the submission; the channel only feeds duration
/// statistics.
async fn touch_per_clue_status(state: &SharedState, team_id: Uuid, clue_id: Uuid) {
    let result = async {
        let store = state.require_hunt_store().await?;
        let Some(mut team) = store.find_team(team_id).await? else {
            return Ok::<_, ServiceError>(());
        };
        let entry = team.progress_entry(clue_id);
        entry.submitted_at = Some(SystemTime::now());
        entry.status = ClueProgressStatus::Submitted;
        store.save_team(team).await?;
        Ok(())
    }
    .await;

    if let Err(err) = result {
        warn!(%team_id, %clue_id, error = %err, "failed to update per-clue status");
    }
}

/// Drive one placeholder's media transfer to its terminal outcome.
async fn run_media_transfer(
    state: SharedState,
    media: Arc<dyn MediaStore>,
    submission_id: Uuid,
    bytes: Vec<u8>,
    filename: String,
) {
    let outcome = transfer_with_retries(&state, media.as_ref(), &bytes, &filename).await;

    match outcome {
        Some(stored) => finalize_media_success(&state, media.as_ref(), submission_id, stored).await,
        None => finalize_media_failure(&state, submission_id).await,
    }
}

/// Attempt the upload within the configured timeout, retrying with linear
/// backoff until the budget is spent.
async fn transfer_with_retries(
    state: &SharedState,
    media: &dyn MediaStore,
    bytes: &[u8],
    filename: &str,
) -> Option<StoredMedia> {
    let policy = state.config().upload.clone();

    for attempt in 1..=policy.attempts() {
        match timeout(
            policy.timeout,
            media.upload(bytes.to_vec(), filename.to_owned()),
        )
        .await
        {
            Ok(Ok(stored)) => return Some(stored),
            Ok(Err(err)) => warn!(attempt, error = %err, "media upload attempt failed"),
            Err(_) => warn!(attempt, "media upload attempt timed out"),
        }

        if attempt < policy.attempts() {
            sleep(policy.backoff_step * attempt).await;
        }
    }

    None
}

/// Patch the placeholder with the stored URL, or clean up when the document
/// already left the uploading state (deleted, or swept to `upload_failed`).
async fn finalize_media_success(
    state: &SharedState,
    media: &dyn MediaStore,
    submission_id: Uuid,
    stored: StoredMedia,
) {
    let Some(store) = state.hunt_store().await else {
        warn!(%submission_id, "storage gone before upload patch; asset left orphaned");
        return;
    };

    let submission = match store.find_submission(submission_id).await {
        Ok(Some(submission)) => submission,
        Ok(None) => {
            // Placeholder deleted while the transfer ran; the asset has no owner.
            discard_asset(media, stored.delete_handle).await;
            return;
        }
        Err(err) => {
            warn!(%submission_id, error = %err, "failed to load placeholder for patch");
            return;
        }
    };

    let next = match SubmissionState::of(&submission).apply(LifecycleEvent::MediaResolved) {
        Ok(next) => next,
        Err(invalid) => {
            // The reconciliation sweep won the race; honor its verdict.
            warn!(%submission_id, %invalid, "late upload completion discarded");
            discard_asset(media, stored.delete_handle).await;
            return;
        }
    };

    let mut patched = submission;
    patched.status = next.status;
    patched.uploading = next.uploading;
    patched.content = stored.url;
    patched.media_delete_handle = Some(stored.delete_handle);

    match store.save_submission(patched.clone()).await {
        Ok(()) => sse_events::broadcast_submission_updated(state, &patched),
        Err(err) => warn!(%submission_id, error = %err, "failed to persist upload patch"),
    }
}

/// Mark the placeholder `upload_failed` after the retry budget is spent.
async fn finalize_media_failure(state: &SharedState, submission_id: Uuid) {
    let Some(store) = state.hunt_store().await else {
        warn!(%submission_id, "storage gone before upload failure patch");
        return;
    };

    let submission = match store.find_submission(submission_id).await {
        Ok(Some(submission)) => submission,
        Ok(None) => return,
        Err(err) => {
            warn!(%submission_id, error = %err, "failed to load placeholder for failure patch");
            return;
        }
    };

    let next = match SubmissionState::of(&submission).apply(LifecycleEvent::MediaFailed) {
        Ok(next) => next,
        Err(invalid) => {
            warn!(%submission_id, %invalid, "upload failure patch skipped");
            return;
        }
    };

    let mut patched = submission;
    patched.status = next.status;
    patched.uploading = next.uploading;

    match store.save_submission(patched.clone()).await {
        Ok(()) => {
            info!(%submission_id, "submission marked upload_failed after exhausted retries");
            sse_events::broadcast_submission_updated(state, &patched);
        }
        Err(err) => warn!(%submission_id, error = %err, "failed to persist upload failure"),
    }
}

async fn discard_asset(media: &dyn MediaStore, delete_handle: String) {
    if let Err(err) = media.delete(delete_handle).await {
        warn!(error = %err, "failed to discard orphaned media asset");
    }
}

/// Sweep submissions stuck in `uploading` past the stale cutoff to
/// `upload_failed`, covering crashes between the placeholder write and its
/// patch. Returns the number of documents swept.
pub async fn reconcile_stalled_uploads(state: &SharedState) -> Result<usize, ServiceError> {
    let store = state.require_hunt_store().await?;
    let cutoff = SystemTime::now() - state.config().stale_upload_cutoff;
    let stalled = store.list_stalled_uploads(cutoff).await?;

    let mut swept = 0;
    for submission in stalled {
        let next = match SubmissionState::of(&submission).apply(LifecycleEvent::MediaFailed) {
            Ok(next) => next,
            Err(_) => continue,
        };

        let mut patched = submission;
        patched.status = next.status;
        patched.uploading = next.uploading;
        store.save_submission(patched.clone()).await?;
        sse_events::broadcast_submission_updated(state, &patched);
        swept += 1;
    }

    Ok(swept)
}

/// Periodic reconciliation task spawned at startup.
pub async fn run_reconciliation(state: SharedState) {
    let mut ticker = interval(state.config().reconcile_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match reconcile_stalled_uploads(&state).await {
            Ok(0) => {}
            Ok(count) => info!(count, "swept stalled uploads to upload_failed"),
            // Nothing to sweep without storage; the supervisor will reconnect.
            Err(ServiceError::Degraded) => {}
            Err(err) => warn!(error = %err, "stalled upload sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            hunt_store::memory::MemoryHuntStore,
            models::{ClueEntity, SubmissionStatus},
        },
        media::{MediaError, MediaResult},
        state::AppState,
    };
    use futures::future::BoxFuture;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    struct MockMedia {
        fail: bool,
        uploads: AtomicUsize,
        deletes: AtomicUsize,
    }

    impl MockMedia {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                uploads: AtomicUsize::new(0),
                deletes: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                uploads: AtomicUsize::new(0),
                deletes: AtomicUsize::new(0),
            })
        }
    }

    impl MediaStore for Arc<MockMedia> {
        fn upload(
            &self,
            _bytes: Vec<u8>,
            filename: String,
        ) -> BoxFuture<'static, MediaResult<StoredMedia>> {
            let this = self.clone();
            Box::pin(async move {
                let attempt = this.uploads.fetch_add(1, Ordering::SeqCst) + 1;
                if this.fail {
                    Err(MediaError::RequestStatus {
                        status: reqwest::StatusCode::BAD_GATEWAY,
                    })
                } else {
                    Ok(StoredMedia {
                        url: format!("https://media.example/{filename}#{attempt}"),
                        delete_handle: format!("handle-{attempt}"),
                    })
                }
            })
        }

        fn delete(&self, _delete_handle: String) -> BoxFuture<'static, MediaResult<()>> {
            let this = self.clone();
            Box::pin(async move {
                this.deletes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    async fn test_state(media: Option<Arc<dyn MediaStore>>) -> (SharedState, Arc<dyn HuntStore>) {
        let mut config = AppConfig::default();
        config.upload.timeout = Duration::from_millis(250);
        config.upload.max_retries = 2;
        config.upload.backoff_step = Duration::from_millis(1);

        let state = AppState::new(config, media);
        let store: Arc<dyn HuntStore> = Arc::new(MemoryHuntStore::new());
        state.install_hunt_store(store.clone()).await;
        (state, store)
    }

    async fn seed_clue(store: &Arc<dyn HuntStore>, answer_kind: AnswerKind) -> ClueEntity {
        let clue = ClueEntity {
            id: Uuid::new_v4(),
            order_index: 0,
            title: "First clue".into(),
            body: "Find the lantern".into(),
            answer_kind,
            expected_answer: match answer_kind {
                AnswerKind::Photo => String::new(),
                _ => "lantern".into(),
            },
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

    fn text_request(clue_id: Uuid, text: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            clue_id,
            answer_kind: AnswerKind::Text,
            text: Some(text.into()),
            photo_base64: None,
            filename: None,
        }
    }

    fn photo_request(clue_id: Uuid) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            clue_id,
            answer_kind: AnswerKind::Photo,
            text: None,
            photo_base64: Some(BASE64.encode(b"not-really-a-jpeg")),
            filename: Some("door.jpg".into()),
        }
    }

    async fn settled(store: &Arc<dyn HuntStore>, id: Uuid) -> SubmissionEntity {
        for _ in 0..500 {
            let submission = store.find_submission(id).await.unwrap().unwrap();
            if !submission.uploading {
                return submission;
            }
            sleep(Duration::from_millis(2)).await;
        }
        panic!("upload never settled");
    }

    #[tokio::test]
    async fn text_submission_round_trips_trimmed_content() {
        let (state, store) = test_state(None).await;
        let clue = seed_clue(&store, AnswerKind::Text).await;
        let team = seed_team(&store).await;

        let view = submit(&state, &team, text_request(clue.id, "  the lantern \n"))
            .await
            .unwrap();

        assert_eq!(view.content, "the lantern");
        assert_eq!(view.status, SubmissionStatus::Pending);
        assert!(!view.uploading);

        let stored = store.find_submission(view.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "the lantern");
    }

    #[tokio::test]
    async fn duplicate_guard_rejects_second_submit_without_writing() {
        let (state, store) = test_state(None).await;
        let clue = seed_clue(&store, AnswerKind::Text).await;
        let team = seed_team(&store).await;

        submit(&state, &team, text_request(clue.id, "first")).await.unwrap();
        let err = submit(&state, &team, text_request(clue.id, "second"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));

        let all = store
            .list_submissions(SubmissionFilter {
                team_id: Some(team.id),
                clue_id: Some(clue.id),
                statuses: None,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn rejected_submission_does_not_block_a_retry() {
        let (state, store) = test_state(None).await;
        let clue = seed_clue(&store, AnswerKind::Text).await;
        let team = seed_team(&store).await;

        let first = submit(&state, &team, text_request(clue.id, "wrong guess"))
            .await
            .unwrap();
        let mut stored = store.find_submission(first.id).await.unwrap().unwrap();
        stored.status = SubmissionStatus::Rejected;
        store.save_submission(stored).await.unwrap();

        submit(&state, &team, text_request(clue.id, "better guess"))
            .await
            .expect("retry after rejection should be accepted");
    }

    #[tokio::test]
    async fn answer_kind_must_match_the_clue() {
        let (state, store) = test_state(None).await;
        let clue = seed_clue(&store, AnswerKind::Photo).await;
        let team = seed_team(&store).await;

        let err = submit(&state, &team, text_request(clue.id, "words"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn completed_clue_cannot_be_submitted_again() {
        let (state, store) = test_state(None).await;
        let clue = seed_clue(&store, AnswerKind::Text).await;
        let mut team = seed_team(&store).await;
        team.complete_clue(clue.id);
        store.save_team(team.clone()).await.unwrap();

        let err = submit(&state, &team, text_request(clue.id, "again"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn photo_placeholder_is_patched_with_the_stored_url() {
        let media = MockMedia::succeeding();
        let (state, store) = test_state(Some(Arc::new(media.clone()) as Arc<dyn MediaStore>)).await;
        let clue = seed_clue(&store, AnswerKind::Photo).await;
        let team = seed_team(&store).await;

        let view = submit(&state, &team, photo_request(clue.id)).await.unwrap();
        assert!(view.uploading);
        assert_eq!(view.content, "");

        let final_doc = settled(&store, view.id).await;
        assert_eq!(final_doc.status, SubmissionStatus::Pending);
        assert!(final_doc.content.starts_with("https://media.example/door.jpg"));
        assert!(final_doc.media_delete_handle.is_some());
    }

    #[tokio::test]
    async fn exhausted_retries_end_in_upload_failed_and_allow_retry() {
        let media = MockMedia::failing();
        let (state, store) = test_state(Some(Arc::new(media.clone()) as Arc<dyn MediaStore>)).await;
        let clue = seed_clue(&store, AnswerKind::Photo).await;
        let team = seed_team(&store).await;

        let view = submit(&state, &team, photo_request(clue.id)).await.unwrap();
        let final_doc = settled(&store, view.id).await;

        assert_eq!(final_doc.status, SubmissionStatus::UploadFailed);
        assert!(!final_doc.uploading);
        assert_eq!(final_doc.content, "");
        // Initial attempt plus two retries.
        assert_eq!(media.uploads.load(Ordering::SeqCst), 3);

        submit(&state, &team, photo_request(clue.id))
            .await
            .expect("upload_failed must not trip the duplicate guard");
    }

    #[tokio::test]
    async fn sweep_marks_stale_placeholders_failed() {
        let (state, store) = test_state(None).await;
        let team = seed_team(&store).await;

        let mut stale = SubmissionEntity::photo_placeholder(team.id, Uuid::new_v4());
        stale.submitted_at = SystemTime::now() - Duration::from_secs(3600);
        store.save_submission(stale.clone()).await.unwrap();

        let fresh = SubmissionEntity::photo_placeholder(team.id, Uuid::new_v4());
        store.save_submission(fresh.clone()).await.unwrap();

        let swept = reconcile_stalled_uploads(&state).await.unwrap();
        assert_eq!(swept, 1);

        let swept_doc = store.find_submission(stale.id).await.unwrap().unwrap();
        assert_eq!(swept_doc.status, SubmissionStatus::UploadFailed);
        assert!(!swept_doc.uploading);

        let untouched = store.find_submission(fresh.id).await.unwrap().unwrap();
        assert!(untouched.uploading);
    }

    #[tokio::test]
    async fn per_clue_status_records_the_submission_time() {
        let (state, store) = test_state(None).await;
        let clue = seed_clue(&store, AnswerKind::Text).await;
        let team = seed_team(&store).await;

        submit(&state, &team, text_request(clue.id, "lantern")).await.unwrap();

        let stored_team = store.find_team(team.id).await.unwrap().unwrap();
        let entry = stored_team
            .per_clue_status
            .iter()
            .find(|entry| entry.clue_id == clue.id)
            .expect("per-clue entry should exist");
        assert!(entry.submitted_at.is_some());
        assert_eq!(entry.status, ClueProgressStatus::Submitted);
    }
}
