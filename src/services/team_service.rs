//! Team registration, identity resolution, and staff roster operations.

use rand::Rng;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{
        hunt_store::{HuntStore, SubmissionFilter},
        models::TeamEntity,
    },
    dto::coordinator::{CreateTeamRequest, ProgressOverview, TeamDetail, TeamProgressRow},
    error::ServiceError,
    services::{progress, sse_events},
    state::SharedState,
};

/// Attempts at finding a free join code before giving up.
const JOIN_CODE_ATTEMPTS: u32 = 20;

/// Register a new team with a freshly allocated join code.
pub async fn register(
    state: &SharedState,
    request: CreateTeamRequest,
) -> Result<TeamDetail, ServiceError> {
    let store = state.require_hunt_store().await?;

    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "team name must not be empty".into(),
        ));
    }

    let join_code = allocate_join_code(store.as_ref()).await?;
    let team = TeamEntity::new(name, join_code);
    store.save_team(team.clone()).await?;

    sse_events::broadcast_team_created(state, team.id);
    Ok(team.into())
}

/// Resolve a team from its join code, as used by player identity headers.
pub async fn resolve_by_join_code(
    state: &SharedState,
    join_code: &str,
) -> Result<TeamEntity, ServiceError> {
    let store = state.require_hunt_store().await?;
    store
        .find_team_by_join_code(join_code.to_owned())
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("unknown join code".into()))
}

/// Load a team by id or fail with not-found.
pub async fn require_team(state: &SharedState, team_id: Uuid) -> Result<TeamEntity, ServiceError> {
    let store = state.require_hunt_store().await?;
    store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))
}

/// All teams with their join codes, for the staff roster.
pub async fn list(state: &SharedState) -> Result<Vec<TeamDetail>, ServiceError> {
    let store = state.require_hunt_store().await?;
    let teams = store.list_teams().await?;
    Ok(teams.into_iter().map(Into::into).collect())
}

/// Live progress of every team against the current clue sequence.
pub async fn progress_overview(state: &SharedState) -> Result<ProgressOverview, ServiceError> {
    let store = state.require_hunt_store().await?;
    let teams = store.list_teams().await?;
    let clues = store.list_clues().await?;
    let total = clues.len();

    let rows = teams
        .into_iter()
        .map(|team| {
            let current_clue_title =
                progress::current_clue(&team, &clues).map(|clue| clue.title.clone());
            TeamProgressRow {
                team_id: team.id,
                name: team.name,
                completed: team.completed_clue_ids.len(),
                total,
                current_clue_title,
            }
        })
        .collect();

    Ok(ProgressOverview { teams: rows })
}

/// Clear a team's progress, gate grants included.
pub async fn reset_progress(
    state: &SharedState,
    team_id: Uuid,
) -> Result<TeamDetail, ServiceError> {
    let store = state.require_hunt_store().await?;
    let mut team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;

    team.reset_progress();
    store.save_team(team.clone()).await?;

    let total = store.list_clues().await?.len();
    sse_events::broadcast_team_progress(state, &team, total);
    Ok(team.into())
}

/// Delete a team and cascade to everything that references it.
pub async fn delete(state: &SharedState, team_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_hunt_store().await?;

    if store.find_team(team_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("team `{team_id}` not found")));
    }

    // A team is never removed while its submissions survive it.
    let submissions = store
        .list_submissions(SubmissionFilter {
            team_id: Some(team_id),
            ..SubmissionFilter::default()
        })
        .await?;
    for submission in submissions {
        if let Some(handle) = submission.media_delete_handle.clone() {
            spawn_media_cleanup(state, handle);
        }
        store.delete_submission(submission.id).await?;
    }

    let notifications = store.list_notifications(team_id, false).await?;
    for notification in notifications {
        store.delete_notification(notification.id).await?;
    }

    store.delete_team(team_id).await?;
    state.forget_team_sse(team_id);
    sse_events::broadcast_team_deleted(state, team_id);
    Ok(())
}

async fn allocate_join_code(store: &dyn HuntStore) -> Result<String, ServiceError> {
    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code = generate_join_code();
        if store.find_team_by_join_code(code.clone()).await?.is_none() {
            return Ok(code);
        }
    }

    Err(ServiceError::InvalidState(
        "could not allocate a unique join code".into(),
    ))
}

fn generate_join_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000u32))
}

fn spawn_media_cleanup(state: &SharedState, handle: String) {
    let Some(media) = state.media_store() else {
        return;
    };
    tokio::spawn(async move {
        if let Err(err) = media.delete(handle).await {
            warn!(error = %err, "best-effort media deletion failed during team cascade");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            hunt_store::memory::MemoryHuntStore,
            models::{AnswerKind, NotificationEntity, SubmissionEntity},
        },
        state::AppState,
    };
    use std::sync::Arc;

    async fn test_state() -> (SharedState, Arc<dyn HuntStore>) {
        let state = AppState::new(AppConfig::default(), None);
        let store: Arc<dyn HuntStore> = Arc::new(MemoryHuntStore::new());
        state.install_hunt_store(store.clone()).await;
        (state, store)
    }

    #[tokio::test]
    async fn registration_allocates_distinct_six_digit_codes() {
        let (state, _store) = test_state().await;

        let first = register(
            &state,
            CreateTeamRequest {
                name: "The Owls".into(),
            },
        )
        .await
        .unwrap();
        let second = register(
            &state,
            CreateTeamRequest {
                name: "The Foxes".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(first.join_code.len(), 6);
        assert!(first.join_code.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(first.join_code, second.join_code);
    }

    #[tokio::test]
    async fn join_code_resolution_rejects_unknown_codes() {
        let (state, _store) = test_state().await;
        register(
            &state,
            CreateTeamRequest {
                name: "The Owls".into(),
            },
        )
        .await
        .unwrap();

        let err = resolve_by_join_code(&state, "000000").await;
        assert!(matches!(err, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn reset_clears_progress_and_grants() {
        let (state, store) = test_state().await;
        let mut team = TeamEntity::new("The Owls".into(), "123456".into());
        team.complete_clue(Uuid::new_v4());
        team.gate_flags.finale_approved = true;
        store.save_team(team.clone()).await.unwrap();

        let detail = reset_progress(&state, team.id).await.unwrap();
        assert_eq!(detail.completed, 0);
        assert!(!detail.gate_flags.finale_approved);
    }

    #[tokio::test]
    async fn delete_cascades_to_submissions_and_notifications() {
        let (state, store) = test_state().await;
        let team = TeamEntity::new("The Owls".into(), "123456".into());
        store.save_team(team.clone()).await.unwrap();

        let submission =
            SubmissionEntity::answered(team.id, Uuid::new_v4(), AnswerKind::Text, "hi".into());
        store.save_submission(submission.clone()).await.unwrap();
        let notification = NotificationEntity::new(team.id, "try again".into());
        store.save_notification(notification.clone()).await.unwrap();

        delete(&state, team.id).await.unwrap();

        assert!(store.find_team(team.id).await.unwrap().is_none());
        assert!(
            store
                .find_submission(submission.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .list_notifications(team.id, false)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn overview_reports_current_clue_titles() {
        let (state, store) = test_state().await;
        let clue = crate::dao::models::ClueEntity {
            id: Uuid::new_v4(),
            order_index: 0,
            title: "The fountain".into(),
            body: "body".into(),
            answer_kind: AnswerKind::Text,
            expected_answer: "water".into(),
            image_url: None,
            created_at: std::time::SystemTime::now(),
        };
        store.save_clue(clue).await.unwrap();
        store
            .save_team(TeamEntity::new("The Owls".into(), "123456".into()))
            .await
            .unwrap();

        let overview = progress_overview(&state).await.unwrap();
        assert_eq!(overview.teams.len(), 1);
        assert_eq!(
            overview.teams[0].current_clue_title.as_deref(),
            Some("The fountain")
        );
        assert_eq!(overview.teams[0].total, 1);
    }
}
