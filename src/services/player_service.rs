//! Read-only projections for the player dashboard.

use crate::{
    dao::models::TeamEntity,
    dto::player::{LeaderboardEntry, LeaderboardResponse, ProgressResponse},
    error::ServiceError,
    services::progress,
    state::SharedState,
};

/// The team's position in the hunt: current clue, tallies, finished flag.
pub async fn team_progress(
    state: &SharedState,
    team: &TeamEntity,
) -> Result<ProgressResponse, ServiceError> {
    let store = state.require_hunt_store().await?;
    let clues = store.list_clues().await?;
    let total = clues.len();

    let current_clue = progress::current_clue(team, &clues).cloned().map(Into::into);

    Ok(ProgressResponse {
        completed: team.completed_clue_ids.len(),
        total,
        finished: current_clue.is_none(),
        current_clue,
    })
}

/// Teams ordered by completed clue count, descending.
pub async fn leaderboard(state: &SharedState) -> Result<LeaderboardResponse, ServiceError> {
    let store = state.require_hunt_store().await?;
    let mut teams = store.list_teams().await?;
    teams.sort_by(|a, b| b.completed_clue_ids.len().cmp(&a.completed_clue_ids.len()));

    Ok(LeaderboardResponse {
        teams: teams
            .into_iter()
            .map(|team| LeaderboardEntry {
                team_id: team.id,
                name: team.name,
                completed: team.completed_clue_ids.len(),
            })
            .collect(),
    })
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
        state::{AppState, SharedState},
    };
    use std::{sync::Arc, time::SystemTime};
    use uuid::Uuid;

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

    #[tokio::test]
    async fn progress_reports_the_current_clue_without_the_answer() {
        let (state, store) = test_state().await;
        seed_clue(&store, 0).await;
        seed_clue(&store, 1).await;
        let team = TeamEntity::new("The Owls".into(), "123456".into());
        store.save_team(team.clone()).await.unwrap();

        let response = team_progress(&state, &team).await.unwrap();
        assert_eq!(response.completed, 0);
        assert_eq!(response.total, 2);
        assert!(!response.finished);
        assert_eq!(response.current_clue.unwrap().order_index, 0);
    }

    #[tokio::test]
    async fn finished_team_gets_no_current_clue() {
        let (state, store) = test_state().await;
        let clue = seed_clue(&store, 0).await;
        let mut team = TeamEntity::new("The Owls".into(), "123456".into());
        team.complete_clue(clue.id);
        store.save_team(team.clone()).await.unwrap();

        let response = team_progress(&state, &team).await.unwrap();
        assert!(response.finished);
        assert!(response.current_clue.is_none());
    }

    #[tokio::test]
    async fn leaderboard_orders_by_completed_count() {
        let (state, store) = test_state().await;

        let mut ahead = TeamEntity::new("The Foxes".into(), "222222".into());
        ahead.complete_clue(Uuid::new_v4());
        ahead.complete_clue(Uuid::new_v4());
        store.save_team(ahead.clone()).await.unwrap();

        let behind = TeamEntity::new("The Owls".into(), "111111".into());
        store.save_team(behind).await.unwrap();

        let board = leaderboard(&state).await.unwrap();
        assert_eq!(board.teams[0].name, "The Foxes");
        assert_eq!(board.teams[0].completed, 2);
        assert_eq!(board.teams[1].completed, 0);
    }
}
