//! The finale: staff-configured treasure content behind a two-step gate
//! (automatic eligibility once every clue is done, manual staff grant).

use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::models::{FinaleConfigEntity, TeamEntity},
    dto::{
        coordinator::{FinaleConfigInput, FinaleTeamRow},
        player::{FinaleView, FormulaAttemptRequest, FormulaAttemptResponse},
    },
    error::ServiceError,
    services::{progress, sse_events},
    state::SharedState,
};

/// Save the finale configuration.
pub async fn save_config(
    state: &SharedState,
    input: FinaleConfigInput,
) -> Result<(), ServiceError> {
    let store = state.require_hunt_store().await?;

    let config = FinaleConfigEntity {
        map_image_url: input.map_image_url.filter(|url| !url.trim().is_empty()),
        map_description: input.map_description.filter(|text| !text.trim().is_empty()),
        formula_text: input.formula_text.filter(|text| !text.trim().is_empty()),
        missing_answer: input.missing_answer.trim().to_owned(),
        updated_at: SystemTime::now(),
    };
    store.save_finale_config(config).await?;

    sse_events::broadcast_finale_changed(state);
    Ok(())
}

/// The approval board: every team that has finished the sequence.
pub async fn team_rows(state: &SharedState) -> Result<Vec<FinaleTeamRow>, ServiceError> {
    let store = state.require_hunt_store().await?;
    let teams = store.list_teams().await?;
    let total = store.list_clues().await?.len();

    Ok(teams
        .into_iter()
        .filter(|team| progress::is_sequence_complete(team, total))
        .map(|team| FinaleTeamRow {
            team_id: team.id,
            name: team.name,
            completed: team.completed_clue_ids.len(),
            total,
            approved: team.gate_flags.finale_approved,
            formula_completed: team.gate_flags.formula_completed,
        })
        .collect())
}

/// Grant or revoke a team's finale access.
pub async fn set_approval(
    state: &SharedState,
    team_id: Uuid,
    approved: bool,
) -> Result<(), ServiceError> {
    let store = state.require_hunt_store().await?;
    let mut team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;

    team.gate_flags.finale_approved = approved;
    team.updated_at = SystemTime::now();
    store.save_team(team).await?;

    sse_events::broadcast_finale_grant(state, team_id, approved);
    Ok(())
}

/// The finale as one team sees it right now. Content fields are only present
/// while the gate is open.
pub async fn player_view(
    state: &SharedState,
    team: &TeamEntity,
) -> Result<FinaleView, ServiceError> {
    let store = state.require_hunt_store().await?;
    let total = store.list_clues().await?.len();

    let eligible = progress::is_sequence_complete(team, total);
    let open = progress::is_finale_open(team, total);
    let config = if open {
        store.find_finale_config().await?
    } else {
        None
    };

    Ok(FinaleView {
        eligible,
        approved: team.gate_flags.finale_approved,
        open,
        formula_completed: team.gate_flags.formula_completed,
        map_image_url: config.as_ref().and_then(|c| c.map_image_url.clone()),
        map_description: config.as_ref().and_then(|c| c.map_description.clone()),
        formula_text: config.and_then(|c| c.formula_text),
    })
}

/// Grade a team's attempt at the missing formula part.
pub async fn attempt_formula(
    state: &SharedState,
    team: &TeamEntity,
    request: FormulaAttemptRequest,
) -> Result<FormulaAttemptResponse, ServiceError> {
    let store = state.require_hunt_store().await?;
    let total = store.list_clues().await?.len();

    if !progress::is_finale_open(team, total) {
        return Err(ServiceError::InvalidState(
            "the finale is not open for this team".into(),
        ));
    }

    let config = store
        .find_finale_config()
        .await?
        .ok_or_else(|| ServiceError::NotFound("the finale is not configured".into()))?;

    let correct = config.answer_matches(&request.answer);
    if correct && !team.gate_flags.formula_completed {
        if let Some(mut fresh) = store.find_team(team.id).await? {
            fresh.gate_flags.formula_completed = true;
            fresh.updated_at = SystemTime::now();
            store.save_team(fresh).await?;
        }
    }

    Ok(FormulaAttemptResponse { correct })
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
    use std::sync::Arc;

    async fn test_state() -> (SharedState, Arc<dyn HuntStore>) {
        let state = AppState::new(AppConfig::default(), None);
        let store: Arc<dyn HuntStore> = Arc::new(MemoryHuntStore::new());
        state.install_hunt_store(store.clone()).await;
        (state, store)
    }

    async fn seed_clues(store: &Arc<dyn HuntStore>, count: u32) -> Vec<ClueEntity> {
        let mut clues = Vec::new();
        for order_index in 0..count {
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
            clues.push(clue);
        }
        clues
    }

    async fn seed_config(state: &SharedState) {
        save_config(
            state,
            FinaleConfigInput {
                map_image_url: Some("https://example.com/map.jpg".into()),
                map_description: Some("Under the old oak".into()),
                formula_text: Some("X marks ??? spot".into()),
                missing_answer: "the buried".into(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn view_stays_closed_until_approved() {
        let (state, store) = test_state().await;
        let clues = seed_clues(&store, 2).await;
        seed_config(&state).await;

        let mut team = TeamEntity::new("The Owls".into(), "123456".into());
        for clue in &clues {
            team.complete_clue(clue.id);
        }
        store.save_team(team.clone()).await.unwrap();

        let view = player_view(&state, &team).await.unwrap();
        assert!(view.eligible);
        assert!(!view.open);
        assert!(view.map_image_url.is_none());

        set_approval(&state, team.id, true).await.unwrap();
        let team = store.find_team(team.id).await.unwrap().unwrap();
        let view = player_view(&state, &team).await.unwrap();
        assert!(view.open);
        assert_eq!(view.map_description.as_deref(), Some("Under the old oak"));
    }

    #[tokio::test]
    async fn attempt_requires_an_open_gate() {
        let (state, store) = test_state().await;
        seed_clues(&store, 2).await;
        seed_config(&state).await;

        let mut team = TeamEntity::new("The Owls".into(), "123456".into());
        team.gate_flags.finale_approved = true;
        store.save_team(team.clone()).await.unwrap();

        // Approved but not eligible: still closed.
        let err = attempt_formula(
            &state,
            &team,
            FormulaAttemptRequest {
                answer: "the buried".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn correct_attempt_marks_the_formula_completed() {
        let (state, store) = test_state().await;
        let clues = seed_clues(&store, 1).await;
        seed_config(&state).await;

        let mut team = TeamEntity::new("The Owls".into(), "123456".into());
        team.complete_clue(clues[0].id);
        team.gate_flags.finale_approved = true;
        store.save_team(team.clone()).await.unwrap();

        let wrong = attempt_formula(
            &state,
            &team,
            FormulaAttemptRequest {
                answer: "a wild guess".into(),
            },
        )
        .await
        .unwrap();
        assert!(!wrong.correct);

        let right = attempt_formula(
            &state,
            &team,
            FormulaAttemptRequest {
                answer: "  THE BURIED ".into(),
            },
        )
        .await
        .unwrap();
        assert!(right.correct);

        let fresh = store.find_team(team.id).await.unwrap().unwrap();
        assert!(fresh.gate_flags.formula_completed);
    }

    #[tokio::test]
    async fn board_lists_only_finished_teams() {
        let (state, store) = test_state().await;
        let clues = seed_clues(&store, 2).await;

        let mut finished = TeamEntity::new("The Foxes".into(), "222222".into());
        for clue in &clues {
            finished.complete_clue(clue.id);
        }
        store.save_team(finished).await.unwrap();
        store
            .save_team(TeamEntity::new("The Owls".into(), "111111".into()))
            .await
            .unwrap();

        let rows = team_rows(&state).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "The Foxes");
        assert!(!rows[0].approved);
    }
}
