//! The side mystery: staff configuration, per-team views, and one-shot
//! accusations.

use std::{collections::HashMap, time::SystemTime};

use uuid::Uuid;

use crate::{
    dao::models::{AccusationEntity, MysteryEntity, TeamEntity},
    dto::{
        coordinator::{AccusationRow, MysteryInput, MysteryStatus},
        player::{AccusationRequest, AccusationView, MysteryView, SuspectView},
    },
    error::ServiceError,
    services::{progress, sse_events},
    state::SharedState,
};

/// Save the mystery configuration, preserving any earlier reveal.
pub async fn configure(
    state: &SharedState,
    input: MysteryInput,
) -> Result<MysteryStatus, ServiceError> {
    let store = state.require_hunt_store().await?;

    let previous = store.find_mystery().await?;
    let (revealed, revealed_at) = previous
        .as_ref()
        .map(|m| (m.revealed, m.revealed_at))
        .unwrap_or((false, None));

    let mystery = MysteryEntity {
        active: input.active,
        trigger_clue_id: input.trigger_clue_id,
        revealed,
        revealed_at,
        victim: input.victim.into(),
        suspects: input.suspects.into_iter().map(Into::into).collect(),
        evidence: input.evidence.into_iter().map(Into::into).collect(),
    };
    store.save_mystery(mystery.clone()).await?;

    sse_events::broadcast_mystery_changed(state, mystery.active, mystery.revealed);
    status(state).await
}

/// Reveal the culprit to every team.
pub async fn reveal(state: &SharedState) -> Result<MysteryStatus, ServiceError> {
    let store = state.require_hunt_store().await?;
    let mut mystery = store
        .find_mystery()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no mystery is configured".into()))?;

    if !mystery.revealed {
        mystery.revealed = true;
        mystery.revealed_at = Some(SystemTime::now());
        store.save_mystery(mystery.clone()).await?;
        sse_events::broadcast_mystery_changed(state, mystery.active, true);
    }

    status(state).await
}

/// Coordinator status board: configuration summary plus every accusation.
pub async fn status(state: &SharedState) -> Result<MysteryStatus, ServiceError> {
    let store = state.require_hunt_store().await?;
    let mystery = store.find_mystery().await?;

    let team_names: HashMap<Uuid, String> = store
        .list_teams()
        .await?
        .into_iter()
        .map(|team| (team.id, team.name))
        .collect();

    let accusations = store
        .list_accusations()
        .await?
        .into_iter()
        .map(|accusation| {
            let team_name = team_names
                .get(&accusation.team_id)
                .cloned()
                .unwrap_or_else(|| "unknown team".to_owned());
            AccusationRow::from_entity(accusation, team_name)
        })
        .collect();

    Ok(MysteryStatus::project(mystery.as_ref(), accusations))
}

/// The mystery as one team sees it right now.
pub async fn player_view(
    state: &SharedState,
    team: &TeamEntity,
) -> Result<MysteryView, ServiceError> {
    let store = state.require_hunt_store().await?;
    let mystery = store.find_mystery().await?;

    let Some(mystery) = mystery else {
        return Ok(MysteryView::locked(None));
    };
    if !progress::is_mystery_unlocked(team, &mystery) {
        return Ok(MysteryView::locked(Some(&mystery)));
    }

    let accusation = store
        .find_accusation_for_team(team.id)
        .await?
        .map(Into::into);

    let evidence = progress::unlocked_evidence(team, &mystery)
        .into_iter()
        .cloned()
        .map(Into::into)
        .collect();

    Ok(MysteryView {
        active: mystery.active,
        unlocked: true,
        revealed: mystery.revealed,
        victim: Some(mystery.victim.clone().into()),
        suspects: mystery
            .suspects
            .iter()
            .cloned()
            .map(|suspect| SuspectView::project(suspect, mystery.revealed))
            .collect(),
        evidence,
        evidence_total: mystery.evidence.len(),
        accusation,
    })
}

/// Record a team's single accusation and grade it immediately.
pub async fn accuse(
    state: &SharedState,
    team: &TeamEntity,
    request: AccusationRequest,
) -> Result<AccusationView, ServiceError> {
    let store = state.require_hunt_store().await?;
    let mystery = store
        .find_mystery()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no mystery is configured".into()))?;

    let existing = store.find_accusation_for_team(team.id).await?;
    if !progress::is_mystery_open(team, &mystery, existing.as_ref()) {
        return Err(ServiceError::InvalidState(
            "the mystery is not open for an accusation by this team".into(),
        ));
    }

    let suspect = mystery.suspect(request.suspect_id).ok_or_else(|| {
        ServiceError::NotFound(format!("suspect `{}` not found", request.suspect_id))
    })?;

    let reasoning = request
        .reasoning
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty());

    let accusation = AccusationEntity {
        id: Uuid::new_v4(),
        team_id: team.id,
        suspect_id: suspect.id,
        reasoning,
        correct: suspect.is_culprit,
        submitted_at: SystemTime::now(),
    };
    store.save_accusation(accusation.clone()).await?;

    if accusation.correct {
        if let Some(mut fresh) = store.find_team(team.id).await? {
            fresh.gate_flags.side_quest_solved = true;
            store.save_team(fresh).await?;
        }
    }

    sse_events::broadcast_accusation_recorded(
        state,
        accusation.team_id,
        accusation.suspect_id,
        accusation.correct,
    );
    Ok(accusation.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            hunt_store::{HuntStore, memory::MemoryHuntStore},
            models::{EvidenceEntity, SuspectEntity, VictimEntity},
        },
        dto::coordinator::{SuspectInput, VictimInput},
        state::{AppState, SharedState},
    };
    use std::sync::Arc;

    async fn test_state() -> (SharedState, Arc<dyn HuntStore>) {
        let state = AppState::new(AppConfig::default(), None);
        let store: Arc<dyn HuntStore> = Arc::new(MemoryHuntStore::new());
        state.install_hunt_store(store.clone()).await;
        (state, store)
    }

    fn victim() -> VictimEntity {
        VictimEntity {
            name: "Reginald".into(),
            photo_url: "https://example.com/reginald.jpg".into(),
            age: 61,
            occupation: "Archivist".into(),
            bio: "Kept the estate's secrets".into(),
            last_seen: "The library".into(),
        }
    }

    fn suspect(is_culprit: bool) -> SuspectEntity {
        SuspectEntity {
            id: Uuid::new_v4(),
            name: "Beatrice".into(),
            photo_url: "https://example.com/beatrice.jpg".into(),
            age: 44,
            occupation: "Gardener".into(),
            relationship: "Cousin".into(),
            alibi: "Pruning the roses".into(),
            motive: "The inheritance".into(),
            is_culprit,
        }
    }

    async fn seed_mystery(store: &Arc<dyn HuntStore>, active: bool, trigger: Option<Uuid>) -> MysteryEntity {
        let mystery = MysteryEntity {
            active,
            trigger_clue_id: trigger,
            revealed: false,
            revealed_at: None,
            victim: victim(),
            suspects: vec![suspect(true), suspect(false)],
            evidence: vec![EvidenceEntity {
                id: Uuid::new_v4(),
                title: "Torn letter".into(),
                description: "Half a signature".into(),
                image_url: None,
                found_at: "The study".into(),
                unlock_clue_id: Some(Uuid::new_v4()),
                related_suspect_id: None,
            }],
        };
        store.save_mystery(mystery.clone()).await.unwrap();
        mystery
    }

    async fn seed_team(store: &Arc<dyn HuntStore>) -> TeamEntity {
        let team = TeamEntity::new("The Owls".into(), "123456".into());
        store.save_team(team.clone()).await.unwrap();
        team
    }

    #[tokio::test]
    async fn locked_view_hides_everything() {
        let (state, store) = test_state().await;
        let trigger = Uuid::new_v4();
        seed_mystery(&store, true, Some(trigger)).await;
        let team = seed_team(&store).await;

        let view = player_view(&state, &team).await.unwrap();
        assert!(view.active);
        assert!(!view.unlocked);
        assert!(view.victim.is_none());
        assert!(view.suspects.is_empty());
    }

    #[tokio::test]
    async fn unlocked_view_filters_gated_evidence_and_hides_the_culprit() {
        let (state, store) = test_state().await;
        seed_mystery(&store, true, None).await;
        let team = seed_team(&store).await;

        let view = player_view(&state, &team).await.unwrap();
        assert!(view.unlocked);
        assert_eq!(view.suspects.len(), 2);
        assert!(view.suspects.iter().all(|s| s.is_culprit.is_none()));
        // The only evidence item is gated behind an uncompleted clue.
        assert!(view.evidence.is_empty());
        assert_eq!(view.evidence_total, 1);
    }

    #[tokio::test]
    async fn accusation_is_graded_and_single_shot() {
        let (state, store) = test_state().await;
        let mystery = seed_mystery(&store, true, None).await;
        let team = seed_team(&store).await;
        let culprit_id = mystery.suspects[0].id;

        let view = accuse(
            &state,
            &team,
            AccusationRequest {
                suspect_id: culprit_id,
                reasoning: Some("The rose shears match the marks".into()),
            },
        )
        .await
        .unwrap();
        assert!(view.correct);

        let fresh = store.find_team(team.id).await.unwrap().unwrap();
        assert!(fresh.gate_flags.side_quest_solved);

        let err = accuse(
            &state,
            &team,
            AccusationRequest {
                suspect_id: culprit_id,
                reasoning: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn wrong_accusation_does_not_solve_the_side_quest() {
        let (state, store) = test_state().await;
        let mystery = seed_mystery(&store, true, None).await;
        let team = seed_team(&store).await;
        let innocent_id = mystery.suspects[1].id;

        let view = accuse(
            &state,
            &team,
            AccusationRequest {
                suspect_id: innocent_id,
                reasoning: None,
            },
        )
        .await
        .unwrap();
        assert!(!view.correct);

        let fresh = store.find_team(team.id).await.unwrap().unwrap();
        assert!(!fresh.gate_flags.side_quest_solved);
    }

    #[tokio::test]
    async fn reveal_exposes_the_culprit_flag_to_players() {
        let (state, store) = test_state().await;
        seed_mystery(&store, true, None).await;
        let team = seed_team(&store).await;

        reveal(&state).await.unwrap();

        let view = player_view(&state, &team).await.unwrap();
        assert!(view.revealed);
        assert_eq!(
            view.suspects
                .iter()
                .filter(|s| s.is_culprit == Some(true))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn configure_preserves_an_earlier_reveal() {
        let (state, store) = test_state().await;
        seed_mystery(&store, true, None).await;
        reveal(&state).await.unwrap();

        let status = configure(
            &state,
            MysteryInput {
                active: true,
                trigger_clue_id: None,
                victim: VictimInput {
                    name: "Reginald".into(),
                    photo_url: "https://example.com/reginald.jpg".into(),
                    age: 61,
                    occupation: "Archivist".into(),
                    bio: "Updated bio".into(),
                    last_seen: "The library".into(),
                },
                suspects: vec![SuspectInput {
                    id: None,
                    name: "Beatrice".into(),
                    photo_url: "https://example.com/beatrice.jpg".into(),
                    age: 44,
                    occupation: "Gardener".into(),
                    relationship: "Cousin".into(),
                    alibi: "Pruning the roses".into(),
                    motive: "The inheritance".into(),
                    is_culprit: true,
                }],
                evidence: Vec::new(),
            },
        )
        .await
        .unwrap();

        assert!(status.revealed);
        let stored = store.find_mystery().await.unwrap().unwrap();
        assert!(stored.revealed_at.is_some());
    }
}
