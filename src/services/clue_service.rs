//! Coordinator-side management of the clue sequence.

use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::models::{AnswerKind, ClueEntity},
    dto::coordinator::{ClueDetail, ClueInput},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Create a new clue at the requested position in the sequence.
pub async fn create(state: &SharedState, input: ClueInput) -> Result<ClueDetail, ServiceError> {
    let store = state.require_hunt_store().await?;

    ensure_free_order_index(state, input.order_index, None).await?;

    let clue = ClueEntity {
        id: Uuid::new_v4(),
        order_index: input.order_index,
        title: input.title,
        body: input.body,
        answer_kind: input.answer_kind,
        expected_answer: expected_answer_for(input.answer_kind, input.expected_answer),
        image_url: input.image_url,
        created_at: SystemTime::now(),
    };
    store.save_clue(clue.clone()).await?;

    sse_events::broadcast_clue_changed(state, clue.id);
    Ok(clue.into())
}

/// Edit a clue in place; the id and creation time are preserved so existing
/// submissions keep referencing it.
pub async fn update(
    state: &SharedState,
    clue_id: Uuid,
    input: ClueInput,
) -> Result<ClueDetail, ServiceError> {
    let store = state.require_hunt_store().await?;

    let existing = store
        .find_clue(clue_id)
        .await?
        .ok_or_else(|| not_found(clue_id))?;

    ensure_free_order_index(state, input.order_index, Some(clue_id)).await?;

    let clue = ClueEntity {
        id: existing.id,
        order_index: input.order_index,
        title: input.title,
        body: input.body,
        answer_kind: input.answer_kind,
        expected_answer: expected_answer_for(input.answer_kind, input.expected_answer),
        image_url: input.image_url,
        created_at: existing.created_at,
    };
    store.save_clue(clue.clone()).await?;

    sse_events::broadcast_clue_changed(state, clue.id);
    Ok(clue.into())
}

/// Remove a clue from the sequence.
///
/// Teams keep any completed reference to it; the progress evaluator treats a
/// completed set larger than the live sequence as fully complete.
pub async fn remove(state: &SharedState, clue_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_hunt_store().await?;
    let deleted = store.delete_clue(clue_id).await?;
    if !deleted {
        return Err(not_found(clue_id));
    }

    sse_events::broadcast_clue_changed(state, clue_id);
    Ok(())
}

/// The full sequence with expected answers, for staff screens.
pub async fn list_detailed(state: &SharedState) -> Result<Vec<ClueDetail>, ServiceError> {
    let store = state.require_hunt_store().await?;
    let clues = store.list_clues().await?;
    Ok(clues.into_iter().map(Into::into).collect())
}

/// Photo clues have nothing to compare against; everything else keeps its
/// trimmed expected answer.
fn expected_answer_for(answer_kind: AnswerKind, expected_answer: String) -> String {
    match answer_kind {
        AnswerKind::Photo => String::new(),
        _ => expected_answer.trim().to_owned(),
    }
}

async fn ensure_free_order_index(
    state: &SharedState,
    order_index: u32,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let store = state.require_hunt_store().await?;
    let clues = store.list_clues().await?;
    if clues
        .iter()
        .any(|clue| clue.order_index == order_index && Some(clue.id) != exclude)
    {
        return Err(ServiceError::InvalidInput(format!(
            "another clue already uses position {order_index}"
        )));
    }
    Ok(())
}

fn not_found(clue_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("clue `{clue_id}` not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::hunt_store::{HuntStore, memory::MemoryHuntStore},
        state::{AppState, SharedState},
    };
    use std::sync::Arc;

    async fn test_state() -> (SharedState, Arc<dyn HuntStore>) {
        let state = AppState::new(AppConfig::default(), None);
        let store: Arc<dyn HuntStore> = Arc::new(MemoryHuntStore::new());
        state.install_hunt_store(store.clone()).await;
        (state, store)
    }

    fn input(order_index: u32, answer_kind: AnswerKind) -> ClueInput {
        ClueInput {
            order_index,
            title: "The fountain".into(),
            body: "Count the fish".into(),
            answer_kind,
            expected_answer: " seven ".into(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn create_trims_the_expected_answer() {
        let (state, _store) = test_state().await;
        let detail = create(&state, input(0, AnswerKind::Text)).await.unwrap();
        assert_eq!(detail.expected_answer, "seven");
    }

    #[tokio::test]
    async fn photo_clues_store_no_expected_answer() {
        let (state, _store) = test_state().await;
        let detail = create(&state, input(0, AnswerKind::Photo)).await.unwrap();
        assert_eq!(detail.expected_answer, "");
    }

    #[tokio::test]
    async fn duplicate_order_index_is_rejected() {
        let (state, _store) = test_state().await;
        create(&state, input(3, AnswerKind::Text)).await.unwrap();

        let err = create(&state, input(3, AnswerKind::Text)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_keeps_id_and_creation_time() {
        let (state, store) = test_state().await;
        let created = create(&state, input(0, AnswerKind::Text)).await.unwrap();

        let mut edit = input(0, AnswerKind::Text);
        edit.title = "The fountain, revisited".into();
        let updated = update(&state, created.id, edit).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "The fountain, revisited");
        let stored = store.find_clue(created.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "The fountain, revisited");
    }

    #[tokio::test]
    async fn remove_unknown_clue_is_not_found() {
        let (state, _store) = test_state().await;
        let err = remove(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
