//! Broadcast announcements: coordinator-authored messages visible to all
//! teams, plus the listing shared with player clients.

use uuid::Uuid;

use crate::{
    dao::models::AnnouncementEntity,
    dto::{common::AnnouncementView, coordinator::AnnouncementInput},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Create and broadcast a new announcement.
pub async fn broadcast(
    state: &SharedState,
    input: AnnouncementInput,
) -> Result<AnnouncementView, ServiceError> {
    let store = state.require_hunt_store().await?;

    let title = input.title.filter(|t| !t.trim().is_empty());
    let announcement = AnnouncementEntity::new(title, input.message.trim().to_owned(), input.priority);
    store.save_announcement(announcement.clone()).await?;

    sse_events::broadcast_announcement_created(state, &announcement);
    Ok(announcement.into())
}

/// Edit an existing announcement in place, stamping the edit time.
pub async fn edit(
    state: &SharedState,
    announcement_id: Uuid,
    input: AnnouncementInput,
) -> Result<AnnouncementView, ServiceError> {
    let store = state.require_hunt_store().await?;

    let mut announcement = store.find_announcement(announcement_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("announcement `{announcement_id}` not found"))
    })?;

    announcement.title = input.title.filter(|t| !t.trim().is_empty());
    announcement.message = input.message.trim().to_owned();
    announcement.priority = input.priority;
    announcement.edited_at = Some(std::time::SystemTime::now());
    store.save_announcement(announcement.clone()).await?;

    sse_events::broadcast_announcement_updated(state, &announcement);
    Ok(announcement.into())
}

/// All announcements, newest first.
pub async fn list(state: &SharedState) -> Result<Vec<AnnouncementView>, ServiceError> {
    let store = state.require_hunt_store().await?;
    let announcements = store.list_announcements().await?;
    Ok(announcements.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            hunt_store::{HuntStore, memory::MemoryHuntStore},
            models::AnnouncementPriority,
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

    #[tokio::test]
    async fn broadcast_trims_and_stores_the_message() {
        let (state, _store) = test_state().await;

        let view = broadcast(
            &state,
            AnnouncementInput {
                title: Some("  ".into()),
                message: "  Lunch at the pavilion  ".into(),
                priority: AnnouncementPriority::Normal,
            },
        )
        .await
        .unwrap();

        assert_eq!(view.message, "Lunch at the pavilion");
        assert!(view.title.is_none());
        assert!(view.edited_at.is_none());
    }

    #[tokio::test]
    async fn edit_stamps_the_edit_time() {
        let (state, _store) = test_state().await;

        let created = broadcast(
            &state,
            AnnouncementInput {
                title: None,
                message: "Lunch at noon".into(),
                priority: AnnouncementPriority::Normal,
            },
        )
        .await
        .unwrap();

        let edited = edit(
            &state,
            created.id,
            AnnouncementInput {
                title: Some("Update".into()),
                message: "Lunch moved to one".into(),
                priority: AnnouncementPriority::High,
            },
        )
        .await
        .unwrap();

        assert_eq!(edited.message, "Lunch moved to one");
        assert_eq!(edited.title.as_deref(), Some("Update"));
        assert!(edited.edited_at.is_some());
    }

    #[tokio::test]
    async fn editing_a_missing_announcement_fails() {
        let (state, _store) = test_state().await;
        let err = edit(
            &state,
            Uuid::new_v4(),
            AnnouncementInput {
                title: None,
                message: "hello".into(),
                priority: AnnouncementPriority::Normal,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
