//! One-shot per-team notifications: listed unread, marked read after display,
//! never surfaced again.

use uuid::Uuid;

use crate::{
    dao::models::TeamEntity,
    dto::common::NotificationView,
    error::ServiceError,
    state::SharedState,
};

/// A team's unread notifications, newest first.
pub async fn list_unread(
    state: &SharedState,
    team: &TeamEntity,
) -> Result<Vec<NotificationView>, ServiceError> {
    let store = state.require_hunt_store().await?;
    let notifications = store.list_notifications(team.id, true).await?;
    Ok(notifications.into_iter().map(Into::into).collect())
}

/// Consume a notification after the client has displayed it.
pub async fn mark_read(
    state: &SharedState,
    team: &TeamEntity,
    notification_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.require_hunt_store().await?;

    let mut notification = store.find_notification(notification_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("notification `{notification_id}` not found"))
    })?;

    if notification.team_id != team.id {
        return Err(ServiceError::Unauthorized(
            "notification belongs to another team".into(),
        ));
    }

    if !notification.read {
        notification.read = true;
        store.save_notification(notification).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            hunt_store::{HuntStore, memory::MemoryHuntStore},
            models::NotificationEntity,
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
    async fn read_notifications_are_never_surfaced_again() {
        let (state, store) = test_state().await;
        let team = TeamEntity::new("The Owls".into(), "123456".into());
        store.save_team(team.clone()).await.unwrap();

        let notification = NotificationEntity::new(team.id, "try again".into());
        store.save_notification(notification.clone()).await.unwrap();

        assert_eq!(list_unread(&state, &team).await.unwrap().len(), 1);

        mark_read(&state, &team, notification.id).await.unwrap();
        assert!(list_unread(&state, &team).await.unwrap().is_empty());

        // Marking again is a harmless no-op.
        mark_read(&state, &team, notification.id).await.unwrap();
    }

    #[tokio::test]
    async fn a_team_cannot_consume_another_teams_notification() {
        let (state, store) = test_state().await;
        let owner = TeamEntity::new("The Owls".into(), "111111".into());
        let other = TeamEntity::new("The Foxes".into(), "222222".into());
        store.save_team(owner.clone()).await.unwrap();
        store.save_team(other.clone()).await.unwrap();

        let notification = NotificationEntity::new(owner.id, "for owls only".into());
        store.save_notification(notification.clone()).await.unwrap();

        let err = mark_read(&state, &other, notification.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
