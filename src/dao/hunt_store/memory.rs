//! In-memory [`HuntStore`] backend.
//!
//! Used for local development without a database and as the storage double in
//! service-layer tests. Every operation is infallible; the trait's
//! `StorageResult` shape is kept so call sites are identical across backends.

use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    hunt_store::{HuntStore, SubmissionFilter},
    models::{
        AccusationEntity, AnnouncementEntity, ClueEntity, FinaleConfigEntity, MysteryEntity,
        NotificationEntity, SubmissionEntity, TeamEntity,
    },
    storage::StorageResult,
};

/// Process-local hunt store keeping every collection in a [`DashMap`].
#[derive(Clone, Default)]
pub struct MemoryHuntStore {
    inner: Arc<Collections>,
}

#[derive(Default)]
struct Collections {
    teams: DashMap<Uuid, TeamEntity>,
    clues: DashMap<Uuid, ClueEntity>,
    submissions: DashMap<Uuid, SubmissionEntity>,
    notifications: DashMap<Uuid, NotificationEntity>,
    announcements: DashMap<Uuid, AnnouncementEntity>,
    accusations: DashMap<Uuid, AccusationEntity>,
    mystery: RwLock<Option<MysteryEntity>>,
    finale: RwLock<Option<FinaleConfigEntity>>,
}

impl MemoryHuntStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HuntStore for MemoryHuntStore {
    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.teams.insert(team.id, team);
            Ok(())
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.teams.get(&id).map(|entry| entry.value().clone())) })
    }

    fn find_team_by_join_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .teams
                .iter()
                .find(|entry| entry.join_code == join_code)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut teams: Vec<TeamEntity> =
                inner.teams.iter().map(|entry| entry.value().clone()).collect();
            teams.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(teams)
        })
    }

    fn delete_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.teams.remove(&id).is_some()) })
    }

    fn save_clue(&self, clue: ClueEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.clues.insert(clue.id, clue);
            Ok(())
        })
    }

    fn find_clue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ClueEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.clues.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_clues(&self) -> BoxFuture<'static, StorageResult<Vec<ClueEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut clues: Vec<ClueEntity> =
                inner.clues.iter().map(|entry| entry.value().clone()).collect();
            clues.sort_by_key(|clue| clue.order_index);
            Ok(clues)
        })
    }

    fn delete_clue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.clues.remove(&id).is_some()) })
    }

    fn save_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.submissions.insert(submission.id, submission);
            Ok(())
        })
    }

    fn find_submission(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.submissions.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut submissions: Vec<SubmissionEntity> = inner
                .submissions
                .iter()
                .filter(|entry| filter.matches(entry))
                .map(|entry| entry.value().clone())
                .collect();
            submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
            Ok(submissions)
        })
    }

    fn delete_submission(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.submissions.remove(&id).is_some()) })
    }

    fn list_stalled_uploads(
        &self,
        cutoff: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .submissions
                .iter()
                .filter(|entry| entry.uploading && entry.submitted_at < cutoff)
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn save_notification(
        &self,
        notification: NotificationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.notifications.insert(notification.id, notification);
            Ok(())
        })
    }

    fn find_notification(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<NotificationEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.notifications.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_notifications(
        &self,
        team_id: Uuid,
        unread_only: bool,
    ) -> BoxFuture<'static, StorageResult<Vec<NotificationEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut notifications: Vec<NotificationEntity> = inner
                .notifications
                .iter()
                .filter(|entry| entry.team_id == team_id && (!unread_only || !entry.read))
                .map(|entry| entry.value().clone())
                .collect();
            notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(notifications)
        })
    }

    fn delete_notification(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.notifications.remove(&id).is_some()) })
    }

    fn save_announcement(
        &self,
        announcement: AnnouncementEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.announcements.insert(announcement.id, announcement);
            Ok(())
        })
    }

    fn find_announcement(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnnouncementEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.announcements.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_announcements(&self) -> BoxFuture<'static, StorageResult<Vec<AnnouncementEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut announcements: Vec<AnnouncementEntity> =
                inner.announcements.iter().map(|entry| entry.value().clone()).collect();
            announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(announcements)
        })
    }

    fn save_mystery(&self, mystery: MysteryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            *inner.mystery.write().await = Some(mystery);
            Ok(())
        })
    }

    fn find_mystery(&self) -> BoxFuture<'static, StorageResult<Option<MysteryEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.mystery.read().await.clone()) })
    }

    fn save_accusation(
        &self,
        accusation: AccusationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.accusations.insert(accusation.id, accusation);
            Ok(())
        })
    }

    fn find_accusation_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AccusationEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .accusations
                .iter()
                .find(|entry| entry.team_id == team_id)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_accusations(&self) -> BoxFuture<'static, StorageResult<Vec<AccusationEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut accusations: Vec<AccusationEntity> =
                inner.accusations.iter().map(|entry| entry.value().clone()).collect();
            accusations.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
            Ok(accusations)
        })
    }

    fn save_finale_config(
        &self,
        config: FinaleConfigEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            *inner.finale.write().await = Some(config);
            Ok(())
        })
    }

    fn find_finale_config(&self) -> BoxFuture<'static, StorageResult<Option<FinaleConfigEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.finale.read().await.clone()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::AnswerKind;
    use std::time::Duration;

    fn clue(order_index: u32) -> ClueEntity {
        ClueEntity {
            id: Uuid::new_v4(),
            order_index,
            title: format!("Clue {order_index}"),
            body: "Look under the bridge".into(),
            answer_kind: AnswerKind::Text,
            expected_answer: "lantern".into(),
            image_url: None,
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn clues_are_listed_in_sequence_order() {
        let store = MemoryHuntStore::new();
        store.save_clue(clue(7)).await.unwrap();
        store.save_clue(clue(0)).await.unwrap();
        store.save_clue(clue(3)).await.unwrap();

        let clues = store.list_clues().await.unwrap();
        let order: Vec<u32> = clues.iter().map(|c| c.order_index).collect();
        assert_eq!(order, vec![0, 3, 7]);
    }

    #[tokio::test]
    async fn submission_filter_restricts_pair_and_status() {
        let store = MemoryHuntStore::new();
        let team = Uuid::new_v4();
        let clue_id = Uuid::new_v4();

        let mut rejected =
            SubmissionEntity::answered(team, clue_id, AnswerKind::Text, "wrong".into());
        rejected.status = crate::dao::models::SubmissionStatus::Rejected;
        store.save_submission(rejected).await.unwrap();

        let pending = SubmissionEntity::answered(team, clue_id, AnswerKind::Text, "right".into());
        store.save_submission(pending.clone()).await.unwrap();

        let other_clue =
            SubmissionEntity::answered(team, Uuid::new_v4(), AnswerKind::Text, "elsewhere".into());
        store.save_submission(other_clue).await.unwrap();

        let active = store
            .list_submissions(SubmissionFilter::active_pair(team, clue_id))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, pending.id);
    }

    #[tokio::test]
    async fn stalled_uploads_respect_cutoff_and_flag() {
        let store = MemoryHuntStore::new();
        let team = Uuid::new_v4();

        let mut old = SubmissionEntity::photo_placeholder(team, Uuid::new_v4());
        old.submitted_at = SystemTime::now() - Duration::from_secs(600);
        store.save_submission(old.clone()).await.unwrap();

        let fresh = SubmissionEntity::photo_placeholder(team, Uuid::new_v4());
        store.save_submission(fresh).await.unwrap();

        let mut settled = SubmissionEntity::photo_placeholder(team, Uuid::new_v4());
        settled.uploading = false;
        settled.submitted_at = SystemTime::now() - Duration::from_secs(600);
        store.save_submission(settled).await.unwrap();

        let cutoff = SystemTime::now() - Duration::from_secs(120);
        let stalled = store.list_stalled_uploads(cutoff).await.unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].id, old.id);
    }

    #[tokio::test]
    async fn join_code_lookup_finds_the_right_team() {
        let store = MemoryHuntStore::new();
        let team = TeamEntity::new("The Owls".into(), "314159".into());
        store.save_team(team.clone()).await.unwrap();
        store
            .save_team(TeamEntity::new("The Foxes".into(), "271828".into()))
            .await
            .unwrap();

        let found = store
            .find_team_by_join_code("314159".into())
            .await
            .unwrap()
            .expect("team should resolve");
        assert_eq!(found.id, team.id);

        assert!(
            store
                .find_team_by_join_code("999999".into())
                .await
                .unwrap()
                .is_none()
        );
    }
}
