pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    AccusationEntity, AnnouncementEntity, ClueEntity, FinaleConfigEntity, MysteryEntity,
    NotificationEntity, SubmissionEntity, SubmissionStatus, TeamEntity,
};
use crate::dao::storage::StorageResult;

/// Filter applied when listing submissions.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    /// Restrict to a single team.
    pub team_id: Option<Uuid>,
    /// Restrict to a single clue.
    pub clue_id: Option<Uuid>,
    /// Restrict to the given lifecycle states.
    pub statuses: Option<Vec<SubmissionStatus>>,
}

impl SubmissionFilter {
    /// Filter for the duplicate guard: live submissions of one team/clue pair.
    pub fn active_pair(team_id: Uuid, clue_id: Uuid) -> Self {
        Self {
            team_id: Some(team_id),
            clue_id: Some(clue_id),
            statuses: Some(vec![SubmissionStatus::Pending, SubmissionStatus::Approved]),
        }
    }

    /// Whether a submission passes this filter.
    pub fn matches(&self, submission: &SubmissionEntity) -> bool {
        if let Some(team_id) = self.team_id {
            if submission.team_id != team_id {
                return false;
            }
        }
        if let Some(clue_id) = self.clue_id {
            if submission.clue_id != clue_id {
                return false;
            }
        }
        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&submission.status) {
                return false;
            }
        }
        true
    }
}

/// Abstraction over the persistence layer for all hunt collections.
///
/// Saves are upserts: writing an entity with an existing id replaces the
/// stored document, which is how the submission pipeline patches its
/// placeholder documents. No method assumes cross-collection atomicity.
pub trait HuntStore: Send + Sync {
    // --- teams ---------------------------------------------------------

    /// Insert or replace a team document.
    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a team by id.
    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Resolve a team from its join code.
    fn find_team_by_join_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// List all teams, newest first.
    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Delete a team document. Returns whether it existed.
    fn delete_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    // --- clues ---------------------------------------------------------

    /// Insert or replace a clue document.
    fn save_clue(&self, clue: ClueEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a clue by id.
    fn find_clue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ClueEntity>>>;
    /// List all clues ordered by ascending `order_index`.
    fn list_clues(&self) -> BoxFuture<'static, StorageResult<Vec<ClueEntity>>>;
    /// Delete a clue document. Returns whether it existed.
    fn delete_clue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    // --- submissions ---------------------------------------------------

    /// Insert or replace a submission document.
    fn save_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a submission by id.
    fn find_submission(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>>;
    /// List submissions matching a filter, newest first.
    fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>>;
    /// Delete a submission document. Returns whether it existed.
    fn delete_submission(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// List submissions still flagged `uploading` that were created before the
    /// cutoff. Feeds the stalled-upload reconciliation sweep.
    fn list_stalled_uploads(
        &self,
        cutoff: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>>;

    // --- notifications -------------------------------------------------

    /// Insert or replace a notification document.
    fn save_notification(
        &self,
        notification: NotificationEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a notification by id.
    fn find_notification(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<NotificationEntity>>>;
    /// List a team's notifications, newest first, optionally unread only.
    fn list_notifications(
        &self,
        team_id: Uuid,
        unread_only: bool,
    ) -> BoxFuture<'static, StorageResult<Vec<NotificationEntity>>>;
    /// Delete a notification document. Returns whether it existed.
    fn delete_notification(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    // --- announcements -------------------------------------------------

    /// Insert or replace an announcement document.
    fn save_announcement(
        &self,
        announcement: AnnouncementEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Load an announcement by id.
    fn find_announcement(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnnouncementEntity>>>;
    /// List all announcements, newest first.
    fn list_announcements(&self) -> BoxFuture<'static, StorageResult<Vec<AnnouncementEntity>>>;

    // --- mystery & accusations ----------------------------------------

    /// Replace the singleton mystery document.
    fn save_mystery(&self, mystery: MysteryEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load the singleton mystery document.
    fn find_mystery(&self) -> BoxFuture<'static, StorageResult<Option<MysteryEntity>>>;
    /// Insert or replace an accusation document.
    fn save_accusation(
        &self,
        accusation: AccusationEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Load the accusation recorded by a team, if any.
    fn find_accusation_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AccusationEntity>>>;
    /// List all accusations, newest first.
    fn list_accusations(&self) -> BoxFuture<'static, StorageResult<Vec<AccusationEntity>>>;

    // --- finale --------------------------------------------------------

    /// Replace the singleton finale config document.
    fn save_finale_config(
        &self,
        config: FinaleConfigEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Load the singleton finale config document.
    fn find_finale_config(&self) -> BoxFuture<'static, StorageResult<Option<FinaleConfigEntity>>>;

    // --- health --------------------------------------------------------

    /// Cheap liveness probe against the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a lost connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
