use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, Document, doc},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, Result},
    models::{
        AccusationDocument, AnnouncementDocument, ClueDocument, FinaleConfigDocument,
        MysteryDocument, NotificationDocument, SubmissionDocument, TeamDocument, doc_id,
        singleton_doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    hunt_store::{HuntStore, SubmissionFilter},
    models::{
        AccusationEntity, AnnouncementEntity, ClueEntity, FinaleConfigEntity, MysteryEntity,
        NotificationEntity, SubmissionEntity, TeamEntity,
    },
    storage::StorageResult,
};

const TEAMS: &str = "teams";
const CLUES: &str = "clues";
const SUBMISSIONS: &str = "submissions";
const NOTIFICATIONS: &str = "notifications";
const ANNOUNCEMENTS: &str = "announcements";
const ACCUSATIONS: &str = "accusations";
const MYSTERY: &str = "mystery";
const FINALE_CONFIG: &str = "finale_config";

/// MongoDB-backed [`HuntStore`].
#[derive(Clone)]
pub struct MongoHuntStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> Result<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoHuntStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> Result<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let database = self.database().await;

        let teams = database.collection::<TeamDocument>(TEAMS);
        let join_code_index = mongodb::IndexModel::builder()
            .keys(doc! {"join_code": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("team_join_code_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        teams
            .create_index(join_code_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TEAMS,
                index: "join_code",
                source,
            })?;

        let clues = database.collection::<ClueDocument>(CLUES);
        let order_index = mongodb::IndexModel::builder()
            .keys(doc! {"order_index": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("clue_order_idx".to_owned()))
                    .build(),
            )
            .build();
        clues
            .create_index(order_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: CLUES,
                index: "order_index",
                source,
            })?;

        // The duplicate guard queries submissions by (team_id, clue_id).
        let submissions = database.collection::<SubmissionDocument>(SUBMISSIONS);
        let pair_index = mongodb::IndexModel::builder()
            .keys(doc! {"team_id": 1, "clue_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("submission_pair_idx".to_owned()))
                    .build(),
            )
            .build();
        submissions
            .create_index(pair_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SUBMISSIONS,
                index: "team_id,clue_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn save_doc<T>(&self, name: &'static str, filter: Document, document: &T) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let collection = self.collection::<T>(name).await;
        collection
            .replace_one(filter, document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveDocument {
                collection: name,
                source,
            })?;
        Ok(())
    }

    async fn load_doc<T>(&self, name: &'static str, filter: Document) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let collection = self.collection::<T>(name).await;
        collection
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadDocument {
                collection: name,
                source,
            })
    }

    async fn delete_doc(&self, name: &'static str, filter: Document) -> Result<bool> {
        let collection = self.collection::<Document>(name).await;
        let result = collection
            .delete_one(filter)
            .await
            .map_err(|source| MongoDaoError::DeleteDocument {
                collection: name,
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_docs<T>(
        &self,
        name: &'static str,
        filter: Document,
        sort: Document,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let collection = self.collection::<T>(name).await;
        collection
            .find(filter)
            .sort(sort)
            .await
            .map_err(|source| MongoDaoError::ListDocuments {
                collection: name,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListDocuments {
                collection: name,
                source,
            })
    }
}

fn submission_filter_doc(filter: &SubmissionFilter) -> Document {
    let mut document = Document::new();
    if let Some(team_id) = filter.team_id {
        document.insert("team_id", uuid_as_binary(team_id));
    }
    if let Some(clue_id) = filter.clue_id {
        document.insert("clue_id", uuid_as_binary(clue_id));
    }
    if let Some(ref statuses) = filter.statuses {
        let names: Vec<&str> = statuses.iter().map(|status| status.as_str()).collect();
        document.insert("status", doc! {"$in": names});
    }
    document
}

impl HuntStore for MongoHuntStore {
    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = team.id;
        Box::pin(async move {
            let document: TeamDocument = team.into();
            store
                .save_doc(TEAMS, doc_id(id), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.load_doc::<TeamDocument>(TEAMS, doc_id(id)).await?;
            Ok(document.map(Into::into))
        })
    }

    fn find_team_by_join_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .load_doc::<TeamDocument>(TEAMS, doc! {"join_code": join_code})
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_docs::<TeamDocument>(TEAMS, doc! {}, doc! {"created_at": -1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn delete_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_doc(TEAMS, doc_id(id)).await.map_err(Into::into) })
    }

    fn save_clue(&self, clue: ClueEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = clue.id;
        Box::pin(async move {
            let document: ClueDocument = clue.into();
            store
                .save_doc(CLUES, doc_id(id), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_clue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ClueEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.load_doc::<ClueDocument>(CLUES, doc_id(id)).await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_clues(&self) -> BoxFuture<'static, StorageResult<Vec<ClueEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_docs::<ClueDocument>(CLUES, doc! {}, doc! {"order_index": 1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn delete_clue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_doc(CLUES, doc_id(id)).await.map_err(Into::into) })
    }

    fn save_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = submission.id;
        Box::pin(async move {
            let document: SubmissionDocument = submission.into();
            store
                .save_doc(SUBMISSIONS, doc_id(id), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_submission(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .load_doc::<SubmissionDocument>(SUBMISSIONS, doc_id(id))
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_docs::<SubmissionDocument>(
                    SUBMISSIONS,
                    submission_filter_doc(&filter),
                    doc! {"submitted_at": -1},
                )
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn delete_submission(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_doc(SUBMISSIONS, doc_id(id))
                .await
                .map_err(Into::into)
        })
    }

    fn list_stalled_uploads(
        &self,
        cutoff: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let filter = doc! {
                "uploading": true,
                "submitted_at": {"$lt": DateTime::from_system_time(cutoff)},
            };
            let documents = store
                .list_docs::<SubmissionDocument>(SUBMISSIONS, filter, doc! {"submitted_at": 1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn save_notification(
        &self,
        notification: NotificationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = notification.id;
        Box::pin(async move {
            let document: NotificationDocument = notification.into();
            store
                .save_doc(NOTIFICATIONS, doc_id(id), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_notification(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<NotificationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .load_doc::<NotificationDocument>(NOTIFICATIONS, doc_id(id))
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_notifications(
        &self,
        team_id: Uuid,
        unread_only: bool,
    ) -> BoxFuture<'static, StorageResult<Vec<NotificationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut filter = doc! {"team_id": uuid_as_binary(team_id)};
            if unread_only {
                filter.insert("read", false);
            }
            let documents = store
                .list_docs::<NotificationDocument>(NOTIFICATIONS, filter, doc! {"created_at": -1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn delete_notification(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_doc(NOTIFICATIONS, doc_id(id))
                .await
                .map_err(Into::into)
        })
    }

    fn save_announcement(
        &self,
        announcement: AnnouncementEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = announcement.id;
        Box::pin(async move {
            let document: AnnouncementDocument = announcement.into();
            store
                .save_doc(ANNOUNCEMENTS, doc_id(id), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_announcement(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnnouncementEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .load_doc::<AnnouncementDocument>(ANNOUNCEMENTS, doc_id(id))
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_announcements(&self) -> BoxFuture<'static, StorageResult<Vec<AnnouncementEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_docs::<AnnouncementDocument>(ANNOUNCEMENTS, doc! {}, doc! {"created_at": -1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn save_mystery(&self, mystery: MysteryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document: MysteryDocument = mystery.into();
            store
                .save_doc(MYSTERY, singleton_doc_id(), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_mystery(&self) -> BoxFuture<'static, StorageResult<Option<MysteryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .load_doc::<MysteryDocument>(MYSTERY, singleton_doc_id())
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn save_accusation(
        &self,
        accusation: AccusationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = accusation.id;
        Box::pin(async move {
            let document: AccusationDocument = accusation.into();
            store
                .save_doc(ACCUSATIONS, doc_id(id), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_accusation_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AccusationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .load_doc::<AccusationDocument>(
                    ACCUSATIONS,
                    doc! {"team_id": uuid_as_binary(team_id)},
                )
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_accusations(&self) -> BoxFuture<'static, StorageResult<Vec<AccusationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_docs::<AccusationDocument>(ACCUSATIONS, doc! {}, doc! {"submitted_at": -1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn save_finale_config(
        &self,
        config: FinaleConfigEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document: FinaleConfigDocument = config.into();
            store
                .save_doc(FINALE_CONFIG, singleton_doc_id(), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_finale_config(&self) -> BoxFuture<'static, StorageResult<Option<FinaleConfigEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .load_doc::<FinaleConfigDocument>(FINALE_CONFIG, singleton_doc_id())
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
