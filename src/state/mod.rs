pub mod lifecycle;
mod sse;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::hunt_store::HuntStore,
    error::ServiceError,
    media::MediaStore,
};

pub use self::sse::SseHub;
use self::sse::SseState;

/// Shared handle to the central application state.
pub type SharedState = Arc<AppState>;

const PUBLIC_SSE_CAPACITY: usize = 16;
const COORDINATOR_SSE_CAPACITY: usize = 16;
const TEAM_SSE_CAPACITY: usize = 8;

/// Central application state storing the storage slot, SSE hubs, and config.
pub struct AppState {
    hunt_store: RwLock<Option<Arc<dyn HuntStore>>>,
    media_store: Option<Arc<dyn MediaStore>>,
    sse: SseState,
    degraded: watch::Sender<bool>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, media_store: Option<Arc<dyn MediaStore>>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            hunt_store: RwLock::new(None),
            media_store,
            sse: SseState::new(
                PUBLIC_SSE_CAPACITY,
                COORDINATOR_SSE_CAPACITY,
                TEAM_SSE_CAPACITY,
            ),
            degraded: degraded_tx,
            config,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current hunt store, if one is installed.
    pub async fn hunt_store(&self) -> Option<Arc<dyn HuntStore>> {
        let guard = self.hunt_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the hunt store or fail with a degraded-mode error.
    pub async fn require_hunt_store(&self) -> Result<Arc<dyn HuntStore>, ServiceError> {
        self.hunt_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new hunt store implementation and leave degraded mode.
    pub async fn install_hunt_store(&self, store: Arc<dyn HuntStore>) {
        {
            let mut guard = self.hunt_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current hunt store and enter degraded mode.
    pub async fn clear_hunt_store(&self) {
        {
            let mut guard = self.hunt_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Broadcast the degraded flag to watchers.
    pub fn update_degraded(&self, value: bool) {
        let _ = self.degraded.send(value);
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Media upload adapter, absent when the service is not configured.
    pub fn media_store(&self) -> Option<Arc<dyn MediaStore>> {
        self.media_store.clone()
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the coordinator SSE stream.
    pub fn coordinator_sse(&self) -> &SseHub {
        self.sse.coordinator().hub()
    }

    /// Token guard that ensures a single coordinator SSE subscriber at a time.
    pub fn coordinator_token(&self) -> &Mutex<Option<String>> {
        self.sse.coordinator().token()
    }

    /// Broadcast hub carrying events addressed to a single team.
    pub fn team_sse(&self, team_id: Uuid) -> SseHub {
        self.sse.team(team_id)
    }

    /// Release the per-team hub when a team is deleted.
    pub fn forget_team_sse(&self, team_id: Uuid) {
        self.sse.forget_team(team_id);
    }
}
