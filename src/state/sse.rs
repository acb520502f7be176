use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// SSE-specific sub-state carved out from [`AppState`](super::AppState).
pub struct SseState {
    public: SseHub,
    coordinator: CoordinatorSseState,
    teams: DashMap<Uuid, SseHub>,
    team_capacity: usize,
}

impl SseState {
    /// Build the SSE sub-tree with per-stream channel capacities.
    pub fn new(public_capacity: usize, coordinator_capacity: usize, team_capacity: usize) -> Self {
        Self {
            public: SseHub::new(public_capacity),
            coordinator: CoordinatorSseState::new(coordinator_capacity),
            teams: DashMap::new(),
            team_capacity,
        }
    }

    /// Access the public SSE hub used to fan out broadcast events.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Access the coordinator SSE state bundle containing both hub and token.
    pub fn coordinator(&self) -> &CoordinatorSseState {
        &self.coordinator
    }

    /// Hub carrying events addressed to a single team, created on first use.
    pub fn team(&self, team_id: Uuid) -> SseHub {
        self.teams
            .entry(team_id)
            .or_insert_with(|| SseHub::new(self.team_capacity))
            .clone()
    }

    /// Drop a team's hub once the team no longer exists.
    pub fn forget_team(&self, team_id: Uuid) {
        self.teams.remove(&team_id);
    }
}

/// State bundle holding the coordinator SSE hub and its coordinating token.
pub struct CoordinatorSseState {
    hub: SseHub,
    token: Mutex<Option<String>>,
}

impl CoordinatorSseState {
    /// Create the coordinator SSE manager backed by a broadcast channel and token lock.
    fn new(capacity: usize) -> Self {
        Self {
            hub: SseHub::new(capacity),
            token: Mutex::new(None),
        }
    }

    /// Borrow the broadcast hub used for coordinator-only events.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// Borrow the token mutex that coordinates the single coordinator connection.
    pub fn token(&self) -> &Mutex<Option<String>> {
        &self.token
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
