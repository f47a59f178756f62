use axum::extract::FromRef;

use crate::likes::LikeToggleCoordinator;
use crate::notifications::NotificationStore;
use crate::posts::PostStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPostStore = Arc<dyn PostStore>;
pub type GuardedNotificationStore = Arc<dyn NotificationStore>;
pub type GuardedLikeToggleCoordinator = Arc<LikeToggleCoordinator>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub post_store: GuardedPostStore,
    pub notification_store: GuardedNotificationStore,
    pub like_toggle_coordinator: GuardedLikeToggleCoordinator,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedPostStore {
    fn from_ref(input: &ServerState) -> Self {
        input.post_store.clone()
    }
}

impl FromRef<ServerState> for GuardedNotificationStore {
    fn from_ref(input: &ServerState) -> Self {
        input.notification_store.clone()
    }
}

impl FromRef<ServerState> for GuardedLikeToggleCoordinator {
    fn from_ref(input: &ServerState) -> Self {
        input.like_toggle_coordinator.clone()
    }
}
