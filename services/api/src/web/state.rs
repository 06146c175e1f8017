//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-connection heartbeat state.

use crate::adapters::Stores;
use crate::config::Config;
use std::sync::Arc;
use study_tracker_core::{
    AuthSessionStore, PlanCatalog, ProgressTracker, QuoteService, SessionGuard, SessionStore,
    UserDirectory,
};
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: &'static PlanCatalog,
    pub users: Arc<dyn UserDirectory>,
    pub auth_sessions: Arc<dyn AuthSessionStore>,
    pub device_sessions: Arc<dyn SessionStore>,
    pub progress: Arc<ProgressTracker>,
    pub quotes: Arc<dyn QuoteService>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        catalog: &'static PlanCatalog,
        stores: Stores,
        quotes: Arc<dyn QuoteService>,
    ) -> Self {
        Self {
            config,
            catalog,
            users: stores.users,
            auth_sessions: stores.auth_sessions,
            device_sessions: stores.device_sessions,
            progress: Arc::new(ProgressTracker::new(catalog, stores.progress)),
            quotes,
        }
    }
}

//=========================================================================================
// ConnectionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single heartbeat socket.
pub struct ConnectionState {
    pub user_id: String,
    pub auth_session_id: String,
    pub guard: SessionGuard,
    /// Cancels the heartbeat task when the socket closes.
    pub cancellation_token: CancellationToken,
}

impl ConnectionState {
    pub fn new(user_id: String, auth_session_id: String, guard: SessionGuard) -> Self {
        Self {
            user_id,
            auth_session_id,
            guard,
            cancellation_token: CancellationToken::new(),
        }
    }
}
