//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use crate::web::protocol::ServerMessage;
use learning_session_core::{
    domain::ChatTimings,
    ports::{CatalogService, ResponseGenerator},
    session::ChatSession,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub responder: Arc<dyn ResponseGenerator>,
    pub catalog: Arc<dyn CatalogService>,
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// Events queued for the connection's writer task.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// The state for a single, active WebSocket connection.
pub struct SessionState {
    pub session_id: Uuid,
    pub chat: ChatSession,
    pub timings: ChatTimings,
    /// Cancelled when the connection closes; every pending reply timer races it.
    pub cancellation_token: CancellationToken,
}

impl SessionState {
    /// Creates a fresh session seeded with the welcome messages.
    pub fn new(config: &Config) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            chat: ChatSession::with_welcome(config.default_clarity, config.default_mode),
            timings: config.timings,
            cancellation_token: CancellationToken::new(),
        }
    }
}
