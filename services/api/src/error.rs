//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.

use crate::config::ConfigError;
use learning_session_core::{error::ChatError, ports::PortError};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A port call failed, e.g. the reply generator.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A session command referenced a message it cannot act on.
    #[error("Session Error: {0}")]
    Chat(#[from] ChatError),

    /// Represents an error related to the WebSocket connection.
    #[error("WebSocket Error: {0}")]
    Websocket(#[from] axum::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_failures_keep_their_reason() {
        let err = ApiError::from(PortError::Unexpected("offline".to_string()));
        assert!(matches!(err, ApiError::Port(_)));
        assert_eq!(
            err.to_string(),
            "Service Port Error: An unexpected error occurred: offline"
        );
    }

    #[test]
    fn config_failures_name_the_variable() {
        let err = ApiError::from(ConfigError::InvalidValue(
            "BIND_ADDRESS".to_string(),
            "bad".to_string(),
        ));
        assert!(err.to_string().contains("BIND_ADDRESS"));
    }
}
