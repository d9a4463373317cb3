//! crates/learning_session_core/src/error.rs
//!
//! Error types raised by the session controller itself.

use crate::domain::MessageId;

/// Failures of `ChatSession` operations that reference a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),
    #[error("Message {0} is not a video")]
    NotAVideo(MessageId),
}

/// A convenience type alias for `Result<T, ChatError>`.
pub type ChatResult<T> = Result<T, ChatError>;

/// Raised when a clarity level or learning mode name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSettingError {
    #[error("Unknown clarity level: '{0}'")]
    UnknownClarity(String),
    #[error("Unknown learning mode: '{0}'")]
    UnknownMode(String),
}
