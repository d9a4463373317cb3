//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the chat-driven learning session.

use learning_session_core::{
    domain::{
        ClarityLevel, DoubtContext, LearningMode, Message, MessageId, VideoPlaybackState,
        VideoStatePatch,
    },
    timestamps::{tokenize, Token},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submits the text in the input box.
    SendMessage { text: String },

    /// Opens a doubt about a video. Without a timestamp the current progress is used.
    StartDoubt {
        video_id: MessageId,
        #[serde(default)]
        timestamp_seconds: Option<f64>,
    },

    CancelDoubt,

    /// Collapses or expands a video card. `force` pins the target state.
    ToggleCollapse {
        video_id: MessageId,
        #[serde(default)]
        force: Option<bool>,
    },

    SetVideoState {
        video_id: MessageId,
        patch: VideoStatePatch,
    },

    /// Periodic progress report from the player.
    VideoProgress { video_id: MessageId, played_seconds: f64 },

    VideoDuration { video_id: MessageId, duration: f64 },

    PlayerAttached { video_id: MessageId },

    PlayerDetached { video_id: MessageId },

    PlayerReady { video_id: MessageId },

    /// Jump request, usually from a timestamp link inside a doubt answer.
    Seek { video_id: MessageId, timestamp_seconds: f64 },

    /// The learner accepted a continue-learning prompt.
    ContinueLearning { video_id: MessageId },

    SetClarity { clarity: ClarityLevel },

    SetMode { mode: LearningMode },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the session exists. Sent first on every connection.
    SessionInitialized {
        session_id: Uuid,
        clarity: ClarityLevel,
        mode: LearningMode,
    },

    /// A message was added to the log. Doubt answers carry a token stream so
    /// the client can render timestamps as jump links.
    MessageAppended {
        message: Message,
        #[serde(skip_serializing_if = "Option::is_none")]
        tokens: Option<Vec<Token>>,
    },

    /// A video message was patched (collapsed flag or duration).
    MessageUpdated { message: Message },

    /// Whether a reply is pending ("bot is typing").
    Typing { is_loading: bool },

    VideoState {
        video_id: MessageId,
        state: VideoPlaybackState,
    },

    /// Tells the client to seek its player now.
    SeekVideo { video_id: MessageId, seconds: f64 },

    /// Tells the client to scroll a video into view.
    FocusVideo { video_id: MessageId },

    DoubtStarted { context: DoubtContext, prompt: String },

    DoubtCancelled,

    SettingsChanged {
        clarity: ClarityLevel,
        mode: LearningMode,
    },

    /// Reports a failed command. The connection stays open.
    Error { message: String },
}

impl ServerMessage {
    /// Wraps a newly appended message, tokenizing doubt answers.
    pub fn appended(message: Message) -> Self {
        let tokens = message
            .as_text()
            .filter(|text| text.is_doubt_response())
            .map(|text| tokenize(&text.content));
        ServerMessage::MessageAppended { message, tokens }
    }
}
