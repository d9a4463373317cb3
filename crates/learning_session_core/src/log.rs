//! crates/learning_session_core/src/log.rs
//!
//! The ordered, append-only record of a session's conversation.

use crate::domain::{Message, MessageId, VideoMessage, VideoMessagePatch};
use crate::error::{ChatError, ChatResult};

/// Messages in the order they were appended. Nothing is ever removed or
/// reordered; video messages may have `duration` and `is_collapsed` patched.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    /// Looks up a video message, distinguishing "missing" from "wrong kind".
    pub fn find_video(&self, id: MessageId) -> ChatResult<&VideoMessage> {
        let message = self.get(id).ok_or(ChatError::MessageNotFound(id))?;
        message.as_video().ok_or(ChatError::NotAVideo(id))
    }

    /// The most recently appended video, if any.
    pub fn find_last_video(&self) -> Option<&VideoMessage> {
        self.messages.iter().rev().find_map(Message::as_video)
    }

    pub fn has_video(&self) -> bool {
        self.find_last_video().is_some()
    }

    /// Sequence number for the next lesson video.
    pub fn next_video_number(&self) -> u32 {
        self.find_last_video().map_or(1, |video| video.video_number + 1)
    }

    /// Merges `patch` into the video with the given id. This is the only
    /// mutation the log allows.
    pub fn update_video_message(
        &mut self,
        id: MessageId,
        patch: &VideoMessagePatch,
    ) -> ChatResult<&VideoMessage> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id() == id)
            .ok_or(ChatError::MessageNotFound(id))?;
        let Message::Video(video) = message else {
            return Err(ChatError::NotAVideo(id));
        };
        if let Some(duration) = patch.duration {
            video.duration = Some(duration);
        }
        if let Some(is_collapsed) = patch.is_collapsed {
            video.is_collapsed = is_collapsed;
        }
        Ok(video)
    }
}
