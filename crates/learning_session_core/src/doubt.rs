//! crates/learning_session_core/src/doubt.rs
//!
//! Groups a learner's questions about a video, and the answers to them, into
//! one thread per video. At most one doubt is being composed at a time.

use crate::domain::{DoubtContext, MessageId, ThreadId};
use crate::timestamps::format_video_position;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct DoubtTracker {
    threads: BTreeMap<ThreadId, Vec<MessageId>>,
    active: Option<DoubtContext>,
}

impl DoubtTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&DoubtContext> {
        self.active.as_ref()
    }

    /// Replaces whatever doubt was being composed.
    pub fn activate(&mut self, context: DoubtContext) {
        self.active = Some(context);
    }

    pub fn cancel(&mut self) -> Option<DoubtContext> {
        self.active.take()
    }

    /// Consumes the active context when the question is sent.
    pub fn take_active(&mut self) -> Option<DoubtContext> {
        self.active.take()
    }

    /// Appends a message to the thread, creating the thread on first use.
    pub fn record(&mut self, thread: &ThreadId, message_id: MessageId) {
        self.threads.entry(thread.clone()).or_default().push(message_id);
    }

    pub fn thread(&self, video_id: MessageId) -> &[MessageId] {
        self.threads
            .get(&ThreadId::for_video(video_id))
            .map_or(&[], Vec::as_slice)
    }

    #[cfg(test)]
    pub fn threads(&self) -> &BTreeMap<ThreadId, Vec<MessageId>> {
        &self.threads
    }

    /// Human-readable prompt for the doubt being composed.
    pub fn context_text(&self) -> Option<String> {
        self.active.as_ref().map(|context| {
            format!(
                "Asking about \"{}\" at {}",
                context.video_title,
                format_video_position(context.timestamp_seconds)
            )
        })
    }
}
