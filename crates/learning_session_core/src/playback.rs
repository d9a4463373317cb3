//! crates/learning_session_core/src/playback.rs
//!
//! Per-video playback parameters, tracked independently of the message log.
//! The client owns the real players; this tracker only knows whether a
//! player for a given video has reported itself as attached.

use crate::domain::{MessageId, VideoMessage, VideoPlaybackState, VideoStatePatch};
use std::collections::{HashMap, HashSet};

/// What a seek request turned into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// The player exists; the client should seek now.
    Immediate(f64),
    /// No player yet; the seek is applied once the player reports ready.
    Deferred,
}

#[derive(Debug, Default)]
pub struct VideoTracker {
    states: HashMap<MessageId, VideoPlaybackState>,
    players: HashSet<MessageId>,
}

impl VideoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MessageId) -> Option<&VideoPlaybackState> {
        self.states.get(&id)
    }

    /// Seeds state the first time a video message is seen. Returns `true`
    /// when a new entry was created.
    pub fn initialize_if_absent(&mut self, video: &VideoMessage) -> bool {
        match self.states.get_mut(&video.id) {
            Some(state) => {
                if state.duration == 0.0 {
                    if let Some(duration) = video.duration {
                        state.duration = duration;
                    }
                }
                false
            }
            None => {
                self.states
                    .insert(video.id, VideoPlaybackState::for_video(video));
                true
            }
        }
    }

    /// Merges a partial update. Setting `volume` also derives `muted`:
    /// zero (or less) mutes, anything above unmutes. Unmuting never touches
    /// the volume.
    pub fn set_state(&mut self, id: MessageId, patch: &VideoStatePatch) -> &VideoPlaybackState {
        let state = self.states.entry(id).or_default();
        if let Some(is_playing) = patch.is_playing {
            state.is_playing = is_playing;
        }
        if let Some(progress) = patch.progress {
            state.progress = progress;
        }
        if let Some(duration) = patch.duration {
            state.duration = duration;
        }
        if let Some(speed) = patch.speed {
            state.speed = speed;
        }
        if let Some(muted) = patch.muted {
            state.muted = muted;
        }
        if let Some(volume) = patch.volume {
            state.volume = volume;
            state.muted = volume <= 0.0;
        }
        state
    }

    pub fn pause(&mut self, id: MessageId) -> &VideoPlaybackState {
        self.set_state(id, &VideoStatePatch::playing(false))
    }

    /// Records playback progress, but only while the video is playing.
    /// Returns whether the update was applied.
    pub fn on_progress(&mut self, id: MessageId, played_seconds: f64) -> bool {
        match self.states.get_mut(&id) {
            Some(state) if state.is_playing => {
                state.progress = played_seconds;
                true
            }
            _ => false,
        }
    }

    pub fn on_duration_known(&mut self, id: MessageId, duration: f64) -> &VideoPlaybackState {
        self.set_state(
            id,
            &VideoStatePatch {
                duration: Some(duration),
                ..VideoStatePatch::default()
            },
        )
    }

    pub fn attach_player(&mut self, id: MessageId) {
        self.players.insert(id);
    }

    pub fn detach_player(&mut self, id: MessageId) {
        self.players.remove(&id);
    }

    pub fn has_player(&self, id: MessageId) -> bool {
        self.players.contains(&id)
    }

    /// The player just became usable. Returns a seek queued before it existed.
    pub fn on_ready(&mut self, id: MessageId) -> Option<f64> {
        self.players.insert(id);
        self.states
            .get_mut(&id)
            .and_then(|state| state.pending_seek.take())
    }

    /// Seeks now if the player exists, otherwise stashes the target for
    /// `on_ready`. Either way playback resumes.
    pub fn request_seek(&mut self, id: MessageId, timestamp_seconds: f64) -> SeekOutcome {
        let attached = self.players.contains(&id);
        let state = self.states.entry(id).or_default();
        state.is_playing = true;
        if attached {
            SeekOutcome::Immediate(timestamp_seconds)
        } else {
            state.pending_seek = Some(timestamp_seconds);
            SeekOutcome::Deferred
        }
    }
}
