//! crates/learning_session_core/src/session.rs
//!
//! `ChatSession` owns everything one learner's conversation needs: the
//! message log, playback state per video, doubt threads and the clarity/mode
//! settings. It is synchronous; the caller decides when planned replies and
//! follow-ups are delivered.

use crate::doubt::DoubtTracker;
use crate::domain::{
    ActionKind, ActionMessage, ChatTimings, ClarityLevel, DoubtContext, DoubtReply,
    LearningMode, Message, MessageId, MessageIdGenerator, Sender, TextMessage, ThreadId,
    VideoMessage, VideoMessagePatch, VideoPlaybackState, VideoStatePatch, VideoStatus,
};
use crate::error::ChatResult;
use crate::log::MessageLog;
use crate::playback::{SeekOutcome, VideoTracker};
use crate::responder::{self, ReplyPlan, VideoDraft};
use chrono::Utc;
use std::time::Duration;

/// A user message that was accepted and is now awaiting its reply.
#[derive(Debug, Clone)]
pub struct Submission {
    pub user_message: Message,
    /// The trimmed input.
    pub input: String,
    pub plan: ReplyPlan,
}

/// A message that must be appended some time after the primary reply.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    RevealVideo(VideoDraft),
    ContinueLearning { video_id: MessageId },
}

impl FollowUp {
    pub fn delay(&self, timings: &ChatTimings) -> Duration {
        match self {
            FollowUp::RevealVideo(_) => timings.video_reveal_delay,
            FollowUp::ContinueLearning { .. } => timings.follow_up_delay,
        }
    }
}

/// The outcome of completing a reply.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub messages: Vec<Message>,
    pub follow_up: Option<FollowUp>,
}

#[derive(Debug)]
pub struct ChatSession {
    log: MessageLog,
    videos: VideoTracker,
    doubts: DoubtTracker,
    ids: MessageIdGenerator,
    clarity: ClarityLevel,
    mode: LearningMode,
    pending_replies: usize,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(ClarityLevel::default(), LearningMode::default())
    }
}

impl ChatSession {
    pub fn new(clarity: ClarityLevel, mode: LearningMode) -> Self {
        Self {
            log: MessageLog::new(),
            videos: VideoTracker::new(),
            doubts: DoubtTracker::new(),
            ids: MessageIdGenerator::new(),
            clarity,
            mode,
            pending_replies: 0,
        }
    }

    /// A session that opens with the course welcome messages.
    pub fn with_welcome(clarity: ClarityLevel, mode: LearningMode) -> Self {
        let mut session = Self::new(clarity, mode);
        for text in responder::WELCOME_MESSAGES {
            session.push_text(Sender::Bot, text.to_string(), None, None);
        }
        session
    }

    //-------------------------------------------------------------------------------------
    // Read access
    //-------------------------------------------------------------------------------------

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn video(&self, video_id: MessageId) -> ChatResult<&VideoMessage> {
        self.log.find_video(video_id)
    }

    pub fn video_state(&self, video_id: MessageId) -> Option<&VideoPlaybackState> {
        self.videos.get(video_id)
    }

    pub fn doubt_thread(&self, video_id: MessageId) -> &[MessageId] {
        self.doubts.thread(video_id)
    }

    pub fn active_doubt(&self) -> Option<&DoubtContext> {
        self.doubts.active()
    }

    pub fn doubt_context_text(&self) -> Option<String> {
        self.doubts.context_text()
    }

    /// True while at least one reply has been planned but not delivered.
    pub fn is_loading(&self) -> bool {
        self.pending_replies > 0
    }

    pub fn clarity(&self) -> ClarityLevel {
        self.clarity
    }

    pub fn mode(&self) -> LearningMode {
        self.mode
    }

    pub fn set_clarity(&mut self, clarity: ClarityLevel) {
        self.clarity = clarity;
    }

    pub fn set_mode(&mut self, mode: LearningMode) {
        self.mode = mode;
    }

    //-------------------------------------------------------------------------------------
    // Appending
    //-------------------------------------------------------------------------------------

    fn append(&mut self, message: Message) -> Message {
        if let Message::Video(video) = &message {
            self.videos.initialize_if_absent(video);
        }
        self.log.append(message.clone());
        message
    }

    fn push_text(
        &mut self,
        sender: Sender,
        content: String,
        doubt_context: Option<DoubtContext>,
        doubt_reply: Option<DoubtReply>,
    ) -> Message {
        let message = Message::Text(TextMessage {
            id: self.ids.next_id(),
            sender,
            content,
            created_at: Utc::now(),
            doubt_context,
            doubt_reply,
        });
        self.append(message)
    }

    fn push_video(&mut self, draft: &VideoDraft) -> Message {
        let message = Message::Video(VideoMessage {
            id: self.ids.next_id(),
            title: draft.title.clone(),
            video_number: draft.video_number,
            total_videos: draft.total_videos,
            section: draft.section.clone(),
            source_url: draft.source_url.clone(),
            status: VideoStatus::Active,
            position: 0.0,
            duration: None,
            is_collapsed: false,
            created_at: Utc::now(),
        });
        self.append(message)
    }

    //-------------------------------------------------------------------------------------
    // Conversation
    //-------------------------------------------------------------------------------------

    /// Accepts user input. Blank input is ignored and returns `None`.
    ///
    /// An active doubt context is consumed here: the user message carries it
    /// and is filed into that video's thread.
    pub fn submit(&mut self, input: &str) -> Option<Submission> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        let doubt = self.doubts.take_active();
        let plan = responder::plan_reply(trimmed, doubt.as_ref(), &self.log);
        let user_message = self.push_text(Sender::User, trimmed.to_string(), doubt.clone(), None);
        if let Some(context) = &doubt {
            self.doubts
                .record(&ThreadId::for_video(context.video_id), user_message.id());
        }
        self.pending_replies += 1;

        Some(Submission {
            user_message,
            input: trimmed.to_string(),
            plan,
        })
    }

    /// Appends the primary reply for `submission`. `generated` overrides the
    /// canned text for the doubt and general branches.
    pub fn complete_reply(&mut self, submission: &Submission, generated: Option<String>) -> Delivery {
        self.pending_replies = self.pending_replies.saturating_sub(1);

        match &submission.plan {
            ReplyPlan::Doubt(context) => {
                let content = generated.unwrap_or_else(|| {
                    responder::doubt_response(&submission.input, context, self.clarity, self.mode)
                });
                let thread_id = ThreadId::for_video(context.video_id);
                let reply = self.push_text(
                    Sender::Bot,
                    content,
                    None,
                    Some(DoubtReply {
                        related_video: context.video_id,
                        thread_id: thread_id.clone(),
                    }),
                );
                self.doubts.record(&thread_id, reply.id());
                Delivery {
                    messages: vec![reply],
                    follow_up: Some(FollowUp::ContinueLearning {
                        video_id: context.video_id,
                    }),
                }
            }
            ReplyPlan::NextVideo { video_number } => Delivery {
                messages: vec![self.push_video(&responder::next_video(*video_number))],
                follow_up: None,
            },
            ReplyPlan::Start => {
                let intro = self.push_text(Sender::Bot, responder::START_INTRO.to_string(), None, None);
                Delivery {
                    messages: vec![intro],
                    follow_up: Some(FollowUp::RevealVideo(responder::first_video())),
                }
            }
            ReplyPlan::General => {
                let content = generated.unwrap_or_else(|| {
                    responder::general_response(&submission.input, self.clarity, self.mode)
                });
                Delivery {
                    messages: vec![self.push_text(Sender::Bot, content, None, None)],
                    follow_up: None,
                }
            }
        }
    }

    pub fn deliver_follow_up(&mut self, follow_up: &FollowUp) -> Message {
        match follow_up {
            FollowUp::RevealVideo(draft) => self.push_video(draft),
            FollowUp::ContinueLearning { video_id } => {
                let message = Message::Action(ActionMessage {
                    id: self.ids.next_id(),
                    action: ActionKind::ContinueLearning,
                    related_video: *video_id,
                    created_at: Utc::now(),
                });
                self.append(message)
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Doubts
    //-------------------------------------------------------------------------------------

    /// Begins composing a question about a video. The video is paused first;
    /// without an explicit timestamp its current progress is captured.
    pub fn start_doubt(&mut self, video_id: MessageId, timestamp: Option<f64>) -> ChatResult<DoubtContext> {
        let video_title = self.log.find_video(video_id)?.title.clone();
        let state = self.videos.pause(video_id);
        let context = DoubtContext {
            video_id,
            video_title,
            timestamp_seconds: timestamp.unwrap_or(state.progress),
        };
        self.doubts.activate(context.clone());
        Ok(context)
    }

    pub fn cancel_doubt(&mut self) -> Option<DoubtContext> {
        self.doubts.cancel()
    }

    //-------------------------------------------------------------------------------------
    // Videos
    //-------------------------------------------------------------------------------------

    /// Flips (or forces) the collapsed flag. Collapsing also pauses.
    pub fn toggle_collapse(&mut self, video_id: MessageId, force: Option<bool>) -> ChatResult<bool> {
        let current = self.log.find_video(video_id)?.is_collapsed;
        let is_collapsed = force.unwrap_or(!current);
        if is_collapsed {
            self.videos.pause(video_id);
        }
        self.log.update_video_message(
            video_id,
            &VideoMessagePatch {
                duration: None,
                is_collapsed: Some(is_collapsed),
            },
        )?;
        Ok(is_collapsed)
    }

    pub fn set_video_state(
        &mut self,
        video_id: MessageId,
        patch: &VideoStatePatch,
    ) -> ChatResult<VideoPlaybackState> {
        self.log.find_video(video_id)?;
        Ok(self.videos.set_state(video_id, patch).clone())
    }

    pub fn video_progress(&mut self, video_id: MessageId, played_seconds: f64) -> ChatResult<bool> {
        self.log.find_video(video_id)?;
        Ok(self.videos.on_progress(video_id, played_seconds))
    }

    /// Records the real duration in both the tracker and the message.
    pub fn video_duration(&mut self, video_id: MessageId, duration: f64) -> ChatResult<VideoPlaybackState> {
        self.log.update_video_message(
            video_id,
            &VideoMessagePatch {
                duration: Some(duration),
                is_collapsed: None,
            },
        )?;
        Ok(self.videos.on_duration_known(video_id, duration).clone())
    }

    pub fn attach_player(&mut self, video_id: MessageId) -> ChatResult<()> {
        self.log.find_video(video_id)?;
        self.videos.attach_player(video_id);
        Ok(())
    }

    /// Returns whether a player was attached.
    pub fn detach_player(&mut self, video_id: MessageId) -> bool {
        let attached = self.videos.has_player(video_id);
        self.videos.detach_player(video_id);
        attached
    }

    /// Returns a seek that was queued before the player existed.
    pub fn player_ready(&mut self, video_id: MessageId) -> ChatResult<Option<f64>> {
        self.log.find_video(video_id)?;
        Ok(self.videos.on_ready(video_id))
    }

    pub fn seek(&mut self, video_id: MessageId, timestamp_seconds: f64) -> ChatResult<SeekOutcome> {
        self.log.find_video(video_id)?;
        Ok(self.videos.request_seek(video_id, timestamp_seconds))
    }

    /// First half of accepting a continue-learning prompt: re-expand the
    /// video. Returns whether it was collapsed.
    pub fn continue_learning(&mut self, video_id: MessageId) -> ChatResult<bool> {
        let was_collapsed = self.log.find_video(video_id)?.is_collapsed;
        if was_collapsed {
            self.toggle_collapse(video_id, Some(false))?;
        }
        Ok(was_collapsed)
    }

    /// Second half of continue-learning: playback resumes.
    pub fn resume_video(&mut self, video_id: MessageId) -> ChatResult<VideoPlaybackState> {
        self.set_video_state(video_id, &VideoStatePatch::playing(true))
    }
}
