//! crates/learning_session_core/src/domain.rs
//!
//! Defines the pure, core data structures for a chat-driven learning session
//! and for the static learning catalog served next to it.
//! These structs are independent of any transport or storage format; they only
//! derive serde so adapters can ship them as-is.

use crate::error::ParseSettingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

//=========================================================================================
// Identifiers
//=========================================================================================

/// Identifies a message within one session. Derived from wall-clock milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing, time-derived message ids.
///
/// Two messages created within the same millisecond get consecutive ids
/// instead of colliding.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    last: u64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> MessageId {
        self.next_at(Utc::now())
    }

    pub fn next_at(&mut self, now: DateTime<Utc>) -> MessageId {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last + 1);
        self.last = id;
        MessageId(id)
    }
}

/// Key of a doubt thread: `doubt-<videoId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn for_video(video_id: MessageId) -> Self {
        Self(format!("doubt-{video_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//=========================================================================================
// Messages
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Where a user's question was raised: a video and a position inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubtContext {
    pub video_id: MessageId,
    pub video_title: String,
    pub timestamp_seconds: f64,
}

/// Marks a bot message as the answer to a doubt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubtReply {
    pub related_video: MessageId,
    pub thread_id: ThreadId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doubt_context: Option<DoubtContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doubt_reply: Option<DoubtReply>,
}

impl TextMessage {
    pub fn is_doubt_response(&self) -> bool {
        self.doubt_reply.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Active,
    Completed,
}

/// A lesson video posted into the conversation. Only `duration` and
/// `is_collapsed` may change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMessage {
    pub id: MessageId,
    pub title: String,
    pub video_number: u32,
    pub total_videos: u32,
    pub section: String,
    pub source_url: String,
    pub status: VideoStatus,
    pub position: f64,
    pub duration: Option<f64>,
    pub is_collapsed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "continue-learning")]
    ContinueLearning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMessage {
    pub id: MessageId,
    pub action: ActionKind,
    pub related_video: MessageId,
    pub created_at: DateTime<Utc>,
}

/// One entry of the session's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text(TextMessage),
    Video(VideoMessage),
    Action(ActionMessage),
}

impl Message {
    pub fn id(&self) -> MessageId {
        match self {
            Message::Text(m) => m.id,
            Message::Video(m) => m.id,
            Message::Action(m) => m.id,
        }
    }

    pub fn sender(&self) -> Sender {
        match self {
            Message::Text(m) => m.sender,
            Message::Video(_) | Message::Action(_) => Sender::Bot,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Message::Text(m) => m.created_at,
            Message::Video(m) => m.created_at,
            Message::Action(m) => m.created_at,
        }
    }

    pub fn as_text(&self) -> Option<&TextMessage> {
        match self {
            Message::Text(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoMessage> {
        match self {
            Message::Video(m) => Some(m),
            _ => None,
        }
    }
}

/// The only fields of a video message that may be patched after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMessagePatch {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub is_collapsed: Option<bool>,
}

//=========================================================================================
// Video Playback
//=========================================================================================

pub const DEFAULT_VOLUME: f64 = 0.8;
pub const DEFAULT_SPEED: f64 = 1.0;

/// Transient playback parameters for one video message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPlaybackState {
    pub is_playing: bool,
    pub progress: f64,
    pub duration: f64,
    pub speed: f64,
    pub volume: f64,
    pub muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_seek: Option<f64>,
}

impl Default for VideoPlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            progress: 0.0,
            duration: 0.0,
            speed: DEFAULT_SPEED,
            volume: DEFAULT_VOLUME,
            muted: false,
            pending_seek: None,
        }
    }
}

impl VideoPlaybackState {
    /// Seeds the state from what the message already knows about the video.
    pub fn for_video(video: &VideoMessage) -> Self {
        Self {
            progress: video.position,
            duration: video.duration.unwrap_or(0.0),
            ..Self::default()
        }
    }
}

/// A partial update to a `VideoPlaybackState`. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatePatch {
    #[serde(default)]
    pub is_playing: Option<bool>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub muted: Option<bool>,
}

impl VideoStatePatch {
    pub fn playing(is_playing: bool) -> Self {
        Self {
            is_playing: Some(is_playing),
            ..Self::default()
        }
    }
}

//=========================================================================================
// Session Settings
//=========================================================================================

/// How technical the simulated answers are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClarityLevel {
    Basic,
    #[default]
    Intermediate,
    Advanced,
}

impl ClarityLevel {
    pub const ALL: [ClarityLevel; 3] = [Self::Basic, Self::Intermediate, Self::Advanced];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ClarityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClarityLevel {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseSettingError::UnknownClarity(s.to_string()))
    }
}

/// Which canned response style is layered onto bot replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningMode {
    #[default]
    Normal,
    Express,
    Comprehensive,
    Review,
    Assessment,
    Practical,
}

impl LearningMode {
    pub const ALL: [LearningMode; 6] = [
        Self::Normal,
        Self::Express,
        Self::Comprehensive,
        Self::Review,
        Self::Assessment,
        Self::Practical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Express => "express",
            Self::Comprehensive => "comprehensive",
            Self::Review => "review",
            Self::Assessment => "assessment",
            Self::Practical => "practical",
        }
    }
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseSettingError::UnknownMode(s.to_string()))
    }
}

/// Fixed latencies of the simulated conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTimings {
    /// Delay before any primary reply appears ("typing").
    pub typing_delay: Duration,
    /// Delay between the start intro text and the first video.
    pub video_reveal_delay: Duration,
    /// Delay between a doubt answer and its continue-learning prompt.
    pub follow_up_delay: Duration,
    /// Delay between accepting continue-learning and playback resuming.
    pub resume_delay: Duration,
}

impl Default for ChatTimings {
    fn default() -> Self {
        Self {
            typing_delay: Duration::from_millis(800),
            video_reveal_delay: Duration::from_millis(500),
            follow_up_delay: Duration::from_millis(600),
            resume_delay: Duration::from_millis(300),
        }
    }
}

//=========================================================================================
// Learning Catalog (static data behind the REST surface)
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub course_type: String,
    pub level: String,
    pub duration: String,
    pub instructor: String,
    pub instructor_id: String,
    pub enrolled_count: u32,
    pub rating: Option<f32>,
    pub thumbnail_url: Option<String>,
    pub is_enrolled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: String,
    pub user_id: String,
    pub completed_modules: Vec<String>,
    pub percent_complete: f32,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentReceipt {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub assessment_type: String,
    pub questions: u32,
    pub time_estimate: String,
    pub status: String,
    pub requirement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub success: bool,
    pub score: u32,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub role: String,
    pub points: u32,
    pub streak: u32,
    pub badge: Option<String>,
    pub change: String,
    pub is_online: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: String,
    pub title: String,
    pub author: String,
    pub author_id: String,
    pub category: String,
    pub replies: u32,
    pub views: u32,
    pub time: String,
    pub solved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub learning_focus: Option<String>,
}

/// Returned after an avatar upload; `avatar_url` is where the image is served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarReceipt {
    pub success: bool,
    pub avatar_url: String,
}

/// Fields a client may change on its profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub learning_focus: Option<String>,
}
