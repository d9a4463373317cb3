pub mod doubt;
pub mod domain;
pub mod error;
pub mod log;
pub mod playback;
pub mod ports;
pub mod responder;
pub mod session;
pub mod timestamps;

pub use domain::{
    ChatTimings, ClarityLevel, DoubtContext, LearningMode, Message, MessageId, VideoPlaybackState,
    VideoStatePatch,
};
pub use error::{ChatError, ChatResult, ParseSettingError};
pub use ports::{CatalogService, PortError, PortResult, ResponseGenerator};
pub use session::{ChatSession, Delivery, FollowUp, Submission};
