//! crates/learning_session_core/src/responder.rs
//!
//! The decision policy behind simulated bot replies and the canned text it
//! draws from. Nothing here waits or performs I/O; the service decides when
//! a planned reply is actually delivered.

use crate::domain::{ClarityLevel, DoubtContext, LearningMode};
use crate::log::MessageLog;
use crate::timestamps::format_video_position;

pub const WELCOME_MESSAGES: [&str; 2] = [
    "Welcome to the Generative AI for Developers professional learning track. This course will provide comprehensive coverage of implementing generative AI in production applications.",
    "Type 'start' to begin the first module, or ask me any questions about generative AI!",
];

pub const START_INTRO: &str =
    "Okay, starting Module 1: Introduction to Generative AI. Here's the first video:";

pub const TOTAL_VIDEOS: u32 = 12;
pub const PLACEHOLDER_VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Which of the four reply branches a submitted input takes.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPlan {
    /// A question raised from a video; answered into its doubt thread.
    Doubt(DoubtContext),
    /// "next video" / "continue": post the next lesson video.
    NextVideo { video_number: u32 },
    /// "start" before any video was shown: intro text, then video #1.
    Start,
    /// Anything else.
    General,
}

/// Chooses the reply branch, in strict order, for trimmed `input`.
/// `doubt` is the context that was active when the input was submitted.
pub fn plan_reply(input: &str, doubt: Option<&DoubtContext>, log: &MessageLog) -> ReplyPlan {
    if let Some(context) = doubt {
        return ReplyPlan::Doubt(context.clone());
    }
    let lowered = input.trim().to_lowercase();
    if lowered.contains("next video") || lowered.contains("continue") {
        return ReplyPlan::NextVideo {
            video_number: log.next_video_number(),
        };
    }
    if lowered == "start" && !log.has_video() {
        return ReplyPlan::Start;
    }
    ReplyPlan::General
}

/// Everything a lesson video needs except its id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDraft {
    pub title: String,
    pub video_number: u32,
    pub total_videos: u32,
    pub section: String,
    pub source_url: String,
}

pub fn first_video() -> VideoDraft {
    VideoDraft {
        title: "Introduction to Transformer Architecture".to_string(),
        video_number: 1,
        total_videos: TOTAL_VIDEOS,
        section: "Foundations".to_string(),
        source_url: PLACEHOLDER_VIDEO_URL.to_string(),
    }
}

pub fn next_video(video_number: u32) -> VideoDraft {
    VideoDraft {
        title: format!("Advanced Topic {video_number}"),
        video_number,
        total_videos: TOTAL_VIDEOS,
        section: "Advanced".to_string(),
        source_url: PLACEHOLDER_VIDEO_URL.to_string(),
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Answer to a question about a video, shaped by clarity and mode.
pub fn doubt_response(
    question: &str,
    context: &DoubtContext,
    clarity: ClarityLevel,
    mode: LearningMode,
) -> String {
    let mut response = format!(
        "Regarding \"{}\" at {}: ",
        context.video_title,
        format_video_position(context.timestamp_seconds)
    );

    response.push_str(match clarity {
        ClarityLevel::Basic => "Think of it like this... the model reads the sentence and keeps track of which words belong together. It helps the AI understand the order of things.",
        ClarityLevel::Intermediate => "The key concept here is how the model weighs the importance of different inputs against each other. This allows the model to effectively capture long-range dependencies.",
        ClarityLevel::Advanced => "Technically, the underlying mechanism involves multi-head self-attention and positional encoding applied across the whole sequence. Consider the implications for sequence transduction tasks.",
    });

    match mode {
        LearningMode::Comprehensive => {
            response.push_str(" Would you like a link to the original research paper discussing this?");
        }
        LearningMode::Practical => {
            response.push_str(" You can find a code implementation of this concept in the resources panel.");
        }
        _ => {}
    }

    response.push_str(&format!(
        " Does that clarify your question about \"{}...\"?",
        excerpt(question, 30)
    ));
    response
}

/// Reply to input that is neither a doubt nor a navigation command.
pub fn general_response(input: &str, clarity: ClarityLevel, mode: LearningMode) -> String {
    let mut response = format!("That's an interesting point about \"{}...\". ", excerpt(input, 50));

    response.push_str(match clarity {
        ClarityLevel::Basic => "In simple terms, it relates to how AI systems process information. ",
        ClarityLevel::Intermediate => "This touches upon core principles in modern AI development. ",
        ClarityLevel::Advanced => "From a technical perspective, this involves the model's attention mechanisms and contextual embeddings. ",
    });

    response.push_str(match mode {
        LearningMode::Assessment => "Would you like to try a quick quiz question on this topic before we continue the lesson?",
        LearningMode::Express => "Let's move on to the next key concept to maintain our efficient pace.",
        LearningMode::Comprehensive => "I can provide more detailed examples if you're interested in exploring this topic further.",
        LearningMode::Practical => "In practice, you would implement this using libraries like Hugging Face Transformers or OpenAI's API.",
        LearningMode::Normal | LearningMode::Review => "How would you like to proceed? Continue the lesson or explore this topic further?",
    });
    response
}
