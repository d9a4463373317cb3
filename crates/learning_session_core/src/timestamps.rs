//! crates/learning_session_core/src/timestamps.rs
//!
//! Splits chat text into plain runs and video timestamps (`MM:SS`,
//! `HH:MM:SS`) so a client can render the timestamps as jump links.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// A run of chat text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Token {
    Text { text: String },
    Timestamp { raw: String, seconds: u32 },
}

impl Token {
    /// The exact source text this token covers.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Text { text } => text,
            Token::Timestamp { raw, .. } => raw,
        }
    }
}

/// One or two leading digits and one or two `:NN` groups. Field ranges and
/// glued neighbours are checked per match.
fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // The pattern is a literal; compiling it cannot fail.
        Regex::new(r"[0-9]{1,2}(?::[0-9]{2}){1,2}").expect("timestamp pattern compiles")
    })
}

/// Tokenizes `text`. Concatenating `as_str()` of every token gives back the
/// input unchanged.
///
/// A timestamp is one or two digits followed by one or two `:NN` groups,
/// where every `NN` is below 60. It must not touch another digit, or a colon
/// that continues a number, on either side: `123:45` and `12:345` stay text.
pub fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;

    for found in timestamp_pattern().find_iter(text) {
        if glued(bytes, found.start(), found.end()) {
            continue;
        }
        let Some(seconds) = parse_timestamp(found.as_str()) else {
            continue;
        };
        if text_start < found.start() {
            tokens.push(Token::Text {
                text: text[text_start..found.start()].to_string(),
            });
        }
        tokens.push(Token::Timestamp {
            raw: found.as_str().to_string(),
            seconds,
        });
        text_start = found.end();
    }

    if text_start < bytes.len() {
        tokens.push(Token::Text {
            text: text[text_start..].to_string(),
        });
    }
    tokens
}

/// True when the match at `start..end` continues a longer number on either side.
fn glued(bytes: &[u8], start: usize, end: usize) -> bool {
    let before = match start.checked_sub(1).map(|p| bytes[p]) {
        Some(b) if b.is_ascii_digit() => true,
        Some(b':') => start >= 2 && bytes[start - 2].is_ascii_digit(),
        _ => false,
    };
    let after = match bytes.get(end) {
        Some(b) if b.is_ascii_digit() => true,
        Some(b':') => bytes.get(end + 1).is_some_and(u8::is_ascii_digit),
        _ => false,
    };
    before || after
}

/// Parses `M:SS`, `MM:SS`, `H:MM:SS` or `HH:MM:SS` into seconds.
pub fn parse_timestamp(raw: &str) -> Option<u32> {
    let parts: Vec<&str> = raw.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let mut total = 0u32;
    for (idx, part) in parts.iter().enumerate() {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = part.parse().ok()?;
        if idx == 0 {
            if part.len() > 2 {
                return None;
            }
        } else if part.len() != 2 || value >= 60 {
            return None;
        }
        total = total * 60 + value;
    }
    Some(total)
}

/// Formats a playback position as `MM:SS`. Negative or non-finite input
/// reads as zero; minutes are not wrapped into hours.
pub fn format_video_position(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
