//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use learning_session_core::domain::{ChatTimings, ClarityLevel, LearningMode};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

const DEFAULT_API_PREFIX: &str = "/api";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Public base URL of the REST surface, e.g. `http://localhost:8000/api`.
    pub api_base_url: String,
    pub allowed_origin: String,
    pub default_clarity: ClarityLevel,
    pub default_mode: LearningMode,
    pub timings: ChatTimings,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let api_base_url =
            lookup("API_BASE_URL").unwrap_or_else(|| "http://localhost:8000/api".to_string());
        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Session Defaults ---
        let default_clarity = match lookup("DEFAULT_CLARITY") {
            Some(raw) => raw.parse::<ClarityLevel>().map_err(|e| {
                ConfigError::InvalidValue("DEFAULT_CLARITY".to_string(), e.to_string())
            })?,
            None => ClarityLevel::default(),
        };
        let default_mode = match lookup("DEFAULT_MODE") {
            Some(raw) => raw.parse::<LearningMode>().map_err(|e| {
                ConfigError::InvalidValue("DEFAULT_MODE".to_string(), e.to_string())
            })?,
            None => LearningMode::default(),
        };

        // --- Reply Latencies ---
        let defaults = ChatTimings::default();
        let timings = ChatTimings {
            typing_delay: millis_var(&lookup, "TYPING_DELAY_MS", defaults.typing_delay)?,
            video_reveal_delay: millis_var(
                &lookup,
                "VIDEO_REVEAL_DELAY_MS",
                defaults.video_reveal_delay,
            )?,
            follow_up_delay: millis_var(&lookup, "FOLLOW_UP_DELAY_MS", defaults.follow_up_delay)?,
            resume_delay: millis_var(&lookup, "RESUME_DELAY_MS", defaults.resume_delay)?,
        };

        Ok(Self {
            bind_address,
            log_level,
            api_base_url,
            allowed_origin,
            default_clarity,
            default_mode,
            timings,
        })
    }

    /// The path the REST routes are nested under, taken from `api_base_url`.
    pub fn api_prefix(&self) -> String {
        let without_scheme = self
            .api_base_url
            .split_once("://")
            .map_or(self.api_base_url.as_str(), |(_, rest)| rest);
        let path = without_scheme
            .find('/')
            .map_or("", |idx| &without_scheme[idx..])
            .trim_end_matches('/');
        if path.is_empty() {
            DEFAULT_API_PREFIX.to_string()
        } else {
            path.to_string()
        }
    }
}

fn millis_var<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
