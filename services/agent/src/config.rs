use crate::audio::playback::PlaybackMode;
use openai_realtime::config::{DEFAULT_REALTIME_MODEL, DEFAULT_TRANSCRIPTION_MODEL};
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug)]
pub struct Config {
    pub openai_api_key: SecretString,
    pub realtime_model: String,
    pub transcription_model: String,
    /// Overrides the agent's own voice when set.
    pub voice: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    /// Program used for both capture and playback.
    pub sox_path: String,
    pub playback_mode: PlaybackMode,
    pub playback_file: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| {
                ConfigError::MissingVar(
                    "OPENAI_API_KEY is not set. Please set it in your environment variables."
                        .to_string(),
                )
            })?;

        let realtime_model = std::env::var("REALTIME_MODEL")
            .unwrap_or_else(|_| DEFAULT_REALTIME_MODEL.to_string());
        let transcription_model = std::env::var("TRANSCRIPTION_MODEL")
            .unwrap_or_else(|_| DEFAULT_TRANSCRIPTION_MODEL.to_string());
        let voice = std::env::var("AGENT_VOICE")
            .ok()
            .filter(|v| !v.is_empty());
        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let sox_path = std::env::var("SOX_PATH").unwrap_or_else(|_| "sox".to_string());

        let playback_mode = match std::env::var("PLAYBACK_MODE") {
            Ok(raw) => raw
                .parse::<PlaybackMode>()
                .map_err(|e| ConfigError::InvalidValue("PLAYBACK_MODE".to_string(), e))?,
            Err(_) => PlaybackMode::default(),
        };
        let playback_file = std::env::var("PLAYBACK_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("agent_output.pcm"));

        Ok(Self {
            openai_api_key,
            realtime_model,
            transcription_model,
            voice,
            chat_model,
            log_level,
            sox_path,
            playback_mode,
            playback_file,
        })
    }
}
