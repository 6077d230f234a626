use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please edit it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Lyrics errors
    #[error("Invalid lyric line {index}: {reason}")]
    InvalidLyricLine { index: usize, reason: String },

    #[error("Failed to parse lyrics document: {0}")]
    LyricsParseError(#[from] serde_json::Error),

    #[error("Failed to parse LRC: {reason}")]
    LrcParseError { reason: String },

    #[error("Lyrics request to {url} returned status {status}")]
    LyricsHttpStatus { url: String, status: u16 },

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network request failed after retries: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors reported by an [`AudioSource`](crate::AudioSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source refused to start playback (e.g. no output device, autoplay policy).
    #[error("Playback rejected: {reason}")]
    PlayRejected { reason: String },

    /// The source has reached the end of its media and must be rewound first.
    #[error("Playback rejected: source is at the end of the track")]
    AtEnd,
}

pub type Result<T> = std::result::Result<T, CoreError>;
