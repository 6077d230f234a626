use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up rodio playback.
#[derive(Debug, Error)]
pub enum RodioSourceError {
    /// No usable audio output device.
    #[error("Failed to open audio output: {0}")]
    Output(#[from] rodio::StreamError),

    /// The audio file could not be opened.
    #[error("Failed to open audio file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The audio file could not be decoded.
    #[error("Failed to decode audio file: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
}

/// Convenience type alias for Results with `RodioSourceError`.
pub type Result<T> = std::result::Result<T, RodioSourceError>;
