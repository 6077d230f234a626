pub mod clock;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod loader;
pub mod lrc;
pub mod lyrics;
pub mod paths;
pub mod playback;
pub mod source;
pub mod time;

pub use clock::ClockSource;
pub use config::{
    AudioConfig, KaraokeConfig, LoggingConfig, LyricsConfig, PlayerConfig, CONFIG_TEMPLATE,
};
pub use controller::{PlaybackController, PlayerCommand, PlayerEvent, PlayerHandle};
pub use cursor::{CatchUp, LyricCursor, DEFAULT_END_GUARD};
pub use error::{CoreError, SourceError};
pub use loader::{load_track, loader_for, FileLoader, HttpLoader, LyricsFormat, LyricsLoader};
pub use lrc::parse_lrc;
pub use lyrics::{LyricLine, LyricTrack};
pub use paths::{config_dir, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use playback::PlaybackState;
pub use source::{AudioSource, PlayFuture, SourceEvent};
pub use time::DurationExt;
