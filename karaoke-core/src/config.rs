use crate::cursor::{CatchUp, DEFAULT_END_GUARD};
use crate::error::{CoreError, Result};
use crate::time::DurationExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest accepted polling period
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Longest accepted polling period; longer gaps make lyric changes visibly late
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KaraokeConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Lyric polling period in milliseconds, clamped to 50..=250
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How long before the end of the track the last line is cleared
    #[serde(default = "default_end_guard")]
    pub end_guard_ms: u64,
    /// What one tick does when several lines are already due
    #[serde(default)]
    pub catch_up: CatchUp,
}

const fn default_poll_interval() -> u64 {
    100
}

fn default_end_guard() -> u64 {
    DEFAULT_END_GUARD.as_millis_u64()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            end_guard_ms: default_end_guard(),
            catch_up: CatchUp::default(),
        }
    }
}

impl PlayerConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
    }

    #[must_use]
    pub const fn end_guard(&self) -> Duration {
        Duration::from_millis(self.end_guard_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Lyric document location: a file path or an http(s) URL.
    /// Files ending in `.lrc` are read as LRC, everything else as JSON.
    #[serde(default = "default_lyrics_source")]
    pub source: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_lyrics_source() -> String {
    "lyrics.json".to_string()
}

const fn default_timeout() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            source: default_lyrics_source(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_audio_path")]
    pub path: PathBuf,
    /// Output volume when unmuted, 0.0..=1.0
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_audio_path() -> PathBuf {
    PathBuf::from("track.mp3")
}

const fn default_volume() -> f32 {
    1.0
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            path: default_audio_path(),
            volume: default_volume(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/karaoke/karaoke.log`
    #[serde(default)]
    pub enabled: bool,
}

impl KaraokeConfig {
    /// Get the config file path (~/.config/karaoke/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default location or create a template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `path`, writing the template there if it does not exist
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        Self::load_from(path)
    }

    /// Load config from an existing file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML config string
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.lyrics.source.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.source must not be empty".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(CoreError::ConfigInvalid {
                message: format!("audio.volume must be between 0.0 and 1.0 (got {})", self.audio.volume),
            });
        }
        if self.player.poll_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "player.poll_interval_ms must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

/// Commented template written on first run
pub const CONFIG_TEMPLATE: &str = r#"# Karaoke Configuration
# ~/.config/karaoke/config.toml

[player]
# How often the lyric display is synchronized with playback (50-250 ms)
poll_interval_ms = 100
# The last line is cleared this long before the track ends
end_guard_ms = 500
# When a tick finds several lines already due:
#   "step"   - show each skipped line for one tick
#   "latest" - jump straight to the latest due line
catch_up = "step"

[lyrics]
# Path or http(s) URL of the lyric document.
# JSON: { "song": "...", "lines": [{ "time": 0.1, "text": "..." }] }
# Files ending in .lrc are read as LRC.
source = "lyrics.json"
timeout_secs = 10
max_retries = 3

[audio]
path = "track.mp3"
volume = 1.0

[logging]
# Also write logs to ~/.config/karaoke/karaoke.log
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = KaraokeConfig::from_toml_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.player.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.player.end_guard(), Duration::from_millis(500));
        assert_eq!(config.player.catch_up, CatchUp::Step);
        assert_eq!(config.lyrics.source, "lyrics.json");
        assert_eq!(config.audio.path, PathBuf::from("track.mp3"));
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = KaraokeConfig::from_toml_str("").unwrap();
        assert_eq!(config.player.poll_interval_ms, 100);
        assert_eq!(config.lyrics.max_retries, 3);
        assert!((config.audio.volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_catch_up_policy_parses() {
        let config = KaraokeConfig::from_toml_str("[player]\ncatch_up = \"latest\"").unwrap();
        assert_eq!(config.player.catch_up, CatchUp::Latest);
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        let fast = PlayerConfig {
            poll_interval_ms: 5,
            ..Default::default()
        };
        assert_eq!(fast.poll_interval(), MIN_POLL_INTERVAL);

        let slow = PlayerConfig {
            poll_interval_ms: 2000,
            ..Default::default()
        };
        assert_eq!(slow.poll_interval(), MAX_POLL_INTERVAL);
    }

    #[test]
    fn test_validation_errors() {
        let err = KaraokeConfig::from_toml_str("[audio]\nvolume = 1.5").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));

        let err = KaraokeConfig::from_toml_str("[lyrics]\nsource = \"  \"").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));

        let err = KaraokeConfig::from_toml_str("[player]\npoll_interval_ms = 0").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_parse_error() {
        let err = KaraokeConfig::from_toml_str("[player\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_load_or_create_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let err = KaraokeConfig::load_or_create_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);

        let config = KaraokeConfig::load_or_create_at(&path).unwrap();
        assert_eq!(config.lyrics.source, "lyrics.json");
    }
}
