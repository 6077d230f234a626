//! Lyric document loading from files or over HTTP.

use crate::config::LyricsConfig;
use crate::error::{CoreError, Result};
use crate::lrc::parse_lrc;
use crate::lyrics::LyricTrack;
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Lyric document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsFormat {
    /// `{ "song": ..., "lines": [{ "time", "text" }] }`
    Json,
    /// `[mm:ss.xx]text`
    Lrc,
}

impl LyricsFormat {
    /// Pick the format from a path or URL: `.lrc` is LRC, anything else JSON.
    #[must_use]
    pub fn from_location(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        if path.to_ascii_lowercase().ends_with(".lrc") {
            Self::Lrc
        } else {
            Self::Json
        }
    }

    /// Parse a document in this format.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn parse(self, input: &str) -> Result<LyricTrack> {
        match self {
            Self::Json => LyricTrack::from_json(input),
            Self::Lrc => parse_lrc(input),
        }
    }
}

/// Trait for lyric document loaders
#[async_trait]
pub trait LyricsLoader: Send + Sync {
    /// Human-readable location for logging
    fn location(&self) -> &str;

    /// Fetch and parse the lyric document
    async fn load(&self) -> Result<LyricTrack>;
}

/// Loads a lyric document from the local filesystem
pub struct FileLoader {
    path: PathBuf,
    location: String,
    format: LyricsFormat,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = path.display().to_string();
        let format = LyricsFormat::from_location(&location);
        Self {
            path,
            location,
            format,
        }
    }
}

#[async_trait]
impl LyricsLoader for FileLoader {
    fn location(&self) -> &str {
        &self.location
    }

    async fn load(&self) -> Result<LyricTrack> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        self.format.parse(&content)
    }
}

/// Loads a lyric document over HTTP with timeout and retries
pub struct HttpLoader {
    client: ClientWithMiddleware,
    url: String,
    format: LyricsFormat,
}

impl HttpLoader {
    /// Create a loader for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self> {
        let url = url.into();

        let base_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("karaoke/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let format = LyricsFormat::from_location(&url);
        Ok(Self {
            client,
            url,
            format,
        })
    }
}

#[async_trait]
impl LyricsLoader for HttpLoader {
    fn location(&self) -> &str {
        &self.url
    }

    async fn load(&self) -> Result<LyricTrack> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(CoreError::LyricsHttpStatus {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        self.format.parse(&body)
    }
}

/// Whether a lyrics source names an http(s) URL rather than a file
#[must_use]
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Build the loader matching the configured lyrics source.
///
/// # Errors
///
/// Returns an error if an HTTP client is needed and cannot be created.
pub fn loader_for(config: &LyricsConfig) -> Result<Box<dyn LyricsLoader>> {
    if is_remote(&config.source) {
        let loader = HttpLoader::new(
            &config.source,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )?;
        Ok(Box::new(loader))
    } else {
        Ok(Box::new(FileLoader::new(&config.source)))
    }
}

/// Load the lyric track once at startup.
///
/// Failures are logged and produce an empty track; the player then runs with
/// no lyrics instead of refusing to start.
pub async fn load_track(loader: &dyn LyricsLoader) -> LyricTrack {
    info!("Loading lyrics from {}", loader.location());

    match loader.load().await {
        Ok(track) => {
            info!(
                "Loaded lyrics for '{}' ({} lines)",
                track.song(),
                track.len()
            );
            track
        }
        Err(e) => {
            error!("Error loading lyrics from {}: {}", loader.location(), e);
            LyricTrack::default()
        }
    }
}
