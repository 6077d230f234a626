//! [`AudioSource`] implementation playing a file through a `rodio` sink.

use crate::error::{RodioSourceError, Result};
use futures::future::{self, FutureExt};
use karaoke_core::{AudioSource, DurationExt, PlayFuture, SourceError, SourceEvent};
use lofty::file::AudioFile;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info};

/// How often a playing sink is checked for having run dry
const END_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Plays one audio file on the default output device.
///
/// Rewinding reopens the file into a fresh sink at the requested position;
/// `skip_duration` is the seeking primitive. The output stream is not `Send`,
/// so this source lives on the thread that created it.
pub struct RodioSource {
    stream: OutputStream,
    sink: Arc<Sink>,
    path: PathBuf,
    /// Position the current sink started from
    offset: Duration,
    duration: Option<Duration>,
    volume: f32,
    muted: bool,
    events: Option<mpsc::UnboundedSender<SourceEvent>>,
    /// Stops the end-of-track watcher when dropped
    end_watch: Option<DropGuard>,
}

impl RodioSource {
    /// Open `path` on the default output device, paused and muted.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no output device or the file cannot be
    /// opened or decoded.
    pub fn open(path: impl Into<PathBuf>, volume: f32) -> Result<Self> {
        let path = path.into();

        let mut stream = OutputStreamBuilder::open_default_stream()?;
        // rodio logs to stderr when the stream is dropped
        stream.log_on_drop(false);

        let duration = probe_duration(&path);
        let sink = load_sink(&stream, &path, Duration::ZERO)?;
        sink.set_volume(0.0);

        info!(
            "Opened {} ({})",
            path.display(),
            duration.map_or_else(|| "unknown length".to_string(), |d| d.to_clock_string())
        );

        Ok(Self {
            stream,
            sink: Arc::new(sink),
            path,
            offset: Duration::ZERO,
            duration,
            volume: volume.clamp(0.0, 1.0),
            muted: true,
            events: None,
            end_watch: None,
        })
    }

    fn effective_volume(&self) -> f32 {
        output_volume(self.volume, self.muted)
    }

    fn reload_at(&mut self, position: Duration) -> Result<()> {
        self.end_watch = None;

        let sink = load_sink(&self.stream, &self.path, position)?;
        sink.set_volume(self.effective_volume());

        self.sink.stop();
        self.sink = Arc::new(sink);
        self.offset = position;
        Ok(())
    }

    /// Report `SourceEvent::Ended` once the sink runs out of audio
    fn watch_for_end(&mut self) {
        self.end_watch = None;
        let Some(events) = self.events.clone() else {
            return;
        };

        let sink = Arc::clone(&self.sink);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(END_POLL_INTERVAL);
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if sink.empty() {
                            debug!("Sink drained");
                            let _ = events.send(SourceEvent::Ended);
                            break;
                        }
                    }
                }
            }
        });
        self.end_watch = Some(token.drop_guard());
    }
}

impl AudioSource for RodioSource {
    fn play(&mut self) -> PlayFuture {
        let outcome = check_playable(self.sink.empty());
        if outcome.is_ok() {
            self.sink.play();
            self.watch_for_end();
        }
        future::ready(outcome).boxed_local()
    }

    fn pause(&mut self) {
        self.end_watch = None;
        self.sink.pause();
    }

    fn current_time(&self) -> Duration {
        self.offset + self.sink.get_pos()
    }

    fn set_current_time(&mut self, position: Duration) {
        if !needs_reload(self.sink.empty(), self.current_time(), position) {
            return;
        }
        if let Err(e) = self.reload_at(position) {
            error!("Failed to rewind {}: {}", self.path.display(), e);
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.sink.set_volume(self.effective_volume());
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused() || self.sink.empty()
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SourceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }
}

/// Volume sent to the sink; muting keeps the configured level for later
fn output_volume(volume: f32, muted: bool) -> f32 {
    if muted {
        0.0
    } else {
        volume
    }
}

/// A drained sink has nothing left to play until it is reloaded
fn check_playable(drained: bool) -> std::result::Result<(), SourceError> {
    if drained {
        Err(SourceError::AtEnd)
    } else {
        Ok(())
    }
}

/// Seeking reopens the file, so skip it when the sink is already there
fn needs_reload(drained: bool, current: Duration, target: Duration) -> bool {
    drained || current != target
}

/// Create a paused sink playing `path` from `start_at`
fn load_sink(stream: &OutputStream, path: &Path, start_at: Duration) -> Result<Sink> {
    let file = File::open(path).map_err(|source| RodioSourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoder = Decoder::new(BufReader::new(file))?;

    let sink = Sink::connect_new(stream.mixer());
    sink.pause();
    sink.append(decoder.skip_duration(start_at));
    Ok(sink)
}

/// Read the track length from the file's properties
fn probe_duration(path: &Path) -> Option<Duration> {
    match lofty::read_from_path(path) {
        Ok(tagged) => Some(tagged.properties().duration()).filter(|d| !d.is_zero()),
        Err(e) => {
            debug!("Could not read duration of {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_volume_follows_mute() {
        assert!(output_volume(0.8, true).abs() < f32::EPSILON);
        assert!((output_volume(0.8, false) - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_drained_sink_is_not_playable() {
        assert_eq!(check_playable(true), Err(SourceError::AtEnd));
        assert_eq!(check_playable(false), Ok(()));
    }

    #[test]
    fn test_needs_reload() {
        let start = Duration::ZERO;
        let later = Duration::from_secs(42);

        // Already at the requested spot
        assert!(!needs_reload(false, start, start));
        assert!(!needs_reload(false, later, later));

        assert!(needs_reload(false, later, start));
        // A drained sink must be refilled even at the same position
        assert!(needs_reload(true, start, start));
    }

    #[test]
    fn test_probe_duration_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(probe_duration(&dir.path().join("missing.mp3")), None);
    }

    #[test]
    fn test_probe_duration_not_audio() {
        let file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        std::fs::write(file.path(), b"definitely not an mp3").unwrap();
        assert_eq!(probe_duration(file.path()), None);
    }

    #[test]
    fn test_open_error_names_path() {
        let err = RodioSourceError::Open {
            path: PathBuf::from("/music/belair.mp3"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/music/belair.mp3"));
    }
}
