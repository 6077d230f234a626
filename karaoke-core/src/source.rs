//! Audio source abstraction driven by the playback controller.

use crate::error::SourceError;
use futures::future::LocalBoxFuture;
use std::time::Duration;
use tokio::sync::mpsc;

/// Pending result of a play request.
///
/// The future must not borrow the source: the controller keeps polling it
/// alongside its timer and user commands until it settles.
pub type PlayFuture = LocalBoxFuture<'static, Result<(), SourceError>>;

/// Notifications pushed by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    /// Playback reached the natural end of the media.
    Ended,
}

/// A single playback source (an audio file, a stream, a silent clock).
///
/// Only the [`PlaybackController`](crate::PlaybackController) mutates the
/// source. Implementations do not need to be `Send`; the controller runs on
/// the thread that owns the source.
pub trait AudioSource {
    /// Request playback. Completes once the source is actually playing, or
    /// with an error if it refuses.
    fn play(&mut self) -> PlayFuture;

    fn pause(&mut self);

    /// Elapsed playback position.
    fn current_time(&self) -> Duration;

    fn set_current_time(&mut self, position: Duration);

    /// Total media length, if known.
    fn duration(&self) -> Option<Duration>;

    fn set_muted(&mut self, muted: bool);

    fn is_muted(&self) -> bool;

    /// `true` until playback has actually begun, and again after pause or end.
    fn is_paused(&self) -> bool;

    /// Subscribe to source notifications. A new subscription replaces the previous one.
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SourceEvent>;
}
