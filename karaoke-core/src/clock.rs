//! Silent clock-driven audio source.
//!
//! Plays nothing; elapsed time simply follows the tokio clock. Useful for
//! rehearsing lyric timing without an output device and for tests, where
//! tokio's paused clock makes it fully deterministic.

use crate::error::SourceError;
use crate::source::{AudioSource, PlayFuture, SourceEvent};
use futures::future::{self, FutureExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

pub struct ClockSource {
    duration: Duration,
    /// Position at the last play/pause/seek
    position: Duration,
    /// When the current play segment began; `None` while paused
    started_at: Option<Instant>,
    muted: bool,
    events: Option<mpsc::UnboundedSender<SourceEvent>>,
    /// Cancels the pending end-of-track notification when dropped
    end_timer: Option<DropGuard>,
}

impl ClockSource {
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            position: Duration::ZERO,
            started_at: None,
            muted: true,
            events: None,
            end_timer: None,
        }
    }

    fn arm_end_timer(&mut self) {
        self.end_timer = None;
        let Some(events) = self.events.clone() else {
            return;
        };

        let remaining = self.duration.saturating_sub(self.position);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(remaining) => {
                    debug!("Clock source reached the end of the track");
                    let _ = events.send(SourceEvent::Ended);
                }
            }
        });
        self.end_timer = Some(token.drop_guard());
    }
}

impl AudioSource for ClockSource {
    fn play(&mut self) -> PlayFuture {
        if self.position >= self.duration {
            return future::ready(Err(SourceError::AtEnd)).boxed_local();
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
            self.arm_end_timer();
        }
        future::ready(Ok(())).boxed_local()
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.started_at = None;
        self.end_timer = None;
    }

    fn current_time(&self) -> Duration {
        let elapsed = self.started_at.map_or(Duration::ZERO, |started| started.elapsed());
        (self.position + elapsed).min(self.duration)
    }

    fn set_current_time(&mut self, position: Duration) {
        self.position = position.min(self.duration);
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
            self.arm_end_timer();
        }
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.duration)
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn is_paused(&self) -> bool {
        self.started_at.is_none() || self.current_time() >= self.duration
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SourceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_tokio_time() {
        let mut source = ClockSource::new(Duration::from_secs(10));
        assert!(source.is_paused());
        assert!(source.is_muted());

        source.play().await.unwrap();
        assert!(!source.is_paused());

        tokio::time::advance(Duration::from_millis(2500)).await;
        assert_eq!(source.current_time(), Duration::from_millis(2500));

        source.pause();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(source.current_time(), Duration::from_millis(2500));
        assert!(source.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_emits_ended() {
        let mut source = ClockSource::new(Duration::from_secs(2));
        let mut events = source.subscribe();

        source.play().await.unwrap();
        assert_eq!(events.recv().await, Some(SourceEvent::Ended));
        assert_eq!(source.current_time(), Duration::from_secs(2));
        assert!(source.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_end_notification() {
        let mut source = ClockSource::new(Duration::from_secs(2));
        let mut events = source.subscribe();

        source.play().await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        source.pause();
        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_at_end_is_rejected_until_rewound() {
        let mut source = ClockSource::new(Duration::from_secs(1));
        source.set_current_time(Duration::from_secs(5));
        assert_eq!(source.current_time(), Duration::from_secs(1));
        assert_eq!(source.play().await, Err(SourceError::AtEnd));

        source.set_current_time(Duration::ZERO);
        assert_eq!(source.play().await, Ok(()));
    }
}
