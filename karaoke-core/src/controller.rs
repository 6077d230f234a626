//! Playback controller: transport state machine plus the lyric polling loop.

use crate::config::PlayerConfig;
use crate::cursor::LyricCursor;
use crate::error::SourceError;
use crate::lyrics::LyricTrack;
use crate::playback::PlaybackState;
use crate::source::{AudioSource, PlayFuture, SourceEvent};
use crate::time::DurationExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// User controls accepted by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Start when not playing, pause when playing
    Toggle,
    /// Stop and rewind to the top
    Stop,
    /// Stop and leave the run loop
    Shutdown,
}

/// Events published for display sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Transport state changed
    StateChanged { state: PlaybackState },
    /// Text to display changed; empty when no line is current
    LineChanged { text: String },
    /// A non-fatal failure (e.g. the source rejected playback)
    Error { message: String },
}

/// Cloneable handle for sending commands to a running controller.
///
/// Sends never fail loudly: once the controller has shut down, commands are
/// dropped and the methods return `false`.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    pub fn send(&self, command: PlayerCommand) -> bool {
        let delivered = self.tx.send(command).is_ok();
        if !delivered {
            debug!("Player is gone, dropping {:?}", command);
        }
        delivered
    }

    pub fn toggle(&self) -> bool {
        self.send(PlayerCommand::Toggle)
    }

    pub fn stop(&self) -> bool {
        self.send(PlayerCommand::Stop)
    }

    pub fn shutdown(&self) -> bool {
        self.send(PlayerCommand::Shutdown)
    }
}

/// Owns the audio source, the lyric cursor and the polling timer.
///
/// Every mutation happens on the task running [`run`](Self::run); other tasks
/// talk to it through a [`PlayerHandle`]. The timer only exists while the
/// state is `Playing`, so pausing, stopping or dropping the controller
/// cancels it.
pub struct PlaybackController<S: AudioSource> {
    source: S,
    cursor: LyricCursor,
    state: PlaybackState,
    poll_interval: Duration,
    ticker: Option<Interval>,
    pending_play: Option<PlayFuture>,
    commands: mpsc::UnboundedReceiver<PlayerCommand>,
    source_events: mpsc::UnboundedReceiver<SourceEvent>,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl<S: AudioSource> PlaybackController<S> {
    /// Create a controller in the `Idle` state with the source muted and the
    /// cursor at the top of `track`.
    #[must_use]
    pub fn new(
        mut source: S,
        track: Arc<LyricTrack>,
        config: &PlayerConfig,
    ) -> (Self, PlayerHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(64);
        let source_events = source.subscribe();
        source.set_muted(true);

        let cursor = LyricCursor::new(track)
            .with_catch_up(config.catch_up)
            .with_end_guard(config.end_guard());

        let controller = Self {
            source,
            cursor,
            state: PlaybackState::Idle,
            poll_interval: config.poll_interval(),
            ticker: None,
            pending_play: None,
            commands,
            source_events,
            event_tx,
        };

        (controller, PlayerHandle { tx })
    }

    /// Subscribe to display events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub const fn cursor(&self) -> &LyricCursor {
        &self.cursor
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Text currently shown by the display sink
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.cursor.display_text()
    }

    /// Whether a play request is still waiting for the source
    #[must_use]
    pub const fn is_play_pending(&self) -> bool {
        self.pending_play.is_some()
    }

    /// Whether the polling timer is armed
    #[must_use]
    pub const fn is_polling(&self) -> bool {
        self.ticker.is_some()
    }

    /// Request playback.
    ///
    /// From `Idle` this is a fresh start: the source is unmuted and the cursor
    /// rewound first. The state only becomes `Playing` once the source accepts
    /// the request.
    pub fn start(&mut self) {
        if self.state.is_playing() {
            debug!("Start ignored: already playing");
            return;
        }
        if self.pending_play.is_some() {
            debug!("Start ignored: play request already pending");
            return;
        }

        if self.state == PlaybackState::Idle {
            self.source.set_muted(false);
            self.reset_cursor();
        }

        info!(
            "Requesting playback at {}",
            self.source.current_time().to_clock_string()
        );
        self.pending_play = Some(self.source.play());
    }

    /// Pause the source and stop polling.
    ///
    /// A pending play request is abandoned. Pausing before playback ever
    /// started keeps the state `Idle`, so the next start is still a fresh start.
    pub fn pause(&mut self) {
        self.pending_play = None;
        self.ticker = None;
        self.source.pause();

        if self.state.is_playing() {
            info!(
                "Paused at {}",
                self.source.current_time().to_clock_string()
            );
            self.set_state(PlaybackState::Paused);
        }
    }

    pub fn toggle(&mut self) {
        if self.state.is_playing() {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Pause, rewind, mute, cancel polling and rewind the lyric cursor.
    pub fn stop(&mut self) {
        self.pending_play = None;
        self.ticker = None;
        self.source.pause();
        self.source.set_current_time(Duration::ZERO);
        self.source.set_muted(true);
        self.reset_cursor();
        // Notices queued by the old segment no longer apply
        while self.source_events.try_recv().is_ok() {}

        if self.state != PlaybackState::Idle {
            info!("Playback stopped");
        }
        self.set_state(PlaybackState::Idle);
    }

    /// Alias of [`stop`](Self::stop)
    pub fn reset(&mut self) {
        self.stop();
    }

    /// The source reached the natural end of the track.
    ///
    /// Only honoured while `Playing`; an end notice queued before a stop or
    /// pause belongs to a finished play segment.
    pub fn on_ended(&mut self) {
        if !self.state.is_playing() {
            debug!("Ignoring end of track while {}", self.state);
            return;
        }
        info!("Track ended");
        self.stop();
    }

    /// One polling step: feed the source's elapsed time to the lyric cursor.
    ///
    /// A tick that races with a still-pending play request sees a paused
    /// source and does nothing.
    pub fn tick(&mut self) {
        if self.source.is_paused() {
            debug!("Tick skipped: source not playing");
            return;
        }

        let elapsed = self.source.current_time();
        if self.cursor.advance(elapsed, self.source.duration()) {
            debug!(
                "Lyric line {:?} at {}",
                self.cursor.current_index(),
                elapsed.to_clock_string()
            );
            self.publish(PlayerEvent::LineChanged {
                text: self.cursor.display_text().to_owned(),
            });
        }
    }

    /// Wait for a pending play request and apply its outcome.
    ///
    /// [`run`](Self::run) does this as part of its loop; this is for driving
    /// the controller by hand.
    pub async fn resolve_play(&mut self) {
        if let Some(request) = self.pending_play.take() {
            let result = request.await;
            self.finish_play(result);
        }
    }

    fn finish_play(&mut self, result: Result<(), SourceError>) {
        match result {
            Ok(()) => {
                self.set_state(PlaybackState::Playing);
                let mut ticker = tokio::time::interval(self.poll_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.ticker = Some(ticker);
            }
            Err(e) => {
                warn!("Playback request failed: {}", e);
                self.publish(PlayerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    /// Run until cancelled, shut down, or every [`PlayerHandle`] is dropped.
    ///
    /// The source is stopped and rewound on the way out.
    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!(
            "Player ready: '{}' ({} lyric lines, polling every {:?})",
            self.cursor.track().song(),
            self.cursor.track().len(),
            self.poll_interval
        );
        self.publish(PlayerEvent::StateChanged { state: self.state });

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Player shutting down");
                    break;
                }
                command = self.commands.recv() => {
                    match command {
                        Some(PlayerCommand::Toggle) => self.toggle(),
                        Some(PlayerCommand::Stop) => self.stop(),
                        Some(PlayerCommand::Shutdown) | None => {
                            info!("Player shutting down");
                            break;
                        }
                    }
                }
                Some(event) = self.source_events.recv() => {
                    match event {
                        SourceEvent::Ended => self.on_ended(),
                    }
                }
                result = settle(&mut self.pending_play) => {
                    self.pending_play = None;
                    self.finish_play(result);
                }
                () = next_tick(&mut self.ticker) => self.tick(),
            }
        }

        self.stop();
    }

    fn reset_cursor(&mut self) {
        let had_line = self.cursor.current_line().is_some();
        self.cursor.reset();
        if had_line {
            self.publish(PlayerEvent::LineChanged {
                text: String::new(),
            });
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        debug!("Playback state {} -> {}", self.state, state);
        self.state = state;
        self.publish(PlayerEvent::StateChanged { state });
    }

    fn publish(&self, event: PlayerEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

async fn settle(pending: &mut Option<PlayFuture>) -> Result<(), SourceError> {
    match pending {
        Some(request) => request.await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
