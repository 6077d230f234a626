use crate::lyrics::{LyricLine, LyricTrack};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How far ahead the end of the track the last line is cleared.
///
/// The source's "ended" notification can arrive a little late, so the
/// display is emptied once playback is within this window of the end.
pub const DEFAULT_END_GUARD: Duration = Duration::from_millis(500);

/// What a single tick does when several lines are already due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchUp {
    /// Promote one line per tick; skipped lines each show for one tick.
    #[default]
    Step,
    /// Promote every due line in one tick; only the latest due line shows.
    Latest,
}

/// Cursor over a [`LyricTrack`] tracking the current and next line by index.
///
/// Only moves forward. Elapsed time fed to [`advance`](Self::advance) is
/// assumed to be non-decreasing until the next [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct LyricCursor {
    track: Arc<LyricTrack>,
    current: Option<usize>,
    next: Option<usize>,
    catch_up: CatchUp,
    end_guard: Duration,
}

impl LyricCursor {
    /// Create a cursor in its initial state: nothing current, first line next.
    #[must_use]
    pub fn new(track: Arc<LyricTrack>) -> Self {
        let mut cursor = Self {
            track,
            current: None,
            next: None,
            catch_up: CatchUp::default(),
            end_guard: DEFAULT_END_GUARD,
        };
        cursor.reset();
        cursor
    }

    #[must_use]
    pub const fn with_catch_up(mut self, catch_up: CatchUp) -> Self {
        self.catch_up = catch_up;
        self
    }

    #[must_use]
    pub const fn with_end_guard(mut self, end_guard: Duration) -> Self {
        self.end_guard = end_guard;
        self
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        self.current = None;
        self.next = (!self.track.is_empty()).then_some(0);
    }

    /// Advance against the elapsed playback time.
    ///
    /// Returns `true` if the current line changed (including being cleared at
    /// the end of the track). `duration` is the total track length when known.
    pub fn advance(&mut self, elapsed: Duration, duration: Option<Duration>) -> bool {
        if self.track.is_empty() {
            return false;
        }

        if self.promote_next(elapsed) {
            if self.catch_up == CatchUp::Latest {
                while self.promote_next(elapsed) {}
            }
            return true;
        }

        let near_end = duration.is_some_and(|d| elapsed >= d.saturating_sub(self.end_guard));
        if self.next.is_none() && self.current.is_some() && near_end {
            self.current = None;
            return true;
        }

        false
    }

    fn promote_next(&mut self, elapsed: Duration) -> bool {
        let Some(next) = self.next else {
            return false;
        };
        if self.track.get(next).is_none_or(|line| line.time > elapsed) {
            return false;
        }

        self.current = Some(next);
        self.next = Some(next + 1).filter(|&i| i < self.track.len());
        true
    }

    #[must_use]
    pub fn current_line(&self) -> Option<&LyricLine> {
        self.current.and_then(|i| self.track.get(i))
    }

    #[must_use]
    pub fn next_line(&self) -> Option<&LyricLine> {
        self.next.and_then(|i| self.track.get(i))
    }

    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub const fn next_index(&self) -> Option<usize> {
        self.next
    }

    /// Text to render: the current line, or empty when there is none.
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.current_line().map_or("", |line| line.text.as_str())
    }

    #[must_use]
    pub fn track(&self) -> &LyricTrack {
        &self.track
    }
}
