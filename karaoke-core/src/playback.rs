use std::fmt;

/// Player transport state.
///
/// `Idle` means the track has never started or was stopped/ended, so the next
/// start is a fresh start from the top. `Paused` means playback was suspended
/// mid-track and the next start resumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackState {
    #[must_use]
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Label for the start/pause control.
    #[must_use]
    pub const fn control_label(self) -> &'static str {
        match self {
            Self::Playing => "Pause",
            Self::Idle | Self::Paused => "Start",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
        assert!(!PlaybackState::default().is_playing());
    }

    #[test]
    fn test_control_label() {
        assert_eq!(PlaybackState::Idle.control_label(), "Start");
        assert_eq!(PlaybackState::Paused.control_label(), "Start");
        assert_eq!(PlaybackState::Playing.control_label(), "Pause");
    }

    #[test]
    fn test_display() {
        assert_eq!(PlaybackState::Playing.to_string(), "playing");
        assert_eq!(PlaybackState::Paused.to_string(), "paused");
    }
}
