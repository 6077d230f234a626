//! Time and duration conversion utilities.
//!
//! Lyric documents carry timestamps as floating point seconds while the rest of
//! the crate works with [`Duration`]. The helpers here do the conversion with
//! explicit failure and saturation behavior.

use std::time::Duration;

/// Convert floating point seconds to a [`Duration`].
///
/// Returns `None` for negative, NaN or infinite input.
#[must_use]
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;

    /// Format as a `mm:ss.cc` clock, the same shape LRC timestamps use.
    ///
    /// Minutes are not wrapped into hours, so a 75 minute position renders as `75:00.00`.
    fn to_clock_string(&self) -> String;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn to_clock_string(&self) -> String {
        let total_centis = self.as_millis_u64() / 10;
        let minutes = total_centis / 6000;
        let seconds = (total_centis / 100) % 60;
        let centis = total_centis % 100;
        format!("{minutes:02}:{seconds:02}.{centis:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(duration_from_secs(0.1), Some(Duration::from_millis(100)));
        assert_eq!(duration_from_secs(60.0), Some(Duration::from_secs(60)));
        assert_eq!(duration_from_secs(0.0), Some(Duration::ZERO));
    }

    #[test]
    fn test_duration_from_secs_rejects_invalid() {
        assert_eq!(duration_from_secs(-0.5), None);
        assert_eq!(duration_from_secs(f64::NAN), None);
        assert_eq!(duration_from_secs(f64::INFINITY), None);
    }

    #[test]
    fn test_as_millis_u64() {
        let duration = Duration::from_millis(1234);
        assert_eq!(duration.as_millis_u64(), 1234);
        assert_eq!(Duration::ZERO.as_millis_u64(), 0);
    }

    #[test]
    fn test_to_clock_string() {
        assert_eq!(Duration::ZERO.to_clock_string(), "00:00.00");
        assert_eq!(Duration::from_millis(12_340).to_clock_string(), "00:12.34");
        assert_eq!(Duration::from_millis(83_500).to_clock_string(), "01:23.50");
        assert_eq!(Duration::from_secs(75 * 60).to_clock_string(), "75:00.00");
    }
}
