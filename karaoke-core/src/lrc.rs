//! LRC lyric files (`[mm:ss.xx]text`) converted into a [`LyricTrack`].
//!
//! Supports the `[ti:]` and `[offset:]` ID tags, lines carrying several
//! timestamps, and both `mm:ss.xx` and `mm:ss:xx` timestamp shapes. Unknown ID
//! tags and untimed lines are skipped.

use crate::error::{CoreError, Result};
use crate::lyrics::{LyricLine, LyricTrack};
use crate::time::duration_from_secs;
use std::time::Duration;

/// Parse an LRC string into a lyric track sorted by time.
///
/// # Errors
///
/// Returns an error if the input contains no timed lyric lines.
pub fn parse_lrc(input: &str) -> Result<LyricTrack> {
    let mut title = String::new();
    let mut offset_ms: i64 = 0;
    let mut lines = Vec::new();

    for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some((tag, value)) = parse_id_tag(line) {
            match tag.to_ascii_lowercase().as_str() {
                "ti" => value.clone_into(&mut title),
                "offset" => offset_ms = value.parse().unwrap_or(0),
                _ => {}
            }
            continue;
        }

        let (timestamps, text) = split_timestamps(line);
        lines.extend(
            timestamps
                .into_iter()
                .map(|time| LyricLine::new(apply_offset(time, offset_ms), text)),
        );
    }

    if lines.is_empty() {
        return Err(CoreError::LrcParseError {
            reason: "no timed lyric lines found".into(),
        });
    }

    // Stable sort keeps the written order of lines sharing a timestamp
    lines.sort_by_key(|l| l.time);

    Ok(LyricTrack::new(title, lines))
}

/// Parse an ID tag like `[ti:Title]`; timestamps are not tags.
fn parse_id_tag(line: &str) -> Option<(&str, &str)> {
    let content = line.strip_prefix('[')?.strip_suffix(']')?;
    let (tag, value) = content.split_once(':')?;
    if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((tag.trim(), value.trim()))
}

/// Strip every leading `[timestamp]` and return them with the remaining text.
fn split_timestamps(line: &str) -> (Vec<Duration>, &str) {
    let mut timestamps = Vec::new();
    let mut remaining = line;

    while let Some(rest) = remaining.strip_prefix('[') {
        let Some((content, after)) = rest.split_once(']') else {
            break;
        };
        let Some(time) = parse_timestamp(content) else {
            break;
        };
        timestamps.push(time);
        remaining = after;
    }

    (timestamps, remaining.trim())
}

/// Parse `mm:ss`, `mm:ss.xx` or `mm:ss:xx` (hundredths).
fn parse_timestamp(s: &str) -> Option<Duration> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    match parts.as_slice() {
        [minutes, seconds] => {
            let minutes: u32 = minutes.parse().ok()?;
            let seconds: f64 = seconds.parse().ok()?;
            duration_from_secs(f64::from(minutes) * 60.0 + seconds)
        }
        [minutes, seconds, hundredths] => {
            let minutes: u64 = minutes.parse().ok()?;
            let seconds: u64 = seconds.parse().ok()?;
            let hundredths: u64 = hundredths.parse().ok()?;
            let millis = minutes
                .checked_mul(60_000)?
                .checked_add(seconds.checked_mul(1000)?)?
                .checked_add(hundredths.checked_mul(10)?)?;
            Some(Duration::from_millis(millis))
        }
        _ => None,
    }
}

/// Apply a millisecond offset (can be negative); times saturate at zero.
fn apply_offset(time: Duration, offset_ms: i64) -> Duration {
    let shift = Duration::from_millis(offset_ms.unsigned_abs());
    if offset_ms >= 0 {
        time.saturating_add(shift)
    } else {
        time.saturating_sub(shift)
    }
}
