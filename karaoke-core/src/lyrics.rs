use crate::error::{CoreError, Result};
use crate::time::duration_from_secs;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// A single lyric line with the playback time at which it becomes current
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub time: Duration,
    pub text: String,
}

impl LyricLine {
    pub fn new(time: Duration, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// An ordered, immutable lyric timeline for one song.
///
/// Lines are expected in ascending time order. The JSON loader keeps the
/// document order as-is and only warns when it is out of order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricTrack {
    song: String,
    lines: Vec<LyricLine>,
}

/// Lyric document as served to the player: `{ "song": ..., "lines": [{ "time", "text" }] }`
#[derive(Debug, Deserialize)]
struct LyricsDocument {
    #[serde(default)]
    song: String,
    #[serde(default)]
    lines: Vec<DocumentLine>,
}

#[derive(Debug, Deserialize)]
struct DocumentLine {
    time: f64,
    #[serde(default)]
    text: String,
}

impl LyricTrack {
    pub fn new(song: impl Into<String>, lines: Vec<LyricLine>) -> Self {
        let track = Self {
            song: song.into(),
            lines,
        };
        if !track.lines.is_sorted_by_key(|line| line.time) {
            warn!(
                "Lyric lines for '{}' are not in ascending time order; display order follows the document",
                track.song
            );
        }
        track
    }

    /// Parse a JSON lyric document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON of the expected shape,
    /// or if any line carries a negative or non-finite time.
    pub fn from_json(input: &str) -> Result<Self> {
        let document: LyricsDocument = serde_json::from_str(input)?;

        let lines = document
            .lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                let time =
                    duration_from_secs(line.time).ok_or_else(|| CoreError::InvalidLyricLine {
                        index,
                        reason: format!("time must be a finite, non-negative number of seconds (got {})", line.time),
                    })?;
                Ok(LyricLine::new(time, line.text))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(document.song, lines))
    }

    #[must_use]
    pub fn song(&self) -> &str {
        &self.song
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "song": "Test Song",
        "lines": [
            { "time": 0.1, "text": "Line 1" },
            { "time": 2.0, "text": "Line 2" },
            { "time": 4.0, "text": "Line 3" },
            { "time": 60.0, "text": "End." }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let track = LyricTrack::from_json(DOCUMENT).unwrap();
        assert_eq!(track.song(), "Test Song");
        assert_eq!(track.len(), 4);
        assert_eq!(track.lines()[0], LyricLine::new(Duration::from_millis(100), "Line 1"));
        assert_eq!(track.lines()[3], LyricLine::new(Duration::from_secs(60), "End."));
    }

    #[test]
    fn test_missing_text_is_empty() {
        let track = LyricTrack::from_json(r#"{ "song": "s", "lines": [{ "time": 1 }] }"#).unwrap();
        assert_eq!(track.lines()[0].text, "");
    }

    #[test]
    fn test_missing_lines_is_empty_track() {
        let track = LyricTrack::from_json(r#"{ "song": "Instrumental" }"#).unwrap();
        assert!(track.is_empty());
        assert_eq!(track.song(), "Instrumental");
    }

    #[test]
    fn test_negative_time_rejected() {
        let err = LyricTrack::from_json(
            r#"{ "song": "s", "lines": [{ "time": 1, "text": "a" }, { "time": -2, "text": "b" }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidLyricLine { index: 1, .. }));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = LyricTrack::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CoreError::LyricsParseError(_)));
    }

    #[test]
    fn test_document_order_is_kept() {
        let track = LyricTrack::from_json(
            r#"{ "lines": [{ "time": 5, "text": "late" }, { "time": 1, "text": "early" }] }"#,
        )
        .unwrap();
        assert_eq!(track.lines()[0].text, "late");
        assert_eq!(track.lines()[1].text, "early");
    }
}
