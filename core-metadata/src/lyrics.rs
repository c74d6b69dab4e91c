//! # Synchronized Lyrics
//!
//! A song's lyrics are a list of [`LyricLine`]s, each starting at a point in
//! the track. Line *i* is active while `lines[i].time <= t < lines[i + 1].time`;
//! the last line stays active until the track ends.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_metadata::lyrics::{LyricCursor, LyricSheet};
//!
//! let sheet = LyricSheet::new(song.lyrics)?;
//! let mut cursor = LyricCursor::new();
//!
//! // On every time update from the player
//! if cursor.update(sheet.lines(), position_secs) {
//!     scroll_to(cursor.current());
//! }
//! ```
//!
//! [`active_line_index`] works on any slice and assumes ascending times; it
//! does not reorder or validate. Use [`LyricSheet::new`] to reject bad input
//! or [`LyricSheet::sorted`] to accept it in any order.

use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, Result};

/// Characters stripped from a tapped word before lookup
const WORD_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Shortest word (in characters) worth a dictionary lookup, exclusive
const MIN_LOOKUP_CHARS: usize = 2;

/// One timed line of lyrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Seconds from track start
    pub time: f64,
    /// Text in the song's language
    pub original: String,
    /// Text in the learner's language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl LyricLine {
    pub fn new(time: f64, original: impl Into<String>) -> Self {
        Self {
            time,
            original: original.into(),
            translation: None,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }
}

/// Index of the line active at `time` (seconds).
///
/// Scans from the start and returns the first line whose interval contains
/// `time`. Returns `None` for an empty list, for a time before the first
/// line, and for NaN. Positive infinity is past the end and selects the
/// last line.
pub fn active_line_index(lines: &[LyricLine], time: f64) -> Option<usize> {
    if time.is_nan() {
        return None;
    }

    (0..lines.len()).find(|&i| {
        time >= lines[i].time && lines.get(i + 1).map_or(true, |next| time < next.time)
    })
}

fn check_time(index: usize, line: &LyricLine) -> Result<()> {
    if !line.time.is_finite() {
        return Err(MetadataError::InvalidLyrics {
            index,
            reason: format!("time {} is not a finite number", line.time),
        });
    }
    if line.time < 0.0 {
        return Err(MetadataError::InvalidLyrics {
            index,
            reason: format!("time {} is negative", line.time),
        });
    }
    Ok(())
}

/// Lyrics with finite, non-negative, ascending times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricSheet {
    lines: Vec<LyricLine>,
}

impl LyricSheet {
    /// Validate lines as given. Equal consecutive times are allowed; the
    /// later line of such a pair is never active.
    pub fn new(lines: Vec<LyricLine>) -> Result<Self> {
        for (index, line) in lines.iter().enumerate() {
            check_time(index, line)?;
            if index > 0 && line.time < lines[index - 1].time {
                return Err(MetadataError::InvalidLyrics {
                    index,
                    reason: format!(
                        "time {} is earlier than the previous line ({})",
                        line.time,
                        lines[index - 1].time
                    ),
                });
            }
        }
        Ok(Self { lines })
    }

    /// Validate times, then order lines by time. Lines sharing a time keep
    /// their input order.
    pub fn sorted(mut lines: Vec<LyricLine>) -> Result<Self> {
        for (index, line) in lines.iter().enumerate() {
            check_time(index, line)?;
        }
        lines.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { lines })
    }

    pub fn active_index(&self, time: f64) -> Option<usize> {
        active_line_index(&self.lines, time)
    }

    pub fn active_line(&self, time: f64) -> Option<&LyricLine> {
        self.active_index(time).map(|i| &self.lines[i])
    }

    /// True when there is nothing to display ("no lyrics available").
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<LyricLine> {
        self.lines
    }
}

/// Tracks the active line across time updates.
///
/// The player reports time many times per second; the view only needs to
/// react (scroll, highlight) when the active line actually changes.
#[derive(Debug, Clone, Default)]
pub struct LyricCursor {
    current: Option<usize>,
}

impl LyricCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute for `time`. Returns true if the active line changed.
    pub fn update(&mut self, lines: &[LyricLine], time: f64) -> bool {
        let next = active_line_index(lines, time);
        if next == self.current {
            return false;
        }
        self.current = next;
        true
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Forget the position, e.g. when a different song starts.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Clean a tapped word for dictionary lookup.
///
/// Strips `. , ! ? ; :`, trims whitespace, and rejects anything of two
/// characters or fewer.
pub fn lookup_candidate(word: &str) -> Option<String> {
    let cleaned: String = word.chars().filter(|c| !WORD_PUNCTUATION.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.chars().count() > MIN_LOOKUP_CHARS {
        Some(cleaned.to_string())
    } else {
        None
    }
}

/// Tappable words of a line, split on spaces.
pub fn words(line: &LyricLine) -> impl Iterator<Item = &str> {
    line.original.split(' ').filter(|w| !w.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(times: &[f64]) -> Vec<LyricLine> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| LyricLine::new(*t, format!("line {}", i)))
            .collect()
    }

    #[test]
    fn test_active_index_intervals() {
        let lines = lines(&[0.0, 5.0, 10.0]);
        assert_eq!(active_line_index(&lines, 3.0), Some(0));
        assert_eq!(active_line_index(&lines, 5.0), Some(1));
        assert_eq!(active_line_index(&lines, 9.999), Some(1));
        assert_eq!(active_line_index(&lines, 12.0), Some(2));
        assert_eq!(active_line_index(&lines, 10_000.0), Some(2));
        assert_eq!(active_line_index(&lines, -1.0), None);
    }

    #[test]
    fn test_active_index_edges() {
        assert_eq!(active_line_index(&[], 3.0), None);
        assert_eq!(active_line_index(&lines(&[2.0]), 1.0), None);
        assert_eq!(active_line_index(&lines(&[0.0, 5.0]), f64::NAN), None);
        assert_eq!(active_line_index(&lines(&[0.0, 5.0]), f64::INFINITY), Some(1));
        assert_eq!(active_line_index(&lines(&[0.0, 5.0]), f64::NEG_INFINITY), None);
        assert_eq!(active_line_index(&[], f64::INFINITY), None);
    }

    #[test]
    fn test_unsorted_input_is_scanned_as_given() {
        // Line 0 covers the empty interval [10, 5) and is never active.
        let lines = lines(&[10.0, 5.0, 20.0]);
        assert_eq!(active_line_index(&lines, 3.0), None);
        assert_eq!(active_line_index(&lines, 7.0), Some(1));
        assert_eq!(active_line_index(&lines, 12.0), Some(1));
        assert_eq!(active_line_index(&lines, 25.0), Some(2));
    }

    #[test]
    fn test_sheet_rejects_out_of_order() {
        let err = LyricSheet::new(lines(&[0.0, 5.0, 4.0])).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidLyrics { index: 2, .. }));
    }

    #[test]
    fn test_sheet_rejects_bad_times() {
        assert!(matches!(
            LyricSheet::new(lines(&[-1.0])),
            Err(MetadataError::InvalidLyrics { index: 0, .. })
        ));
        assert!(matches!(
            LyricSheet::sorted(lines(&[0.0, f64::NAN])),
            Err(MetadataError::InvalidLyrics { index: 1, .. })
        ));
    }

    #[test]
    fn test_sorted_sheet_is_stable() {
        let input = vec![
            LyricLine::new(5.0, "b"),
            LyricLine::new(0.0, "a"),
            LyricLine::new(5.0, "c"),
        ];
        let sheet = LyricSheet::sorted(input).unwrap();
        let text: Vec<&str> = sheet.lines().iter().map(|l| l.original.as_str()).collect();
        assert_eq!(text, vec!["a", "b", "c"]);
        assert_eq!(sheet.active_line(6.0).map(|l| l.original.as_str()), Some("c"));
    }

    #[test]
    fn test_empty_sheet() {
        let sheet = LyricSheet::new(Vec::new()).unwrap();
        assert!(sheet.is_empty());
        assert_eq!(sheet.active_index(0.0), None);
    }

    #[test]
    fn test_cursor_reports_changes_only() {
        let lines = lines(&[0.0, 5.0]);
        let mut cursor = LyricCursor::new();

        assert!(cursor.update(&lines, 0.5));
        assert!(!cursor.update(&lines, 1.0));
        assert!(!cursor.update(&lines, 4.9));
        assert!(cursor.update(&lines, 5.0));
        assert_eq!(cursor.current(), Some(1));

        cursor.reset();
        assert_eq!(cursor.current(), None);
        assert!(!cursor.update(&lines, -3.0));
    }

    #[test]
    fn test_lookup_candidate() {
        assert_eq!(lookup_candidate("Liebe,"), Some("Liebe".to_string()));
        assert_eq!(lookup_candidate("  Herz!? "), Some("Herz".to_string()));
        assert_eq!(lookup_candidate("ich"), Some("ich".to_string()));
        assert_eq!(lookup_candidate("du."), None);
        assert_eq!(lookup_candidate("!!!"), None);
        assert_eq!(lookup_candidate("süß"), Some("süß".to_string()));
    }

    #[test]
    fn test_words_split_on_spaces() {
        let line = LyricLine::new(0.0, "Ich  liebe dich,");
        assert_eq!(words(&line).collect::<Vec<_>>(), vec!["Ich", "liebe", "dich,"]);
    }

    #[test]
    fn test_line_serde_shape() {
        let line: LyricLine =
            serde_json::from_str(r#"{"time": 5, "original": "Hallo"}"#).unwrap();
        assert_eq!(line, LyricLine::new(5.0, "Hallo"));
        assert_eq!(
            serde_json::to_value(line.with_translation("Hello")).unwrap(),
            serde_json::json!({"time": 5.0, "original": "Hallo", "translation": "Hello"})
        );
    }
}
