/*!
 * Core data model of the optimizer.
 *
 * - `WordRange`: inclusive range of word indices
 * - `TimeRange`: half-open display interval in milliseconds
 * - `Segment`: an atomic unit of translated text plus the source words it covers
 * - `Block`: one subtitle line being timed; only its start and end move
 *   once it has been created
 */

use std::fmt;

use crate::subtitle_processor::SubtitleEntry;

/// Inclusive range of word indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordRange {
    pub first: usize,
    pub last: usize,
}

impl WordRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    /// Number of words covered
    pub fn len(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            self.last - self.first + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for WordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}

/// Display interval in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeRange {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Point inside the range at `numerator / denominator` of its length
    pub fn lerp(&self, numerator: usize, denominator: usize) -> u64 {
        if denominator == 0 {
            return self.start_ms;
        }
        self.start_ms + self.duration_ms() * numerator as u64 / denominator as u64
    }
}

/// A semantically atomic slice of translated text
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    // @field: Position of the segment in the unit
    pub id: usize,

    // @field: Translated text, whitespace-normalised to a single line
    pub text: String,

    // @field: Source words the text was aligned to
    pub words: WordRange,
}

impl Segment {
    /// Create a segment, collapsing any internal line breaks and whitespace runs
    pub fn new(id: usize, text: &str, words: WordRange) -> Self {
        Self {
            id,
            text: normalize_line(text),
            words,
        }
    }

    /// Number of whitespace-separated tokens in the text
    pub fn token_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Collapse whitespace runs to single spaces and trim the ends
pub fn normalize_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One subtitle line while it is being timed
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    // @field: Display start
    pub start_ms: u64,

    // @field: Display end
    pub end_ms: u64,

    // @field: Line text, a contiguous slice of its segment's text
    pub text: String,

    // @field: Segment the text came from
    pub segment_id: usize,

    // @field: Token indices of the text within its segment
    pub tokens: WordRange,

    // @field: When the words of this text are actually spoken
    pub speech: TimeRange,

    // @field: Text is longer than a line but has no legal split point
    pub overlong: bool,
}

impl Block {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Reading speed in characters per second
    pub fn cps(&self) -> f64 {
        cps_for(self.char_count(), self.duration_ms())
    }

    /// Freeze into a numbered subtitle entry
    pub fn to_entry(&self, seq_num: usize) -> SubtitleEntry {
        SubtitleEntry::new(seq_num, self.start_ms, self.end_ms, self.text.clone())
    }
}

/// Characters per second for a text length shown for `duration_ms`
pub fn cps_for(char_count: usize, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return f64::INFINITY;
    }
    char_count as f64 * 1000.0 / duration_ms as f64
}
