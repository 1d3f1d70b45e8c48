/*!
 * Error types for the subfit application.
 *
 * Each stage of the optimizer has its own error enum so callers can decide
 * what is fatal: a parse error fails one input unit, an alignment error fails
 * one segment (unless a fallback range exists), an offset error only aborts
 * the derived-track step. Readability violations are never errors; they are
 * reported as diagnostics.
 */

use thiserror::Error;

/// Errors raised while reading timecodes, tracks, mapping rows or aligned JSON
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputParseError {
    /// A timecode that is not `HH:MM:SS,mmm`
    #[error("Invalid timecode '{0}'")]
    Timecode(String),

    /// A malformed row in a mapping file
    #[error("Invalid mapping row at line {line}: {reason}")]
    MappingRow {
        /// 1-based line number in the mapping file
        line: usize,
        /// What was wrong with the row
        reason: String,
    },

    /// Word timestamps that are not monotonic or have an empty interval
    #[error("Invalid word timestamp at index {index}: {reason}")]
    WordTimestamp {
        /// Index of the offending word
        index: usize,
        /// What was wrong with the timestamp
        reason: String,
    },

    /// A segment whose word range does not fit the word sequence
    #[error("Invalid segment {index}: {reason}")]
    Segment {
        /// Index of the offending segment
        index: usize,
        /// What was wrong with the segment
        reason: String,
    },

    /// The aligned JSON document could not be decoded
    #[error("Invalid aligned JSON: {0}")]
    Json(String),

    /// The input did not contain a single usable record
    #[error("Input contains no subtitle records")]
    Empty,
}

impl From<serde_json::Error> for InputParseError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

/// Errors raised when a span of source words cannot be located in time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    /// The range is reversed
    #[error("Empty word range {first}..={last}")]
    EmptyRange {
        first: usize,
        last: usize,
    },

    /// The range points past the available word timestamps
    #[error("Word range {first}..={last} is outside the {available} available words")]
    OutOfBounds {
        first: usize,
        last: usize,
        available: usize,
    },

    /// There are no word timestamps at all
    #[error("No word timestamps available")]
    NoWords,
}

/// Errors raised while detecting a constant offset between two tracks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OffsetDetectionFailure {
    /// One of the tracks has no entries
    #[error("Cannot detect an offset against an empty track")]
    EmptyTrack,

    /// Too few blocks could be matched between the tracks
    #[error("Only {matched} matching blocks found, at least {required} required")]
    InsufficientAnchors {
        matched: usize,
        required: usize,
    },

    /// The matched blocks disagree on the shift
    #[error("Offset is not constant: residual deviation {deviation_ms:.0}ms exceeds {tolerance_ms}ms")]
    UnstableOffset {
        deviation_ms: f64,
        tolerance_ms: u64,
    },
}

/// Errors raised while shifting a track
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OffsetApplyError {
    /// The shift would move a timestamp before zero
    #[error("Shifting entry {seq_num} by {offset_ms}ms would produce a negative timestamp")]
    NegativeTimestamp {
        seq_num: usize,
        offset_ms: i64,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error while parsing an input unit
    #[error("Parse error: {0}")]
    Parse(#[from] InputParseError),

    /// Error while locating words in time
    #[error("Alignment error: {0}")]
    Alignment(#[from] AlignmentError),

    /// Error while detecting an offset
    #[error("Offset detection error: {0}")]
    OffsetDetection(#[from] OffsetDetectionFailure),

    /// Error while applying an offset
    #[error("Offset error: {0}")]
    OffsetApply(#[from] OffsetApplyError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
