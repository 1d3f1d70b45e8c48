/*!
 * Word-level timing of the source speech.
 *
 * A `TimeSource` owns the ordered word timestamps of one unit and the
 * reference track they came from. It answers two questions for the rest of
 * the pipeline: when is a span of words spoken, and how long is it silent
 * after a given moment.
 *
 * Timestamps come from one of three places:
 * - an explicit aligned document (`words` + `segments` with word ranges)
 * - a Whisper-style document (segments carrying their own words)
 * - plain timed records (SRT or mapping rows), where each record's words are
 *   spread uniformly across the record's interval
 */

use log::{debug, warn};
use serde::Deserialize;

use crate::errors::{AlignmentError, InputParseError};
use crate::subtitle_processor::SubtitleEntry;
use super::segment::{normalize_line, Segment, TimeRange, WordRange};

/// Start and end of one spoken word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordTimestamp {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl WordTimestamp {
    pub fn new(word: &str, start_ms: u64, end_ms: u64) -> Self {
        Self {
            word: word.to_string(),
            start_ms,
            end_ms,
        }
    }
}

/// Ordered word timestamps plus the reference track they describe
#[derive(Debug, Clone, Default)]
pub struct TimeSource {
    words: Vec<WordTimestamp>,
    reference: Vec<SubtitleEntry>,
}

/// Segments of one unit together with the timing they refer to
#[derive(Debug, Clone)]
pub struct TimedText {
    pub segments: Vec<Segment>,
    pub time_source: TimeSource,
}

impl TimedText {
    /// Full translated text of the unit, segments joined by single spaces
    pub fn source_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TimeSource {
    /// Create a time source, rejecting empty intervals and starts or ends that go backwards
    pub fn new(words: Vec<WordTimestamp>) -> Result<Self, InputParseError> {
        let mut previous_start = 0;
        let mut previous_end = 0;
        for (index, word) in words.iter().enumerate() {
            if word.end_ms <= word.start_ms {
                return Err(InputParseError::WordTimestamp {
                    index,
                    reason: format!("end {}ms is not after start {}ms", word.end_ms, word.start_ms),
                });
            }
            if word.start_ms < previous_start {
                return Err(InputParseError::WordTimestamp {
                    index,
                    reason: format!(
                        "start {}ms is before the previous word start {}ms",
                        word.start_ms, previous_start
                    ),
                });
            }
            if word.end_ms < previous_end {
                return Err(InputParseError::WordTimestamp {
                    index,
                    reason: format!(
                        "end {}ms is before the previous word end {}ms",
                        word.end_ms, previous_end
                    ),
                });
            }
            previous_start = word.start_ms;
            previous_end = word.end_ms;
        }

        Ok(Self {
            words,
            reference: Vec::new(),
        })
    }

    /// Attach the reference track the words were derived from
    pub fn with_reference(mut self, reference: Vec<SubtitleEntry>) -> Self {
        self.reference = reference;
        self
    }

    pub fn words(&self) -> &[WordTimestamp] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Reference timing track (the records or segments the words came from)
    pub fn reference_track(&self) -> &[SubtitleEntry] {
        &self.reference
    }

    /// Time range in which the given inclusive word span is spoken
    pub fn range_for(&self, first: usize, last: usize) -> Result<TimeRange, AlignmentError> {
        if self.words.is_empty() {
            return Err(AlignmentError::NoWords);
        }
        if first > last {
            return Err(AlignmentError::EmptyRange { first, last });
        }
        if last >= self.words.len() {
            return Err(AlignmentError::OutOfBounds {
                first,
                last,
                available: self.words.len(),
            });
        }

        let span = &self.words[first..=last];
        let start_ms = span[0].start_ms;
        let end_ms = span.iter().map(|w| w.end_ms).max().unwrap_or(start_ms);
        Ok(TimeRange::new(start_ms, end_ms))
    }

    /// Closest locatable span to a range that `range_for` rejected
    ///
    /// The range is clamped into the available words; a reversed range is
    /// narrowed to its first word. Returns `None` when there are no words.
    pub fn nearest_enclosing(&self, first: usize, last: usize) -> Option<(WordRange, TimeRange)> {
        let max_index = self.words.len().checked_sub(1)?;
        let last = last.min(max_index);
        let first = first.min(last);
        let range = self.range_for(first, last).ok()?;
        Some((WordRange::new(first, last), range))
    }

    /// Latest moment before the next spoken word after `time_ms` begins
    ///
    /// `None` means nothing is spoken after `time_ms`.
    pub fn silence_until(&self, time_ms: u64) -> Option<u64> {
        let next = self.words.partition_point(|w| w.start_ms < time_ms);
        self.words.get(next).map(|w| w.start_ms)
    }

    /// From the first word start to the last word end
    pub fn speech_span(&self) -> Option<TimeRange> {
        let first = self.words.first()?;
        let end_ms = self.words.iter().map(|w| w.end_ms).max().unwrap_or(first.end_ms);
        Some(TimeRange::new(first.start_ms, end_ms))
    }

    /// Build segments and uniformly distributed word timings from timed records
    ///
    /// Each record becomes one segment. Its words share the record's interval
    /// in equal slices, which keeps every word inside the record it belongs to.
    pub fn from_entries(entries: &[SubtitleEntry]) -> TimedText {
        let mut words = Vec::new();
        let mut segments = Vec::new();

        for entry in entries {
            let text = normalize_line(&entry.text);
            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            let first = words.len();
            let interval = TimeRange::new(entry.start_time_ms, entry.end_time_ms.max(entry.start_time_ms + 1));
            push_uniform_words(&mut words, &tokens, interval);

            segments.push(Segment::new(segments.len(), &text, WordRange::new(first, words.len() - 1)));
        }

        debug!("Distributed {} words across {} records", words.len(), segments.len());

        TimedText {
            segments,
            time_source: TimeSource {
                words,
                reference: entries.to_vec(),
            },
        }
    }

    /// Parse an aligned JSON document (times in seconds)
    pub fn from_aligned_json(content: &str) -> Result<TimedText, InputParseError> {
        let document: AlignedDocument = serde_json::from_str(content)?;

        match document {
            AlignedDocument::Explicit { words, segments } => Self::from_explicit(words, segments),
            AlignedDocument::Whisper { segments } => Self::from_whisper(segments),
        }
    }

    fn from_explicit(words: Vec<JsonWord>, segments: Vec<JsonRangeSegment>) -> Result<TimedText, InputParseError> {
        let words = words
            .into_iter()
            .enumerate()
            .map(|(index, w)| w.into_timestamp(index))
            .collect::<Result<Vec<_>, _>>()?;
        let mut time_source = TimeSource::new(words)?;

        let mut result = Vec::new();
        let mut reference = Vec::new();
        for (index, segment) in segments.into_iter().enumerate() {
            let text = normalize_line(&segment.text);
            if text.is_empty() {
                return Err(InputParseError::Segment {
                    index,
                    reason: "empty text".to_string(),
                });
            }
            if let Ok(range) = time_source.range_for(segment.first_word, segment.last_word) {
                reference.push(SubtitleEntry::new(reference.len() + 1, range.start_ms, range.end_ms, text.clone()));
            }
            result.push(Segment::new(
                result.len(),
                &text,
                WordRange::new(segment.first_word, segment.last_word),
            ));
        }

        if result.is_empty() {
            return Err(InputParseError::Empty);
        }

        time_source.reference = reference;
        Ok(TimedText {
            segments: result,
            time_source,
        })
    }

    fn from_whisper(segments: Vec<JsonWhisperSegment>) -> Result<TimedText, InputParseError> {
        let mut words: Vec<WordTimestamp> = Vec::new();
        let mut result = Vec::new();
        let mut reference = Vec::new();
        let mut repaired = 0usize;

        for (index, segment) in segments.into_iter().enumerate() {
            let text = normalize_line(&segment.text);
            if text.is_empty() {
                continue;
            }
            let interval = TimeRange::new(
                seconds_to_ms(segment.start, index)?,
                seconds_to_ms(segment.end, index)?,
            );
            let first = words.len();

            let spoken: Vec<JsonWord> = segment
                .words
                .into_iter()
                .filter(|w| !w.word.trim().is_empty())
                .collect();

            if spoken.is_empty() {
                let tokens: Vec<&str> = text.split_whitespace().collect();
                let interval = TimeRange::new(interval.start_ms, interval.end_ms.max(interval.start_ms + 1));
                push_uniform_words(&mut words, &tokens, interval);
            } else {
                for word in spoken {
                    let mut timestamp = word.into_timestamp(words.len())?;
                    // Recognisers emit zero-length and slightly out-of-order words
                    let (start_floor, end_floor) = words.last().map(|w| (w.start_ms, w.end_ms)).unwrap_or((0, 0));
                    if timestamp.start_ms < start_floor
                        || timestamp.end_ms <= timestamp.start_ms
                        || timestamp.end_ms < end_floor
                    {
                        repaired += 1;
                        timestamp.start_ms = timestamp.start_ms.max(start_floor);
                        timestamp.end_ms = timestamp.end_ms.max(timestamp.start_ms + 1).max(end_floor);
                    }
                    words.push(timestamp);
                }
            }

            reference.push(SubtitleEntry::new(
                reference.len() + 1,
                interval.start_ms,
                interval.end_ms.max(interval.start_ms + 1),
                text.clone(),
            ));
            result.push(Segment::new(result.len(), &text, WordRange::new(first, words.len() - 1)));
        }

        if result.is_empty() {
            return Err(InputParseError::Empty);
        }
        if repaired > 0 {
            warn!("Repaired {} word timestamps with empty or out-of-order intervals", repaired);
        }

        let time_source = TimeSource::new(words)?.with_reference(reference);
        Ok(TimedText {
            segments: result,
            time_source,
        })
    }
}

// Split an interval into equal slices, one per token
//
// Overlapping records are clamped so that starts and ends never go backwards.
fn push_uniform_words(words: &mut Vec<WordTimestamp>, tokens: &[&str], interval: TimeRange) {
    let (start_floor, end_floor) = words.last().map(|w| (w.start_ms, w.end_ms)).unwrap_or((0, 0));
    let count = tokens.len();
    for (i, token) in tokens.iter().enumerate() {
        let start_ms = interval.lerp(i, count).max(start_floor);
        let end_ms = interval.lerp(i + 1, count).max(start_ms + 1).max(end_floor);
        words.push(WordTimestamp::new(token, start_ms, end_ms));
    }
}

fn seconds_to_ms(seconds: f64, index: usize) -> Result<u64, InputParseError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(InputParseError::WordTimestamp {
            index,
            reason: format!("invalid time {} s", seconds),
        });
    }
    Ok((seconds * 1000.0).round() as u64)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AlignedDocument {
    Explicit {
        words: Vec<JsonWord>,
        segments: Vec<JsonRangeSegment>,
    },
    Whisper {
        segments: Vec<JsonWhisperSegment>,
    },
}

#[derive(Debug, Deserialize)]
struct JsonWord {
    word: String,
    start: f64,
    end: f64,
}

impl JsonWord {
    fn into_timestamp(self, index: usize) -> Result<WordTimestamp, InputParseError> {
        Ok(WordTimestamp {
            word: self.word.trim().to_string(),
            start_ms: seconds_to_ms(self.start, index)?,
            end_ms: seconds_to_ms(self.end, index)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct JsonRangeSegment {
    text: String,
    first_word: usize,
    last_word: usize,
}

#[derive(Debug, Deserialize)]
struct JsonWhisperSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Vec<JsonWord>,
}
