/*!
 * Initial timing of subtitle lines.
 *
 * Every line starts when its first word is spoken and ends when its last
 * word ends. Lines that are too fast or too short are then stretched into
 * the silence that follows them, never past the next spoken word (minus the
 * minimum gap) and never past the maximum duration. The start of a line is
 * never moved here.
 */

use std::collections::HashMap;

use log::{debug, warn};

use crate::app_config::ConstraintConfig;
use crate::errors::AlignmentError;
use crate::validation::diagnostics::{Diagnostic, Rule};
use super::segment::{Block, Segment, TimeRange, WordRange};
use super::splitter::SplitPiece;
use super::time_source::TimeSource;

/// Where a segment's words sit in the source speech
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentTiming {
    pub words: WordRange,
    pub range: TimeRange,
    pub token_count: usize,
}

/// Assigns start and end times to lines
pub struct TimingResolver<'a> {
    constraints: &'a ConstraintConfig,
    time_source: &'a TimeSource,
    timings: HashMap<usize, SegmentTiming>,
}

impl<'a> TimingResolver<'a> {
    pub fn new(constraints: &'a ConstraintConfig, time_source: &'a TimeSource) -> Self {
        Self {
            constraints,
            time_source,
            timings: HashMap::new(),
        }
    }

    pub fn time_source(&self) -> &TimeSource {
        self.time_source
    }

    /// Locate a segment's words in time
    ///
    /// A range that cannot be located falls back to the nearest enclosing
    /// span, which is reported as a warning. Without any fallback the
    /// segment's alignment error is returned.
    pub fn align(&mut self, segment: &Segment) -> Result<Option<Diagnostic>, AlignmentError> {
        let token_count = segment.token_count();
        let (words, range, diagnostic) =
            match self.time_source.range_for(segment.words.first, segment.words.last) {
                Ok(range) => (segment.words, range, None),
                Err(error) => {
                    let (words, range) = self
                        .time_source
                        .nearest_enclosing(segment.words.first, segment.words.last)
                        .ok_or_else(|| error.clone())?;
                    warn!("Segment {}: {}; using words {} instead", segment.id, error, words);
                    let diagnostic = Diagnostic::warning(
                        None,
                        Rule::AlignmentFallback,
                        format!(
                            "Segment {} ({}): {}; timed from words {} instead",
                            segment.id + 1,
                            preview(&segment.text),
                            error,
                            words
                        ),
                    );
                    (words, range, Some(diagnostic))
                }
            };

        self.timings.insert(
            segment.id,
            SegmentTiming {
                words,
                range,
                token_count,
            },
        );
        Ok(diagnostic)
    }

    pub fn timing(&self, segment_id: usize) -> Option<&SegmentTiming> {
        self.timings.get(&segment_id)
    }

    /// Source words spoken for a token span of a segment
    ///
    /// Tokens map one to one when the counts agree; otherwise token
    /// boundaries are scaled proportionally onto the word range. `None`
    /// means the span falls between two words.
    pub fn words_for(&self, segment_id: usize, tokens: WordRange) -> Option<WordRange> {
        let timing = self.timings.get(&segment_id)?;
        let m = timing.words.len();
        let n = timing.token_count.max(1);
        if m == n {
            return Some(WordRange::new(
                timing.words.first + tokens.first,
                timing.words.first + tokens.last,
            ));
        }

        let boundary = |k: usize| timing.words.first + (k * m + n / 2) / n;
        let first = boundary(tokens.first);
        let end = boundary(tokens.last + 1);
        if end <= first {
            return None;
        }
        Some(WordRange::new(first, end - 1))
    }

    /// When a token span of a segment is spoken
    pub fn speech_for(&self, segment_id: usize, tokens: WordRange) -> TimeRange {
        let Some(timing) = self.timings.get(&segment_id) else {
            return TimeRange::new(0, 1);
        };

        if let Some(words) = self.words_for(segment_id, tokens) {
            if let Ok(range) = self.time_source.range_for(words.first, words.last) {
                return range;
            }
        }

        // Between two words: share the segment's interval by token position
        let n = timing.token_count.max(1);
        let start_ms = timing.range.lerp(tokens.first, n);
        let end_ms = timing.range.lerp(tokens.last + 1, n).max(start_ms + 1);
        TimeRange::new(start_ms, end_ms)
    }

    /// Lines for split pieces of one aligned segment, timed to their speech
    ///
    /// `offset` is the segment token index of the first token of the split text.
    pub fn blocks_for(&self, segment_id: usize, pieces: &[SplitPiece], offset: usize) -> Vec<Block> {
        pieces
            .iter()
            .map(|piece| {
                let tokens = WordRange::new(piece.tokens.first + offset, piece.tokens.last + offset);
                let speech = self.speech_for(segment_id, tokens);
                Block {
                    start_ms: speech.start_ms,
                    end_ms: speech.end_ms,
                    text: piece.text.clone(),
                    segment_id,
                    tokens,
                    speech,
                    overlong: piece.overlong,
                }
            })
            .collect()
    }

    /// Stretch every line that is too fast or too short into its trailing silence
    pub fn resolve(&self, blocks: &mut [Block]) {
        let mut extended = 0;
        for i in 0..blocks.len() {
            if self.extend_into_silence(blocks, i) {
                extended += 1;
            }
        }
        debug!("Extended {} of {} lines into trailing silence", extended, blocks.len());
    }

    /// Latest end a line may take without running into the next speech
    pub fn silence_ceiling(&self, blocks: &[Block], i: usize) -> u64 {
        let block = &blocks[i];
        let next_word = self.time_source.silence_until(block.speech.end_ms);
        let next_block = blocks.get(i + 1).map(|b| b.start_ms);

        let bound = match (next_word, next_block) {
            (Some(word), Some(next)) => Some(word.min(next)),
            (Some(word), None) => Some(word),
            (None, next) => next,
        };

        let ceiling = match bound {
            Some(bound) => bound.saturating_sub(self.constraints.min_gap_ms),
            None => block.speech.end_ms + self.constraints.last_block_pad_ms,
        };
        ceiling.min(block.start_ms + self.constraints.max_duration_ms)
    }

    fn extend_into_silence(&self, blocks: &mut [Block], i: usize) -> bool {
        let c = self.constraints;
        let block = &blocks[i];
        let too_fast = block.cps() > c.cps_target;
        let too_short = block.duration_ms() < c.min_duration_ms;
        if !too_fast && !too_short {
            return false;
        }

        let desired_end = block.start_ms + c.desired_duration_ms(block.char_count());
        let new_end = desired_end.min(self.silence_ceiling(blocks, i));
        if new_end > blocks[i].end_ms {
            blocks[i].end_ms = new_end;
            true
        } else {
            false
        }
    }
}

/// First few words of a text, for messages
pub fn preview(text: &str) -> String {
    let mut words: Vec<&str> = text.split_whitespace().take(6).collect();
    if text.split_whitespace().count() > words.len() {
        words.push("…");
    }
    format!("\"{}\"", words.join(" "))
}
