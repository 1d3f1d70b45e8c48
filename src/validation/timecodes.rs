/*!
 * Timecode validation for a finished track.
 *
 * This module checks that:
 * - Lines are numbered 1, 2, 3... in order
 * - Every line ends after it starts, within the duration limits
 * - Lines are sorted, never overlap and keep the minimum gap
 * - Reading speed stays within the target and the hard maximum
 * - The track stays near the speech it was timed from
 */

use log::debug;

use crate::app_config::ConstraintConfig;
use crate::subtitle_processor::SubtitleEntry;
use crate::timing::segment::{TimeRange, cps_for};
use super::diagnostics::{Diagnostic, Rule};

/// How far the track may start before or end after the speech
const SPEECH_RANGE_TOLERANCE_MS: u64 = 2000;

/// Configuration for timecode validation
#[derive(Debug, Clone)]
pub struct TimecodeValidatorConfig {
    /// Reading speed above which a warning is raised
    pub cps_target: f64,
    /// Reading speed above which an error is raised
    pub cps_hard_max: f64,
    /// Reading speed above the hard max that is only a warning
    pub cps_acceptable_excess: f64,
    /// Minimum line duration in ms
    pub min_duration_ms: u64,
    /// Maximum line duration in ms
    pub max_duration_ms: u64,
    /// Minimum gap between lines in ms
    pub min_gap_ms: u64,
    /// Skip the maximum duration for the last line
    pub final_block_unbounded: bool,
}

impl Default for TimecodeValidatorConfig {
    fn default() -> Self {
        Self::from(&ConstraintConfig::default())
    }
}

impl From<&ConstraintConfig> for TimecodeValidatorConfig {
    fn from(config: &ConstraintConfig) -> Self {
        Self {
            cps_target: config.cps_target,
            cps_hard_max: config.cps_hard_max,
            cps_acceptable_excess: config.cps_acceptable_excess,
            min_duration_ms: config.min_duration_ms,
            max_duration_ms: config.max_duration_ms,
            min_gap_ms: config.min_gap_ms,
            final_block_unbounded: config.final_block_unbounded,
        }
    }
}

/// Timecode validator for subtitle entries
pub struct TimecodeValidator {
    config: TimecodeValidatorConfig,
}

impl TimecodeValidator {
    pub fn new() -> Self {
        Self::with_config(TimecodeValidatorConfig::default())
    }

    pub fn with_config(config: TimecodeValidatorConfig) -> Self {
        Self { config }
    }

    /// Checks that only need the entry itself
    ///
    /// `is_last` exempts the entry from the maximum duration when the
    /// configuration allows an unbounded final line.
    pub fn validate_entry(&self, entry: &SubtitleEntry, is_last: bool) -> Vec<Diagnostic> {
        let c = &self.config;
        let block = Some(entry.seq_num);
        let mut diagnostics = Vec::new();

        if entry.end_time_ms <= entry.start_time_ms {
            diagnostics.push(Diagnostic::error(
                block,
                Rule::InvalidTimeRange,
                format!(
                    "End {} is not after start {}",
                    entry.format_end_time(),
                    entry.format_start_time()
                ),
            ));
            // Duration and speed are meaningless past this point
            return diagnostics;
        }

        let duration_ms = entry.duration_ms();
        if duration_ms < c.min_duration_ms {
            diagnostics.push(Diagnostic::error(
                block,
                Rule::DurationTooShort,
                format!("Duration {}ms (min: {}ms)", duration_ms, c.min_duration_ms),
            ));
        }
        if duration_ms > c.max_duration_ms && !(is_last && c.final_block_unbounded) {
            diagnostics.push(Diagnostic::error(
                block,
                Rule::DurationTooLong,
                format!("Duration {}ms (max: {}ms)", duration_ms, c.max_duration_ms),
            ));
        }

        let cps = Self::calculate_cps(entry);
        if cps > c.cps_hard_max + c.cps_acceptable_excess {
            diagnostics.push(Diagnostic::error(
                block,
                Rule::CpsAboveHardMax,
                format!("Reading speed {:.1} CPS (max: {:.1})", cps, c.cps_hard_max),
            ));
        } else if cps > c.cps_hard_max {
            diagnostics.push(Diagnostic::warning(
                block,
                Rule::CpsAboveHardMax,
                format!(
                    "Reading speed {:.1} CPS is above {:.1} but within the accepted excess of {:.1}",
                    cps, c.cps_hard_max, c.cps_acceptable_excess
                ),
            ));
        } else if cps > c.cps_target {
            diagnostics.push(Diagnostic::warning(
                block,
                Rule::CpsAboveTarget,
                format!("Reading speed {:.1} CPS (target: {:.1})", cps, c.cps_target),
            ));
        }

        diagnostics
    }

    /// Validate a whole track
    pub fn validate_collection(&self, entries: &[SubtitleEntry]) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (i, entry) in entries.iter().enumerate() {
            if entry.seq_num != i + 1 {
                diagnostics.push(Diagnostic::error(
                    Some(entry.seq_num),
                    Rule::Numbering,
                    format!("Line at position {} is numbered {}", i + 1, entry.seq_num),
                ));
            }
            diagnostics.extend(self.validate_entry(entry, i + 1 == entries.len()));
        }

        let mut overlap_count = 0;
        for pair in entries.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let block = Some(next.seq_num);

            if next.start_time_ms < current.start_time_ms {
                diagnostics.push(Diagnostic::error(
                    block,
                    Rule::OutOfOrder,
                    format!(
                        "Starts at {}, before line {} at {}",
                        next.format_start_time(),
                        current.seq_num,
                        current.format_start_time()
                    ),
                ));
            } else if current.end_time_ms > next.start_time_ms {
                overlap_count += 1;
                diagnostics.push(Diagnostic::error(
                    block,
                    Rule::Overlap,
                    format!(
                        "Overlaps with line {} by {}ms",
                        current.seq_num,
                        current.end_time_ms - next.start_time_ms
                    ),
                ));
            } else if next.start_time_ms - current.end_time_ms < self.config.min_gap_ms {
                diagnostics.push(Diagnostic::error(
                    block,
                    Rule::GapTooSmall,
                    format!(
                        "Gap after line {} is {}ms (min: {}ms)",
                        current.seq_num,
                        next.start_time_ms - current.end_time_ms,
                        self.config.min_gap_ms
                    ),
                ));
            }
        }

        debug!(
            "Timecode validation: {} entries, {} findings, {} overlaps",
            entries.len(),
            diagnostics.len(),
            overlap_count
        );

        diagnostics
    }

    /// Warn when the track starts or ends far away from the speech
    pub fn validate_speech_range(&self, entries: &[SubtitleEntry], speech: TimeRange) -> Vec<Diagnostic> {
        let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
            return Vec::new();
        };

        let mut diagnostics = Vec::new();
        if first.start_time_ms.abs_diff(speech.start_ms) > SPEECH_RANGE_TOLERANCE_MS {
            diagnostics.push(Diagnostic::warning(
                Some(first.seq_num),
                Rule::SpeechRange,
                format!(
                    "Track starts at {} but speech starts at {}",
                    first.format_start_time(),
                    SubtitleEntry::format_timestamp(speech.start_ms)
                ),
            ));
        }
        if last.end_time_ms.abs_diff(speech.end_ms) > SPEECH_RANGE_TOLERANCE_MS {
            diagnostics.push(Diagnostic::warning(
                Some(last.seq_num),
                Rule::SpeechRange,
                format!(
                    "Track ends at {} but speech ends at {}",
                    last.format_end_time(),
                    SubtitleEntry::format_timestamp(speech.end_ms)
                ),
            ));
        }
        diagnostics
    }

    /// Reading speed of an entry in characters per second
    pub fn calculate_cps(entry: &SubtitleEntry) -> f64 {
        cps_for(entry.char_count(), entry.duration_ms())
    }
}

impl Default for TimecodeValidator {
    fn default() -> Self {
        Self::new()
    }
}
