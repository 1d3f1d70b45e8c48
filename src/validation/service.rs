/*!
 * Validation service that runs every check over a finished track.
 *
 * The validator is a pure function of its inputs. It re-checks every
 * invariant of a track from scratch and never trusts the enforcer's own
 * bookkeeping, so it can equally be pointed at a hand-made SRT file.
 */

use std::fmt;

use log::debug;

use crate::app_config::ConstraintConfig;
use crate::subtitle_processor::SubtitleEntry;
use crate::timing::segment::TimeRange;

use super::diagnostics::{Diagnostic, Rule, Severity, sort_diagnostics};
use super::length::{LengthValidator, LengthValidatorConfig};
use super::stats::TrackStats;
use super::text::TextValidator;
use super::timecodes::{TimecodeValidator, TimecodeValidatorConfig};

/// Everything the validator found about one track
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Findings ordered by block, then severity
    pub diagnostics: Vec<Diagnostic>,
    pub stats: TrackStats,
}

impl ValidationReport {
    /// A track is valid when nothing it contains is an error
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        format!(
            "Validation: {} blocks, {} errors, {} warnings",
            self.stats.block_count,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        writeln!(f, "{}", self.stats)?;
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

/// Final deterministic scan of a track
pub struct Validator {
    constraints: ConstraintConfig,
    length_validator: LengthValidator,
    timecode_validator: TimecodeValidator,
}

impl Validator {
    pub fn new(constraints: &ConstraintConfig) -> Self {
        let length_config = LengthValidatorConfig {
            max_chars_per_line: constraints.max_chars_per_line,
        };

        Self {
            constraints: constraints.clone(),
            length_validator: LengthValidator::with_config(length_config),
            timecode_validator: TimecodeValidator::with_config(TimecodeValidatorConfig::from(constraints)),
        }
    }

    /// Validate a track
    ///
    /// `source_text` enables the text preservation check and `speech` the
    /// speech range check; both are skipped when absent.
    pub fn validate(
        &self,
        entries: &[SubtitleEntry],
        source_text: Option<&str>,
        speech: Option<TimeRange>,
    ) -> ValidationReport {
        let mut diagnostics = Vec::new();

        if entries.is_empty() {
            diagnostics.push(Diagnostic::error(None, Rule::EmptyTrack, "Track has no lines"));
        }

        diagnostics.extend(self.length_validator.validate_collection(entries));
        diagnostics.extend(self.timecode_validator.validate_collection(entries));
        if let Some(speech) = speech {
            diagnostics.extend(self.timecode_validator.validate_speech_range(entries, speech));
        }
        if let Some(source_text) = source_text {
            diagnostics.extend(TextValidator::validate(entries, source_text));
        }

        sort_diagnostics(&mut diagnostics);
        let stats = TrackStats::compute(entries, &self.constraints);

        let report = ValidationReport { diagnostics, stats };
        debug!("{}", report.summary());
        report
    }
}
