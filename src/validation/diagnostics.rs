/*!
 * Structured findings shared by the enforcer and the validator.
 *
 * A diagnostic never stops the pipeline. Errors mean the finished track
 * breaks one of its invariants; warnings are reported but do not fail it.
 */

use std::fmt;

/// How serious a finding is; errors sort before warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("ERROR"),
            Self::Warning => f.write_str("WARN"),
        }
    }
}

/// Rule that produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rule {
    EmptyTrack,
    Numbering,
    InvalidTimeRange,
    EmptyText,
    OutOfOrder,
    Overlap,
    GapTooSmall,
    LineTooLong,
    MultiLine,
    DurationTooShort,
    DurationTooLong,
    CpsAboveHardMax,
    CpsAboveTarget,
    TextMismatch,
    SpeechRange,
    AlignmentFallback,
    ConstraintUnresolvable,
    NotConverged,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EmptyTrack => "empty-track",
            Self::Numbering => "numbering",
            Self::InvalidTimeRange => "invalid-time-range",
            Self::EmptyText => "empty-text",
            Self::OutOfOrder => "out-of-order",
            Self::Overlap => "overlap",
            Self::GapTooSmall => "gap-too-small",
            Self::LineTooLong => "line-too-long",
            Self::MultiLine => "multi-line",
            Self::DurationTooShort => "duration-too-short",
            Self::DurationTooLong => "duration-too-long",
            Self::CpsAboveHardMax => "cps-above-hard-max",
            Self::CpsAboveTarget => "cps-above-target",
            Self::TextMismatch => "text-mismatch",
            Self::SpeechRange => "speech-range",
            Self::AlignmentFallback => "alignment-fallback",
            Self::ConstraintUnresolvable => "constraint-unresolvable",
            Self::NotConverged => "not-converged",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One finding about a track, optionally tied to a block number
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based block number, `None` for track-level findings
    pub block: Option<usize>,
    pub rule: Rule,
    pub message: String,
}

impl Diagnostic {
    pub fn error(block: Option<usize>, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            block,
            rule,
            message: message.into(),
        }
    }

    pub fn warning(block: Option<usize>, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            block,
            rule,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(block) => write!(f, "[{}] #{} {}: {}", self.severity, block, self.rule, self.message),
            None => write!(f, "[{}] {}: {}", self.severity, self.rule, self.message),
        }
    }
}

/// Order findings by block (track-level first), then severity, then rule
///
/// The sort is stable, so findings that tie keep the order they were raised in.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| (d.block, d.severity, d.rule));
}
