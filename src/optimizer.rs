/*!
 * Full optimization pipeline for one unit of work.
 *
 * Segments are split, timed from their words, stretched into silence,
 * enforced and finally validated. The pipeline owns nothing beyond a
 * borrowed configuration, so one `Optimizer` can serve any number of units
 * and running it twice on the same input yields the same track.
 */

use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::app_config::Config;
use crate::errors::AlignmentError;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use crate::timing::enforcer::ConstraintEnforcer;
use crate::timing::resolver::TimingResolver;
use crate::timing::segment::TimeRange;
use crate::timing::splitter::SegmentSplitter;
use crate::timing::time_source::TimedText;
use crate::validation::diagnostics::{Diagnostic, sort_diagnostics};
use crate::validation::service::Validator;
use crate::validation::stats::TrackStats;

/// A finished track with everything learned while building it
#[derive(Debug, Clone)]
pub struct OptimizedTrack {
    pub entries: Vec<SubtitleEntry>,
    /// Enforcer and validator findings, ordered by block then severity
    pub diagnostics: Vec<Diagnostic>,
    pub stats: TrackStats,
    pub passes: usize,
    pub converged: bool,
    /// SHA-256 of the rendered SRT
    pub digest: String,
}

impl OptimizedTrack {
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    pub fn render_srt(&self) -> String {
        SubtitleCollection::render_srt(&self.entries)
    }

    /// Human-readable report: summary, statistics and every finding
    pub fn report(&self) -> String {
        let mut lines = vec![
            format!(
                "Result: {} ({} errors, {} warnings)",
                if self.is_valid() { "PASS" } else { "FAIL" },
                self.error_count(),
                self.warning_count()
            ),
            format!(
                "Enforcement: {} passes, {}",
                self.passes,
                if self.converged { "converged" } else { "not converged" }
            ),
            format!("SHA-256: {}", self.digest),
            self.stats.to_string(),
        ];
        if !self.diagnostics.is_empty() {
            lines.push(String::new());
            lines.extend(self.diagnostics.iter().map(Diagnostic::to_string));
        }
        lines.join("\n")
    }
}

/// Runs the optimization pipeline with one configuration
pub struct Optimizer<'a> {
    config: &'a Config,
}

impl<'a> Optimizer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Turn timed text into a validated track
    ///
    /// Fails only when a segment cannot be placed in time at all.
    pub fn run(&self, input: &TimedText) -> Result<OptimizedTrack, AlignmentError> {
        let constraints = &self.config.constraints;
        let splitter = SegmentSplitter::new(constraints.max_chars_per_line, &self.config.splitter);
        let mut resolver = TimingResolver::new(constraints, &input.time_source);
        let mut diagnostics = Vec::new();
        let mut blocks = Vec::new();

        for segment in &input.segments {
            if let Some(diagnostic) = resolver.align(segment)? {
                diagnostics.push(diagnostic);
            }
            let pieces = splitter.split(&segment.text);
            blocks.extend(resolver.blocks_for(segment.id, &pieces, 0));
        }
        debug!("{} segments produced {} initial lines", input.segments.len(), blocks.len());

        resolver.resolve(&mut blocks);
        let outcome = ConstraintEnforcer::new(constraints, &splitter, &resolver).enforce(blocks);
        diagnostics.extend(outcome.diagnostics);

        let entries: Vec<SubtitleEntry> = outcome
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| block.to_entry(i + 1))
            .collect();

        let source_text = input.source_text();
        let report = Validator::new(constraints).validate(&entries, Some(&source_text), speech_range(input));
        diagnostics.extend(report.diagnostics);
        sort_diagnostics(&mut diagnostics);

        let digest = digest_srt(&SubtitleCollection::render_srt(&entries));
        let track = OptimizedTrack {
            entries,
            diagnostics,
            stats: report.stats,
            passes: outcome.passes,
            converged: outcome.converged,
            digest,
        };

        info!(
            "Optimized {} segments into {} lines: {} errors, {} warnings",
            input.segments.len(),
            track.entries.len(),
            track.error_count(),
            track.warning_count()
        );
        Ok(track)
    }
}

/// Where speech happens: the reference track when there is one, else the words
pub fn speech_range(input: &TimedText) -> Option<TimeRange> {
    let reference = input.time_source.reference_track();
    match (reference.first(), reference.iter().map(|e| e.end_time_ms).max()) {
        (Some(first), Some(end_ms)) => Some(TimeRange::new(first.start_time_ms, end_ms)),
        _ => input.time_source.speech_span(),
    }
}

/// SHA-256 of a rendered track, hex encoded
pub fn digest_srt(srt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(srt.as_bytes());
    format!("{:x}", hasher.finalize())
}
