/*!
 * Line length validation.
 *
 * Every line must be a single line of text no longer than the configured
 * limit, and never empty.
 */

use log::debug;

use crate::subtitle_processor::SubtitleEntry;
use super::diagnostics::{Diagnostic, Rule};

/// Configuration for length validation
#[derive(Debug, Clone)]
pub struct LengthValidatorConfig {
    /// Maximum characters per line
    pub max_chars_per_line: usize,
}

impl Default for LengthValidatorConfig {
    fn default() -> Self {
        Self {
            max_chars_per_line: 42,
        }
    }
}

/// Length validator for subtitle lines
pub struct LengthValidator {
    config: LengthValidatorConfig,
}

impl LengthValidator {
    pub fn new() -> Self {
        Self::with_config(LengthValidatorConfig::default())
    }

    pub fn with_config(config: LengthValidatorConfig) -> Self {
        Self { config }
    }

    pub fn validate_entry(&self, entry: &SubtitleEntry) -> Vec<Diagnostic> {
        let block = Some(entry.seq_num);
        let mut diagnostics = Vec::new();

        if entry.text.trim().is_empty() {
            diagnostics.push(Diagnostic::error(block, Rule::EmptyText, "Line has no text"));
            return diagnostics;
        }

        let line_count = entry.text.lines().count();
        if line_count > 1 {
            diagnostics.push(Diagnostic::error(
                block,
                Rule::MultiLine,
                format!("Text spans {} lines", line_count),
            ));
        }

        let longest = entry
            .text
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        if longest > self.config.max_chars_per_line {
            diagnostics.push(Diagnostic::error(
                block,
                Rule::LineTooLong,
                format!("{} characters (max: {})", longest, self.config.max_chars_per_line),
            ));
        }

        diagnostics
    }

    pub fn validate_collection(&self, entries: &[SubtitleEntry]) -> Vec<Diagnostic> {
        let diagnostics: Vec<Diagnostic> = entries.iter().flat_map(|e| self.validate_entry(e)).collect();
        debug!("Length validation: {} entries, {} findings", entries.len(), diagnostics.len());
        diagnostics
    }
}

impl Default for LengthValidator {
    fn default() -> Self {
        Self::new()
    }
}
