/*!
 * Validation of finished subtitle tracks.
 *
 * Every check produces `Diagnostic`s; none of them stop the pipeline.
 *
 * # Architecture
 *
 * - `diagnostics`: Finding model shared with the enforcer
 * - `timecodes`: Numbering, ordering, gaps, durations and reading speed
 * - `length`: Line length and single-line checks
 * - `text`: Word-for-word preservation of the source text
 * - `stats`: Track-wide reading speed and line length figures
 * - `service`: Runs every check and orders the findings
 */

pub mod diagnostics;
pub mod length;
pub mod service;
pub mod stats;
pub mod text;
pub mod timecodes;

// Re-export main types
pub use diagnostics::{Diagnostic, Rule, Severity};
pub use service::{ValidationReport, Validator};
pub use stats::TrackStats;
