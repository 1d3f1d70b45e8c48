/*!
 * Common test utilities for the subfit test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use tempfile::TempDir;

use subfit::timing::{Segment, TimeSource, TimedText, WordRange, WordTimestamp};

/// Route library logs through env_logger when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// Timed text from `(text, start, end)` segments
///
/// Every word of a segment gets an equal share of the segment's interval;
/// the last word ends exactly at `end`.
pub fn timed_text(segments: &[(&str, u64, u64)]) -> TimedText {
    let mut words = Vec::new();
    let mut result = Vec::new();

    for (id, (text, start, end)) in segments.iter().enumerate() {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let first = words.len();
        let step = (end - start) / tokens.len() as u64;
        for (k, token) in tokens.iter().enumerate() {
            let word_start = start + step * k as u64;
            let word_end = if k + 1 == tokens.len() { *end } else { word_start + step };
            words.push(WordTimestamp::new(token, word_start, word_end));
        }
        result.push(Segment::new(id, text, WordRange::new(first, words.len() - 1)));
    }

    TimedText {
        segments: result,
        time_source: TimeSource::new(words).expect("test words are ordered"),
    }
}
