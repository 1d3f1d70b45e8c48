/*!
 * Plain-text export of a track.
 *
 * Lines are joined into paragraphs; a pause longer than the threshold
 * between two lines starts a new paragraph.
 */

use std::path::Path;

use anyhow::Result;
use log::info;

use crate::file_utils::FileManager;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

/// Default pause that starts a new paragraph
pub const DEFAULT_PAUSE_MS: u64 = 2000;

/// Join lines into paragraphs separated by `\n`, or `\n\n` with double spacing
pub fn srt_to_text(entries: &[SubtitleEntry], pause_ms: u64, double_spacing: bool) -> String {
    let mut paragraphs: Vec<Vec<String>> = Vec::new();
    let mut previous_end: Option<u64> = None;

    for entry in entries {
        let text = entry.text.lines().map(str::trim).collect::<Vec<_>>().join(" ");
        let starts_paragraph = match previous_end {
            Some(end) => entry.start_time_ms.saturating_sub(end) > pause_ms,
            None => true,
        };
        if starts_paragraph {
            paragraphs.push(Vec::new());
        }
        if let Some(current) = paragraphs.last_mut() {
            current.push(text);
        }
        previous_end = Some(entry.end_time_ms);
    }

    let separator = if double_spacing { "\n\n" } else { "\n" };
    paragraphs
        .iter()
        .map(|p| p.join(" "))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Export an SRT file as plain text; returns the number of lines read
pub fn export_file<P1: AsRef<Path>, P2: AsRef<Path>>(
    srt_path: P1,
    output_path: P2,
    pause_ms: u64,
    double_spacing: bool,
) -> Result<usize> {
    let collection = SubtitleCollection::from_srt_file(&srt_path)?;
    let mut text = srt_to_text(&collection.entries, pause_ms, double_spacing);
    text.push('\n');
    FileManager::write_atomic(&output_path, &text)?;

    info!(
        "Exported {} lines to {}",
        collection.entries.len(),
        output_path.as_ref().display()
    );
    Ok(collection.entries.len())
}
