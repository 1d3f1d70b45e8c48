/*!
 * Text preservation check.
 *
 * The lines of a track, read in order, must reproduce the source text word
 * for word. Only the whitespace between words may differ. Any difference
 * is an error that points at the first line where the texts diverge.
 */

use log::debug;

use crate::subtitle_processor::SubtitleEntry;
use super::diagnostics::{Diagnostic, Rule};

/// Words shown on each side of the first difference
const CONTEXT_WORDS: usize = 4;

pub struct TextValidator;

impl TextValidator {
    /// Compare the track's words against the source text
    pub fn validate(entries: &[SubtitleEntry], source_text: &str) -> Vec<Diagnostic> {
        // (word, line number) for every word of the track
        let track: Vec<(&str, usize)> = entries
            .iter()
            .flat_map(|e| e.text.split_whitespace().map(move |w| (w, e.seq_num)))
            .collect();
        let source: Vec<&str> = source_text.split_whitespace().collect();

        let Some(index) = first_difference(&track, &source) else {
            debug!("Text preserved: {} words", source.len());
            return Vec::new();
        };

        let block = track.get(index).or(track.last()).map(|(_, seq)| *seq);
        let track_words: Vec<&str> = track.iter().map(|(w, _)| *w).collect();
        let message = format!(
            "Track differs from the source at word {} (track {} words, source {} words): track \"{}\" vs source \"{}\"",
            index + 1,
            track.len(),
            source.len(),
            context(&track_words, index),
            context(&source, index)
        );
        vec![Diagnostic::error(block, Rule::TextMismatch, message)]
    }
}

fn first_difference(track: &[(&str, usize)], source: &[&str]) -> Option<usize> {
    let common = track.len().min(source.len());
    (0..common)
        .find(|&i| track[i].0 != source[i])
        .or_else(|| (track.len() != source.len()).then_some(common))
}

fn context(words: &[&str], index: usize) -> String {
    let start = index.saturating_sub(CONTEXT_WORDS).min(words.len());
    let end = (index + CONTEXT_WORDS + 1).min(words.len());
    let mut shown = words[start..end].to_vec();
    if index >= words.len() {
        shown.push("<end>");
    }
    shown.join(" ")
}
