/*!
 * Constant offset detection between two timings of the same speech.
 *
 * Two recordings of one talk carry the same words, shifted in time. Lines
 * are matched as text anchors (longest common subsequence over normalized
 * text), the shift that minimises the total absolute timing difference is
 * the median of the anchor differences, and the result is rejected when the
 * anchors disagree with it by more than the tolerance.
 */

use log::{debug, info};

use crate::app_config::OffsetConfig;
use crate::errors::{OffsetApplyError, OffsetDetectionFailure};
use crate::subtitle_processor::SubtitleEntry;

/// Detects and applies constant time offsets
pub struct OffsetAligner {
    config: OffsetConfig,
}

impl OffsetAligner {
    pub fn new(config: &OffsetConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Offset in milliseconds that moves `track1` onto `track2`
    pub fn detect(&self, track1: &[SubtitleEntry], track2: &[SubtitleEntry]) -> Result<i64, OffsetDetectionFailure> {
        if track1.is_empty() || track2.is_empty() {
            return Err(OffsetDetectionFailure::EmptyTrack);
        }

        let anchors = match_anchors(track1, track2);
        let shorter = track1.len().min(track2.len());
        // A track shorter than min_anchors can still match completely
        let by_ratio = (self.config.min_match_ratio * shorter as f64).ceil() as usize;
        let required = self.config.min_anchors.min(shorter).max(by_ratio);
        if anchors.len() < required {
            return Err(OffsetDetectionFailure::InsufficientAnchors {
                matched: anchors.len(),
                required,
            });
        }

        let mut differences: Vec<i64> = anchors
            .iter()
            .map(|&(i, j)| track2[j].start_time_ms as i64 - track1[i].start_time_ms as i64)
            .collect();
        differences.sort_unstable();
        let offset = differences[(differences.len() - 1) / 2];

        let deviation_ms = residual_deviation(&differences, offset);
        debug!(
            "Offset candidate {}ms from {} anchors, residual deviation {:.1}ms",
            offset,
            anchors.len(),
            deviation_ms
        );
        if deviation_ms > self.config.tolerance_ms as f64 {
            return Err(OffsetDetectionFailure::UnstableOffset {
                deviation_ms,
                tolerance_ms: self.config.tolerance_ms,
            });
        }

        info!("Detected offset {:+}ms ({} of {} lines matched)", offset, anchors.len(), shorter);
        Ok(offset)
    }

    /// Shift every line of a track by `offset_ms`
    pub fn apply(track: &[SubtitleEntry], offset_ms: i64) -> Result<Vec<SubtitleEntry>, OffsetApplyError> {
        track
            .iter()
            .map(|entry| {
                let shift = |ms: u64| -> Result<u64, OffsetApplyError> {
                    let shifted = ms as i64 + offset_ms;
                    u64::try_from(shifted).map_err(|_| OffsetApplyError::NegativeTimestamp {
                        seq_num: entry.seq_num,
                        offset_ms,
                    })
                };
                Ok(SubtitleEntry::new(
                    entry.seq_num,
                    shift(entry.start_time_ms)?,
                    shift(entry.end_time_ms)?,
                    entry.text.clone(),
                ))
            })
            .collect()
    }
}

/// Lowercase letters and digits only, single-spaced
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// Index pairs of lines with equal normalized text, in order
fn match_anchors(track1: &[SubtitleEntry], track2: &[SubtitleEntry]) -> Vec<(usize, usize)> {
    let keyed = |track: &[SubtitleEntry]| -> Vec<(usize, String)> {
        track
            .iter()
            .enumerate()
            .map(|(i, e)| (i, normalize_text(&e.text)))
            .filter(|(_, key)| !key.is_empty())
            .collect()
    };
    let a = keyed(track1);
    let b = keyed(track2);
    let (n, m) = (a.len(), b.len());

    // lengths[i][j] = LCS of a[i..] and b[j..]
    let mut lengths = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i][j] = if a[i].1 == b[j].1 {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    let mut anchors = Vec::with_capacity(lengths[0][0] as usize);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i].1 == b[j].1 {
            anchors.push((a[i].0, b[j].0));
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    anchors
}

// Root mean square distance of the differences from the offset
fn residual_deviation(differences: &[i64], offset: i64) -> f64 {
    let sum: f64 = differences
        .iter()
        .map(|&d| {
            let r = (d - offset) as f64;
            r * r
        })
        .sum();
    (sum / differences.len() as f64).sqrt()
}
