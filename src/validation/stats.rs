/*!
 * Summary statistics of a track, printed with every report.
 */

use std::fmt;

use serde::Serialize;

use crate::app_config::ConstraintConfig;
use crate::subtitle_processor::SubtitleEntry;
use crate::timing::segment::cps_for;

/// Reading-speed and line-length figures for a whole track
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackStats {
    pub block_count: usize,
    pub total_chars: usize,
    pub avg_cps: f64,
    pub median_cps: f64,
    pub max_cps: f64,
    pub avg_cpl: f64,
    pub max_cpl: usize,
    pub avg_duration_ms: u64,
    /// Lines above the target reading speed
    pub above_target: usize,
    /// Lines above the hard reading speed maximum
    pub above_hard_max: usize,
    pub over_cpl: usize,
    pub under_min_duration: usize,
    pub over_max_duration: usize,
    pub overlaps: usize,
    /// Gaps shorter than the minimum, overlaps excluded
    pub small_gaps: usize,
}

impl TrackStats {
    pub fn compute(entries: &[SubtitleEntry], constraints: &ConstraintConfig) -> Self {
        if entries.is_empty() {
            return Self::default();
        }

        let count = entries.len();
        let mut speeds: Vec<f64> = entries
            .iter()
            .map(|e| cps_for(e.char_count(), e.duration_ms()))
            .collect();
        let total_chars: usize = entries.iter().map(|e| e.char_count()).sum();
        let total_duration: u64 = entries.iter().map(|e| e.duration_ms()).sum();

        let above_target = speeds.iter().filter(|&&s| s > constraints.cps_target).count();
        let above_hard_max = speeds.iter().filter(|&&s| s > constraints.cps_hard_max).count();
        let count_where = |pred: &dyn Fn(&SubtitleEntry) -> bool| entries.iter().filter(|e| pred(*e)).count();
        let overlaps = entries
            .windows(2)
            .filter(|pair| pair[0].end_time_ms > pair[1].start_time_ms)
            .count();
        let small_gaps = entries
            .windows(2)
            .filter(|pair| {
                pair[0].end_time_ms <= pair[1].start_time_ms
                    && pair[1].start_time_ms - pair[0].end_time_ms < constraints.min_gap_ms
            })
            .count();

        speeds.sort_by(f64::total_cmp);
        let median_cps = if count % 2 == 1 {
            speeds[count / 2]
        } else {
            (speeds[count / 2 - 1] + speeds[count / 2]) / 2.0
        };

        Self {
            block_count: count,
            total_chars,
            avg_cps: speeds.iter().sum::<f64>() / count as f64,
            median_cps,
            max_cps: speeds[count - 1],
            avg_cpl: total_chars as f64 / count as f64,
            max_cpl: entries.iter().map(|e| e.char_count()).max().unwrap_or(0),
            avg_duration_ms: total_duration / count as u64,
            above_target,
            above_hard_max,
            over_cpl: count_where(&|e: &SubtitleEntry| e.char_count() > constraints.max_chars_per_line),
            under_min_duration: count_where(&|e: &SubtitleEntry| e.duration_ms() < constraints.min_duration_ms),
            over_max_duration: count_where(&|e: &SubtitleEntry| e.duration_ms() > constraints.max_duration_ms),
            overlaps,
            small_gaps,
        }
    }
}

impl fmt::Display for TrackStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blocks: {}", self.block_count)?;
        writeln!(
            f,
            "CPS: avg {:.1}, median {:.1}, max {:.1} ({} above target, {} above hard max)",
            self.avg_cps, self.median_cps, self.max_cps, self.above_target, self.above_hard_max
        )?;
        writeln!(f, "CPL: avg {:.1}, max {} ({} over limit)", self.avg_cpl, self.max_cpl, self.over_cpl)?;
        writeln!(
            f,
            "Duration: avg {}ms ({} too short, {} too long)",
            self.avg_duration_ms, self.under_min_duration, self.over_max_duration
        )?;
        write!(f, "Gaps: {} overlaps, {} below minimum", self.overlaps, self.small_gaps)
    }
}
