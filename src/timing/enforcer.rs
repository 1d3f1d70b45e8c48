/*!
 * Multi-pass constraint enforcement.
 *
 * Each pass walks the lines in order and, for every line, resolves the most
 * important violation first:
 *
 * 1. `LineTooLong` / `DurationHigh`: split the line (new lines are timed from
 *    their own words and the region is evaluated again)
 * 2. `DurationLow` / `CpsHigh`: extend the end up to the next line, shift the
 *    start earlier within a bounded lead-in, borrow time from a low-density
 *    neighbour, then move a short chain of lines towards spare time a few
 *    lines away
 * 3. `GapViolation`: trim the earlier end, never below the minimum duration,
 *    then pull back the next start if it began before its first word
 *
 * Passes repeat until nothing changes or the pass limit is hit. Whatever is
 * still violated afterwards is reported as `constraint-unresolvable`; the
 * lines are returned either way.
 */

use log::{debug, warn};

use crate::app_config::ConstraintConfig;
use crate::validation::diagnostics::{Diagnostic, Rule};
use super::resolver::TimingResolver;
use super::segment::Block;
use super::splitter::SegmentSplitter;

/// How many lines away chain borrowing looks for spare time
const CHAIN_RADIUS: usize = 8;

/// Smallest shift worth moving a chain of lines for
const MIN_CHAIN_SHIFT_MS: u64 = 30;

/// Most important violation of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Ok,
    LineTooLong,
    CpsHigh,
    DurationLow,
    DurationHigh,
    GapViolation,
}

/// Lines after enforcement plus everything that could not be fixed
#[derive(Debug, Clone)]
pub struct EnforcementOutcome {
    pub blocks: Vec<Block>,
    pub diagnostics: Vec<Diagnostic>,
    pub passes: usize,
    pub converged: bool,
}

/// Drives lines towards the readability constraints
pub struct ConstraintEnforcer<'a> {
    constraints: &'a ConstraintConfig,
    splitter: &'a SegmentSplitter,
    resolver: &'a TimingResolver<'a>,
}

impl<'a> ConstraintEnforcer<'a> {
    pub fn new(
        constraints: &'a ConstraintConfig,
        splitter: &'a SegmentSplitter,
        resolver: &'a TimingResolver<'a>,
    ) -> Self {
        Self {
            constraints,
            splitter,
            resolver,
        }
    }

    /// Run passes until the lines stop changing or the pass limit is reached
    pub fn enforce(&self, mut blocks: Vec<Block>) -> EnforcementOutcome {
        let mut passes = 0;
        let mut converged = false;

        while passes < self.constraints.max_passes {
            passes += 1;
            if !self.run_pass(&mut blocks) {
                converged = true;
                break;
            }
        }

        if self.constraints.chaining {
            self.chain_gaps(&mut blocks);
        }

        let mut diagnostics = self.unresolved(&blocks);
        if converged {
            debug!("Enforcement converged after {} passes", passes);
        } else {
            warn!("Enforcement stopped after {} passes without converging", passes);
            diagnostics.push(Diagnostic::warning(
                None,
                Rule::NotConverged,
                format!("Lines were still changing after {} passes", passes),
            ));
        }

        EnforcementOutcome {
            blocks,
            diagnostics,
            passes,
            converged,
        }
    }

    /// Most important violation of line `i`
    pub fn state(&self, blocks: &[Block], i: usize) -> BlockState {
        let c = self.constraints;
        let block = &blocks[i];

        if block.char_count() > c.max_chars_per_line && !block.overlong {
            BlockState::LineTooLong
        } else if block.duration_ms() > c.max_duration_ms && !self.is_exempt(blocks, i) {
            BlockState::DurationHigh
        } else if block.duration_ms() < c.min_duration_ms {
            BlockState::DurationLow
        } else if block.cps() > c.cps_target {
            BlockState::CpsHigh
        } else if self.gap_violated(blocks, i) {
            BlockState::GapViolation
        } else {
            BlockState::Ok
        }
    }

    // One full walk over the lines; true when anything changed
    fn run_pass(&self, blocks: &mut Vec<Block>) -> bool {
        let mut changed = false;
        let mut i = 0;

        while i < blocks.len() {
            match self.state(blocks, i) {
                BlockState::LineTooLong => {
                    if self.split_line(blocks, i) {
                        changed = true;
                        continue;
                    }
                }
                BlockState::DurationHigh => {
                    if self.split_duration(blocks, i) {
                        changed = true;
                        continue;
                    }
                }
                _ => {}
            }

            if matches!(self.state(blocks, i), BlockState::DurationLow | BlockState::CpsHigh) {
                changed |= self.improve_readability(blocks, i);
            }

            if self.gap_violated(blocks, i) {
                changed |= self.fix_gap(blocks, i);
            }

            i += 1;
        }

        changed
    }

    fn is_exempt(&self, blocks: &[Block], i: usize) -> bool {
        self.constraints.final_block_unbounded && i + 1 == blocks.len()
    }

    fn gap_violated(&self, blocks: &[Block], i: usize) -> bool {
        blocks
            .get(i + 1)
            .is_some_and(|next| blocks[i].end_ms + self.constraints.min_gap_ms > next.start_ms)
    }

    // Replace a too-long line with its split pieces
    fn split_line(&self, blocks: &mut Vec<Block>, i: usize) -> bool {
        let pieces = self.splitter.split(&blocks[i].text);
        if pieces.len() < 2 {
            blocks[i].overlong = true;
            return false;
        }
        let block = &blocks[i];
        let replacement = self.resolver.blocks_for(block.segment_id, &pieces, block.tokens.first);
        debug!("Split \"{}\" into {} lines", block.text, replacement.len());
        blocks.splice(i..=i, replacement);
        true
    }

    // Split a line shown for too long in two, or cut it if it is a single word
    fn split_duration(&self, blocks: &mut Vec<Block>, i: usize) -> bool {
        let block = &blocks[i];
        match self.splitter.split_in_two(&block.text) {
            Some((left, right)) => {
                let replacement =
                    self.resolver.blocks_for(block.segment_id, &[left, right], block.tokens.first);
                debug!("Split long-running \"{}\"", block.text);
                blocks.splice(i..=i, replacement);
                true
            }
            None => {
                let end = block.start_ms + self.constraints.max_duration_ms;
                blocks[i].end_ms = end;
                true
            }
        }
    }

    fn improve_readability(&self, blocks: &mut [Block], i: usize) -> bool {
        let desired = self.constraints.desired_duration_ms(blocks[i].char_count());
        let mut changed = false;

        let steps: [fn(&Self, &mut [Block], usize, u64) -> bool; 6] = [
            Self::extend_end,
            Self::shift_start,
            Self::borrow_from_previous,
            Self::borrow_from_next,
            Self::chain_from_previous,
            Self::chain_from_next,
        ];
        for step in steps {
            if blocks[i].duration_ms() >= desired {
                break;
            }
            changed |= step(self, blocks, i, desired);
        }

        changed
    }

    // Extend into the free time before the next line
    fn extend_end(&self, blocks: &mut [Block], i: usize, desired: u64) -> bool {
        let c = self.constraints;
        let block = &blocks[i];
        let limit = match blocks.get(i + 1) {
            Some(next) => next.start_ms.saturating_sub(c.min_gap_ms),
            None => block.end_ms.max(block.speech.end_ms + c.last_block_pad_ms),
        };
        let new_end = (block.start_ms + desired).min(limit);
        if new_end > block.end_ms {
            blocks[i].end_ms = new_end;
            true
        } else {
            false
        }
    }

    // Start before the first word, bounded by the previous line and the lead-in
    fn shift_start(&self, blocks: &mut [Block], i: usize, desired: u64) -> bool {
        let new_start = blocks[i].end_ms.saturating_sub(desired).max(self.start_floor(blocks, i));
        if new_start < blocks[i].start_ms {
            blocks[i].start_ms = new_start;
            true
        } else {
            false
        }
    }

    fn start_floor(&self, blocks: &[Block], i: usize) -> u64 {
        let c = self.constraints;
        let lead_in = blocks[i].speech.start_ms.saturating_sub(c.max_lead_in_ms);
        match i.checked_sub(1).map(|p| &blocks[p]) {
            Some(prev) => lead_in.max(prev.end_ms + c.min_gap_ms),
            None => lead_in,
        }
    }

    // Shortest duration a neighbour may be compressed to
    fn compressible_to(&self, block: &Block) -> u64 {
        self.constraints
            .desired_duration_ms(block.char_count())
            .min(block.duration_ms())
    }

    // Take the previous line's spare time and start earlier
    fn borrow_from_previous(&self, blocks: &mut [Block], i: usize, desired: u64) -> bool {
        let c = self.constraints;
        if i == 0 {
            return false;
        }

        let lead_in = blocks[i].speech.start_ms.saturating_sub(c.max_lead_in_ms);
        let wanted_start = blocks[i].end_ms.saturating_sub(desired).max(lead_in);
        if wanted_start >= blocks[i].start_ms {
            return false;
        }

        let prev = &blocks[i - 1];
        let prev_floor = prev.start_ms + self.compressible_to(prev);
        let new_prev_end = wanted_start.saturating_sub(c.min_gap_ms).max(prev_floor);
        if new_prev_end >= prev.end_ms {
            return false;
        }

        blocks[i - 1].end_ms = new_prev_end;
        let new_start = wanted_start.max(new_prev_end + c.min_gap_ms);
        if new_start < blocks[i].start_ms {
            debug!("Line {} borrowed {}ms from the previous line", i + 1, blocks[i].start_ms - new_start);
            blocks[i].start_ms = new_start;
        }
        true
    }

    // Take the next line's spare time and end later
    fn borrow_from_next(&self, blocks: &mut [Block], i: usize, desired: u64) -> bool {
        let c = self.constraints;
        if i + 1 >= blocks.len() {
            return false;
        }

        let wanted_end = blocks[i].start_ms + desired;
        if wanted_end <= blocks[i].end_ms {
            return false;
        }

        let next = &blocks[i + 1];
        let next_ceiling = next.end_ms.saturating_sub(self.compressible_to(next));
        let new_next_start = (wanted_end + c.min_gap_ms).min(next_ceiling);
        if new_next_start <= next.start_ms {
            return false;
        }

        blocks[i + 1].start_ms = new_next_start;
        let new_end = wanted_end.min(new_next_start.saturating_sub(c.min_gap_ms));
        if new_end > blocks[i].end_ms {
            debug!("Line {} borrowed {}ms from the next line", i + 1, new_end - blocks[i].end_ms);
            blocks[i].end_ms = new_end;
        }
        true
    }

    // How far a line may move later before it lags its words too much
    fn room_later(&self, block: &Block) -> u64 {
        let latest = (block.speech.start_ms + self.constraints.max_lead_in_ms)
            .min(block.speech.end_ms.saturating_sub(1));
        latest.saturating_sub(block.start_ms)
    }

    // How far a line may move earlier, bounded by the lead-in and its first word
    fn room_earlier(&self, block: &Block) -> u64 {
        let lead_in = block.start_ms.saturating_sub(self.earliest_start(block));
        let spoken = block.end_ms.saturating_sub(block.speech.start_ms + 1);
        lead_in.min(spoken)
    }

    fn earliest_start(&self, block: &Block) -> u64 {
        block.speech.start_ms.saturating_sub(self.constraints.max_lead_in_ms)
    }

    /// Pull the lines between an earlier source of spare time and line `i`
    /// earlier, handing the time to line `i`
    ///
    /// Sources are gaps wider than the minimum and lines shown longer than
    /// they need, at most `CHAIN_RADIUS` lines back. Every moved line keeps
    /// its duration.
    fn chain_from_previous(&self, blocks: &mut [Block], i: usize, desired: u64) -> bool {
        let c = self.constraints;
        let mut changed = false;

        for j in (i.saturating_sub(CHAIN_RADIUS)..i).rev() {
            let needed = desired.saturating_sub(blocks[i].duration_ms());
            if needed == 0 {
                break;
            }
            let chain_room = blocks[j + 1..i]
                .iter()
                .map(|b| self.room_earlier(b))
                .min()
                .unwrap_or(u64::MAX)
                .min(blocks[i].start_ms.saturating_sub(self.earliest_start(&blocks[i])));

            let free = blocks[j + 1].start_ms.saturating_sub(blocks[j].end_ms + c.min_gap_ms);
            let give = needed.min(free).min(chain_room);
            if give >= MIN_CHAIN_SHIFT_MS {
                Self::pull_earlier(blocks, j + 1, i, give);
                changed = true;
                continue;
            }

            let donor = &blocks[j];
            let slack = donor.duration_ms() - self.compressible_to(donor);
            let give = needed.min(slack).min(chain_room);
            if give >= MIN_CHAIN_SHIFT_MS {
                blocks[j].end_ms -= give;
                Self::pull_earlier(blocks, j + 1, i, give);
                changed = true;
            }
        }

        if changed {
            debug!("Line {} borrowed time along the lines before it", i + 1);
        }
        changed
    }

    /// Push the lines between line `i` and a later source of spare time
    /// later, handing the time to line `i`
    ///
    /// Besides gaps and slow lines, the free time after the last line (up to
    /// `last_block_pad_ms` past its words) is a source.
    fn chain_from_next(&self, blocks: &mut [Block], i: usize, desired: u64) -> bool {
        let c = self.constraints;
        let mut changed = false;

        for j in (i + 1)..=(i + CHAIN_RADIUS).min(blocks.len()) {
            let needed = desired.saturating_sub(blocks[i].duration_ms());
            if needed == 0 {
                break;
            }
            let chain_room = blocks[i + 1..j]
                .iter()
                .map(|b| self.room_later(b))
                .min()
                .unwrap_or(u64::MAX);

            // Free time in front of line j, or after the last line
            let free = match blocks.get(j) {
                Some(next) => next.start_ms.saturating_sub(blocks[j - 1].end_ms + c.min_gap_ms),
                None => {
                    let tail = &blocks[j - 1];
                    (tail.speech.end_ms + c.last_block_pad_ms).saturating_sub(tail.end_ms)
                }
            };
            let give = needed.min(free).min(chain_room);
            if give >= MIN_CHAIN_SHIFT_MS {
                Self::push_later(blocks, i, j, give);
                changed = true;
                continue;
            }

            let Some(donor) = blocks.get(j) else {
                break;
            };
            let slack = donor.duration_ms() - self.compressible_to(donor);
            let give = needed.min(slack).min(chain_room).min(self.room_later(donor));
            if give >= MIN_CHAIN_SHIFT_MS {
                Self::push_later(blocks, i, j, give);
                blocks[j].start_ms += give;
                changed = true;
            }
        }

        if changed {
            debug!("Line {} borrowed time along the lines after it", i + 1);
        }
        changed
    }

    // Lines from..i move earlier by `give`; line i only starts earlier
    fn pull_earlier(blocks: &mut [Block], from: usize, i: usize, give: u64) {
        for block in &mut blocks[from..i] {
            block.start_ms -= give;
            block.end_ms -= give;
        }
        blocks[i].start_ms -= give;
    }

    // Lines i+1..to move later by `give`; line i only ends later
    fn push_later(blocks: &mut [Block], i: usize, to: usize, give: u64) {
        for block in &mut blocks[i + 1..to] {
            block.start_ms += give;
            block.end_ms += give;
        }
        blocks[i].end_ms += give;
    }

    // Trim this line's end, then undo the next line's lead-in if still needed
    //
    // The next start never moves past its first word; a gap that needs more
    // is left to `unresolved`.
    fn fix_gap(&self, blocks: &mut [Block], i: usize) -> bool {
        let c = self.constraints;
        let mut changed = false;

        let wanted_end = blocks[i + 1].start_ms.saturating_sub(c.min_gap_ms);
        let block = &blocks[i];
        let end_floor = (block.start_ms + c.min_duration_ms).min(block.end_ms);
        let new_end = wanted_end.max(end_floor).max(block.start_ms + 1);
        if new_end < block.end_ms {
            blocks[i].end_ms = new_end;
            changed = true;
        }

        let needed_start = blocks[i].end_ms + c.min_gap_ms;
        let next = &blocks[i + 1];
        if needed_start > next.start_ms {
            let new_start = needed_start.min(next.speech.start_ms);
            let next_floor = c.min_duration_ms.min(next.duration_ms());
            if new_start > next.start_ms && next.end_ms.saturating_sub(new_start) >= next_floor {
                blocks[i + 1].start_ms = new_start;
                changed = true;
            }
        }

        changed
    }

    // Close gaps of 3 to 11 frames down to exactly the minimum gap
    fn chain_gaps(&self, blocks: &mut [Block]) {
        let c = self.constraints;
        let frame = c.frame_ms();
        let mut chained = 0;

        for i in 0..blocks.len().saturating_sub(1) {
            let next_start = blocks[i + 1].start_ms;
            let gap = next_start.saturating_sub(blocks[i].end_ms);
            if gap <= c.min_gap_ms || gap < 3 * frame || gap > 11 * frame {
                continue;
            }
            let new_end = next_start - c.min_gap_ms;
            if new_end - blocks[i].start_ms <= c.max_duration_ms {
                blocks[i].end_ms = new_end;
                chained += 1;
            }
        }

        debug!("Chained {} small gaps", chained);
    }

    // Everything still violated after the last pass
    fn unresolved(&self, blocks: &[Block]) -> Vec<Diagnostic> {
        let c = self.constraints;
        let mut diagnostics = Vec::new();
        let mut report = |i: usize, message: String| {
            diagnostics.push(Diagnostic::warning(Some(i + 1), Rule::ConstraintUnresolvable, message));
        };

        for (i, block) in blocks.iter().enumerate() {
            let chars = block.char_count();
            if chars > c.max_chars_per_line {
                report(i, format!(
                    "Line has {} characters (max {}) and no legal split point",
                    chars, c.max_chars_per_line
                ));
            }
            if block.cps() > c.cps_hard_max {
                report(i, format!(
                    "Reading speed {:.1} CPS stays above the hard maximum {:.1} after extending, shifting and borrowing",
                    block.cps(), c.cps_hard_max
                ));
            }
            if block.duration_ms() < c.min_duration_ms {
                report(i, format!(
                    "Duration {}ms stays below the minimum {}ms",
                    block.duration_ms(), c.min_duration_ms
                ));
            }
            if block.duration_ms() > c.max_duration_ms && !self.is_exempt(blocks, i) {
                report(i, format!(
                    "Duration {}ms stays above the maximum {}ms",
                    block.duration_ms(), c.max_duration_ms
                ));
            }
            if let Some(next) = blocks.get(i + 1) {
                if block.end_ms + c.min_gap_ms > next.start_ms {
                    report(i, format!(
                        "Gap to the next line cannot reach {}ms without breaking a minimum duration",
                        c.min_gap_ms
                    ));
                }
            }
        }

        diagnostics
    }
}
