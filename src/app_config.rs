use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// The configuration value is immutable once validated and is passed by
/// reference into every optimizer stage.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Readability thresholds and enforcement limits
    #[serde(default)]
    pub constraints: ConstraintConfig,

    /// Boundary detection settings for segment splitting
    #[serde(default)]
    pub splitter: SplitterConfig,

    /// Offset detection settings
    #[serde(default)]
    pub offset: OffsetConfig,

    /// Batch processing settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Readability thresholds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConstraintConfig {
    // @field: Max characters on the single subtitle line
    #[serde(default = "default_max_chars_per_line")]
    pub max_chars_per_line: usize,

    // @field: Reading speed the enforcer aims for
    #[serde(default = "default_cps_target")]
    pub cps_target: f64,

    // @field: Reading speed that must never be exceeded silently
    #[serde(default = "default_cps_hard_max")]
    pub cps_hard_max: f64,

    // @field: Residual CPS above the hard max that is reported as a warning instead of an error
    #[serde(default)]
    pub cps_acceptable_excess: f64,

    // @field: Minimum display duration
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,

    // @field: Maximum display duration
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    // @field: Minimum gap between consecutive blocks
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u64,

    // @field: Full enforcement passes before giving up
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,

    // @field: How far a block may start before its first spoken word
    #[serde(default = "default_max_lead_in_ms")]
    pub max_lead_in_ms: u64,

    // @field: How far the last block may run past its last spoken word
    #[serde(default = "default_last_block_pad_ms")]
    pub last_block_pad_ms: u64,

    // @field: Exempt the final block from the maximum duration
    #[serde(default)]
    pub final_block_unbounded: bool,

    // @field: Close small gaps (3 to 11 frames) down to the minimum gap
    #[serde(default)]
    pub chaining: bool,

    // @field: Frame rate used by gap chaining
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            max_chars_per_line: default_max_chars_per_line(),
            cps_target: default_cps_target(),
            cps_hard_max: default_cps_hard_max(),
            cps_acceptable_excess: 0.0,
            min_duration_ms: default_min_duration_ms(),
            max_duration_ms: default_max_duration_ms(),
            min_gap_ms: default_min_gap_ms(),
            max_passes: default_max_passes(),
            max_lead_in_ms: default_max_lead_in_ms(),
            last_block_pad_ms: default_last_block_pad_ms(),
            final_block_unbounded: false,
            chaining: false,
            fps: default_fps(),
        }
    }
}

impl ConstraintConfig {
    /// Duration a text needs to be read at the given speed, in whole milliseconds
    pub fn duration_for_cps(char_count: usize, cps: f64) -> u64 {
        if char_count == 0 || cps <= 0.0 {
            return 0;
        }
        (char_count as f64 * 1000.0 / cps).ceil() as u64
    }

    /// Duration a text needs to satisfy both the target speed and the minimum duration
    pub fn desired_duration_ms(&self, char_count: usize) -> u64 {
        Self::duration_for_cps(char_count, self.cps_target)
            .max(self.min_duration_ms)
            .min(self.max_duration_ms)
    }

    /// Length of one frame, rounded to the nearest millisecond
    pub fn frame_ms(&self) -> u64 {
        ((1000.0 / self.fps.max(1) as f64).round() as u64).max(1)
    }
}

/// Boundary detection settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SplitterConfig {
    /// Words that start a subordinate or coordinate clause
    #[serde(default = "default_conjunctions")]
    pub conjunctions: Vec<String>,

    /// Words that start a prepositional phrase
    #[serde(default = "default_prepositions")]
    pub prepositions: Vec<String>,

    /// Characters that end a sentence
    #[serde(default = "default_sentence_marks")]
    pub sentence_marks: String,

    /// Characters that end a clause
    #[serde(default = "default_clause_marks")]
    pub clause_marks: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            conjunctions: default_conjunctions(),
            prepositions: default_prepositions(),
            sentence_marks: default_sentence_marks(),
            clause_marks: default_clause_marks(),
        }
    }
}

/// Offset detection settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OffsetConfig {
    // @field: Max residual deviation for a constant offset
    #[serde(default = "default_offset_tolerance_ms")]
    pub tolerance_ms: u64,

    // @field: Minimum matched blocks
    #[serde(default = "default_min_anchors")]
    pub min_anchors: usize,

    // @field: Share of the shorter track that must be matched
    #[serde(default = "default_min_match_ratio")]
    pub min_match_ratio: f64,
}

impl Default for OffsetConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: default_offset_tolerance_ms(),
            min_anchors: default_min_anchors(),
            min_match_ratio: default_min_match_ratio(),
        }
    }
}

/// Batch processing settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchConfig {
    // @field: Units optimized at the same time
    #[serde(default = "default_concurrent_jobs")]
    pub concurrent_jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrent_jobs: default_concurrent_jobs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_max_chars_per_line() -> usize {
    42
}

fn default_cps_target() -> f64 {
    15.0
}

fn default_cps_hard_max() -> f64 {
    20.0
}

fn default_min_duration_ms() -> u64 {
    1200
}

fn default_max_duration_ms() -> u64 {
    7000
}

fn default_min_gap_ms() -> u64 {
    80
}

fn default_max_passes() -> usize {
    12
}

fn default_max_lead_in_ms() -> u64 {
    1500
}

fn default_last_block_pad_ms() -> u64 {
    2000
}

fn default_fps() -> u32 {
    24
}

fn default_offset_tolerance_ms() -> u64 {
    500
}

fn default_min_anchors() -> usize {
    3
}

fn default_min_match_ratio() -> f64 {
    0.9
}

fn default_concurrent_jobs() -> usize {
    4
}

fn default_sentence_marks() -> String {
    ".!?…".to_string()
}

fn default_clause_marks() -> String {
    ",;:—–".to_string()
}

fn default_conjunctions() -> Vec<String> {
    [
        // Ukrainian
        "що", "який", "яка", "яке", "які", "і", "та", "але", "бо", "тому", "коли", "де", "як",
        "ні", "або", "чи", "адже", "проте", "однак", "якщо", "хоча",
        // English
        "and", "but", "or", "because", "so", "that", "which", "who", "when", "where", "while",
        "if", "although", "though", "unless",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
}

fn default_prepositions() -> Vec<String> {
    [
        // Ukrainian
        "в", "у", "на", "з", "із", "від", "до", "для", "без", "через", "після", "перед", "між",
        "під", "над", "за", "при", "про", "по",
        // English
        "in", "on", "at", "to", "for", "from", "with", "without", "about", "into", "over",
        "under", "after", "before", "between", "through", "of", "by",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let c = &self.constraints;

        if c.max_chars_per_line == 0 {
            return Err(anyhow!("max_chars_per_line must be greater than zero"));
        }

        if c.cps_target <= 0.0 || c.cps_hard_max <= 0.0 {
            return Err(anyhow!("Reading speed limits must be positive"));
        }

        if c.cps_target > c.cps_hard_max {
            return Err(anyhow!(
                "cps_target ({}) cannot exceed cps_hard_max ({})",
                c.cps_target, c.cps_hard_max
            ));
        }

        if c.cps_acceptable_excess < 0.0 {
            return Err(anyhow!("cps_acceptable_excess cannot be negative"));
        }

        if c.min_duration_ms >= c.max_duration_ms {
            return Err(anyhow!(
                "min_duration_ms ({}) must be lower than max_duration_ms ({})",
                c.min_duration_ms, c.max_duration_ms
            ));
        }

        if c.max_passes == 0 {
            return Err(anyhow!("max_passes must be at least 1"));
        }

        if c.fps == 0 {
            return Err(anyhow!("fps must be greater than zero"));
        }

        if self.offset.min_anchors == 0 {
            return Err(anyhow!("offset.min_anchors must be at least 1"));
        }

        if !(0.0..=1.0).contains(&self.offset.min_match_ratio) {
            return Err(anyhow!("offset.min_match_ratio must be between 0 and 1"));
        }

        if self.batch.concurrent_jobs == 0 {
            return Err(anyhow!("batch.concurrent_jobs must be at least 1"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            constraints: ConstraintConfig::default(),
            splitter: SplitterConfig::default(),
            offset: OffsetConfig::default(),
            batch: BatchConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
