use std::fmt;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};
use crate::errors::InputParseError;
use crate::file_utils::FileManager;

// @module: Subtitle track parsing, formatting and writing

// @const: SRT timestamp line regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})").unwrap()
});

// @const: Single timecode regex
static TIMECODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})$").unwrap()
});

// @struct: Single subtitle entry (one block of a finished track)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: Time range and non-empty text
    pub fn new_validated(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Result<Self> {
        if end_time_ms <= start_time_ms {
            return Err(anyhow!(
                "Invalid time range: end time {} <= start time {}",
                end_time_ms, start_time_ms
            ));
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow!("Empty subtitle text for entry {}", seq_num));
        }

        Ok(SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text: trimmed_text.to_string(),
        })
    }

    /// Parse an `HH:MM:SS,mmm` timecode to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, InputParseError> {
        let caps = TIMECODE_REGEX
            .captures(timestamp.trim())
            .ok_or_else(|| InputParseError::Timecode(timestamp.to_string()))?;
        Self::timestamp_from_captures(&caps, 1)
            .ok_or_else(|| InputParseError::Timecode(timestamp.to_string()))
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Display duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }

    /// Number of characters shown on screen
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    // Minutes and seconds must be below 60; hours are unbounded
    fn timestamp_from_captures(caps: &regex::Captures, start_idx: usize) -> Option<u64> {
        let field = |offset: usize| -> Option<u64> {
            caps.get(start_idx + offset)?.as_str().parse().ok()
        };
        let (hours, minutes, seconds, millis) = (field(0)?, field(1)?, field(2)?, field(3)?);
        if minutes >= 60 || seconds >= 60 {
            return None;
        }
        hours
            .checked_mul(3_600_000)?
            .checked_add(minutes * 60_000 + seconds * 1_000 + millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Collection of subtitle entries with the file they came from
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Create a new subtitle collection
    pub fn new(source_file: PathBuf, entries: Vec<SubtitleEntry>) -> Self {
        SubtitleCollection {
            source_file,
            entries,
        }
    }

    /// Load an SRT file
    pub fn from_srt_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;
        Ok(Self::new(path.to_path_buf(), entries))
    }

    /// Load a mapping file (`index | start | end | text` per line)
    pub fn from_mapping_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        let entries = Self::parse_mapping_string(&content)
            .with_context(|| format!("Failed to parse mapping file: {}", path.display()))?;
        Ok(Self::new(path.to_path_buf(), entries))
    }

    /// Render the collection as SRT text
    pub fn to_srt_string(&self) -> String {
        Self::render_srt(&self.entries)
    }

    /// Render entries as SRT text
    pub fn render_srt(entries: &[SubtitleEntry]) -> String {
        entries.iter().map(|entry| entry.to_string()).collect()
    }

    /// Write subtitles to an SRT file, replacing it atomically
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        FileManager::write_atomic(path, &self.to_srt_string())
    }

    /// Parse SRT format string into subtitle entries
    ///
    /// Malformed entries are skipped with a warning. Entries are sorted by
    /// start time and renumbered from 1.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
        let mut entries = Self::parse_srt_raw(content)?;

        entries.sort_by_key(|entry| entry.start_time_ms);

        let overlap_count = entries
            .windows(2)
            .filter(|pair| pair[0].end_time_ms > pair[1].start_time_ms)
            .count();
        if overlap_count > 0 {
            warn!("Found {} overlapping subtitle entries", overlap_count);
        }

        for (i, entry) in entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }

        debug!("Parsed {} subtitle entries", entries.len());
        Ok(entries)
    }

    /// Parse SRT entries in file order, keeping their own numbers
    pub fn parse_srt_raw(content: &str) -> Result<Vec<SubtitleEntry>> {
        Self::parse_srt_blocks(content, false)
    }

    /// Parse SRT entries in file order without dropping invalid ones
    ///
    /// Entries whose end is not after their start, or whose text is empty,
    /// are kept as written so that a validator can report them.
    pub fn parse_srt_unchecked(content: &str) -> Result<Vec<SubtitleEntry>> {
        Self::parse_srt_blocks(content, true)
    }

    fn parse_srt_blocks(content: &str, keep_invalid: bool) -> Result<Vec<SubtitleEntry>> {
        let mut entries = Vec::new();

        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut add_current_entry = |seq_num: usize, start_ms: u64, end_ms: u64, text: &str| {
            if keep_invalid {
                entries.push(SubtitleEntry::new(seq_num, start_ms, end_ms, text.trim().to_string()));
                return;
            }
            match SubtitleEntry::new_validated(seq_num, start_ms, end_ms, text.to_string()) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping invalid subtitle entry {}: {}", seq_num, e),
            }
        };

        // Strip a UTF-8 byte order mark if present
        let content = content.trim_start_matches('\u{feff}');

        for (line_idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if let (Some(seq_num), Some((start_ms, end_ms))) = (current_seq_num, current_times) {
                    if keep_invalid || !current_text.is_empty() {
                        add_current_entry(seq_num, start_ms, end_ms, &current_text);
                        current_seq_num = None;
                        current_times = None;
                        current_text.clear();
                    }
                }
                continue;
            }

            if current_seq_num.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    match (
                        SubtitleEntry::timestamp_from_captures(&caps, 1),
                        SubtitleEntry::timestamp_from_captures(&caps, 5),
                    ) {
                        (Some(start_ms), Some(end_ms)) => {
                            current_times = Some((start_ms, end_ms));
                            continue;
                        }
                        _ => warn!("Invalid timestamp format at line {}: {}", line_idx + 1, trimmed),
                    }
                }
            }

            if current_seq_num.is_some() && current_times.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_idx + 1, trimmed);
            }
        }

        if let (Some(seq_num), Some((start_ms, end_ms))) = (current_seq_num, current_times) {
            if keep_invalid || !current_text.is_empty() {
                add_current_entry(seq_num, start_ms, end_ms, &current_text);
            }
        }

        if entries.is_empty() {
            warn!("No valid subtitle entries found in content");
            return Err(InputParseError::Empty.into());
        }

        Ok(entries)
    }

    /// Parse a mapping file into subtitle entries
    ///
    /// Each non-blank line that does not start with `#` must read
    /// `index | start | end | text`. The text may itself contain `|`.
    /// Unlike SRT input, a bad row fails the whole unit.
    pub fn parse_mapping_string(content: &str) -> Result<Vec<SubtitleEntry>, InputParseError> {
        let mut entries = Vec::new();

        for (line_idx, line) in content.trim_start_matches('\u{feff}').lines().enumerate() {
            let line_no = line_idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let row_error = |reason: String| InputParseError::MappingRow { line: line_no, reason };

            let parts: Vec<&str> = trimmed.splitn(4, '|').map(str::trim).collect();
            if parts.len() != 4 {
                return Err(row_error(format!("expected 4 fields, found {}", parts.len())));
            }

            let seq_num: usize = parts[0]
                .parse()
                .map_err(|_| row_error(format!("invalid block number '{}'", parts[0])))?;
            let start_ms = SubtitleEntry::parse_timestamp(parts[1])
                .map_err(|e| row_error(e.to_string()))?;
            let end_ms = SubtitleEntry::parse_timestamp(parts[2])
                .map_err(|e| row_error(e.to_string()))?;

            if end_ms <= start_ms {
                return Err(row_error(format!(
                    "end {} is not after start {}",
                    parts[2], parts[1]
                )));
            }
            if parts[3].is_empty() {
                return Err(row_error("empty text".to_string()));
            }

            entries.push(SubtitleEntry::new(seq_num, start_ms, end_ms, parts[3].to_string()));
        }

        if entries.is_empty() {
            return Err(InputParseError::Empty);
        }

        entries.sort_by_key(|entry| entry.start_time_ms);
        Ok(entries)
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
