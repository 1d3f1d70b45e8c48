use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::app_config::Config;
use crate::file_utils::{FileManager, InputKind};
use crate::offset::OffsetAligner;
use crate::optimizer::{OptimizedTrack, Optimizer};
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use crate::text_export;
use crate::timing::segment::TimeRange;
use crate::timing::time_source::{TimeSource, TimedText};
use crate::validation::diagnostics::sort_diagnostics;
use crate::validation::service::{ValidationReport, Validator};
use crate::validation::text::TextValidator;

// @module: Application controller for subtitle optimization

/// One unit of work: an input and where its results go
#[derive(Debug, Clone)]
pub struct OptimizeJob {
    // @field: Input file (SRT, mapping or aligned JSON)
    pub input: PathBuf,

    // @field: Optimized SRT destination
    pub output: PathBuf,

    // @field: Optional text report destination
    pub report: Option<PathBuf>,

    // @field: Optional aligned JSON whose segments mark where speech happens
    pub reference: Option<PathBuf>,

    // @field: Optional transcript the track must reproduce word for word
    pub transcript: Option<PathBuf>,

    // @field: Input kind; detected from the file when absent
    pub kind: Option<InputKind>,
}

impl OptimizeJob {
    /// Job writing `<stem>.optimized.srt` and `<stem>.report.txt` into `output_dir`
    pub fn for_batch(input: PathBuf, output_dir: &Path) -> Self {
        Self {
            output: FileManager::generate_output_path(&input, output_dir, "optimized", "srt"),
            report: Some(FileManager::generate_output_path(&input, output_dir, "report", "txt")),
            reference: None,
            transcript: None,
            kind: None,
            input,
        }
    }
}

/// What happened to one unit
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub valid: bool,
    pub errors: usize,
    pub warnings: usize,
    pub digest: String,
}

/// Results of a batch, in input order
#[derive(Debug)]
pub struct BatchSummary {
    pub results: Vec<(PathBuf, Result<UnitOutcome>)>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.as_ref().is_ok_and(|o| o.valid)).count()
    }

    /// Units that produced a track with error diagnostics
    pub fn invalid(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.as_ref().is_ok_and(|o| !o.valid)).count()
    }

    /// Units that produced no track at all
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.succeeded() == self.results.len()
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load an input file as timed text
    pub fn load_input(path: &Path, kind: Option<InputKind>) -> Result<TimedText> {
        let kind = match kind {
            Some(kind) => kind,
            None => FileManager::detect_input_kind(path)?,
        };
        let content = FileManager::read_to_string(path)?;
        debug!("Loading {} as {:?}", path.display(), kind);

        let timed = match kind {
            InputKind::Srt => TimeSource::from_entries(&SubtitleCollection::parse_srt_string(&content)?),
            InputKind::Mapping => TimeSource::from_entries(&SubtitleCollection::parse_mapping_string(&content)?),
            InputKind::Aligned => TimeSource::from_aligned_json(&content)?,
        };
        Ok(timed)
    }

    /// Speech segments of an aligned JSON file, as timed entries
    pub fn load_reference(path: &Path) -> Result<Vec<SubtitleEntry>> {
        let content = FileManager::read_to_string(path)?;
        let timed = TimeSource::from_aligned_json(&content)
            .with_context(|| format!("Failed to parse reference file: {}", path.display()))?;
        Ok(timed.time_source.reference_track().to_vec())
    }

    /// Optimize one unit and publish its results
    pub fn run_job(&self, job: &OptimizeJob) -> Result<UnitOutcome> {
        process_job(&self.config, job)
    }

    /// Optimize every recognised input in a directory
    ///
    /// Units run concurrently on blocking workers. A unit that fails does not
    /// stop the others; results come back in input order.
    pub async fn run_batch(&self, input_dir: &Path, output_dir: Option<&Path>) -> Result<BatchSummary> {
        let start_time = std::time::Instant::now();

        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {}", input_dir.display()));
        }
        let inputs = FileManager::find_inputs(input_dir)?;
        if inputs.is_empty() {
            return Err(anyhow!("No subtitle inputs found in directory: {}", input_dir.display()));
        }

        let output_dir = output_dir.unwrap_or(input_dir).to_path_buf();
        FileManager::ensure_dir(&output_dir)?;

        let total = inputs.len();
        let progress_bar = ProgressBar::new(total as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Optimizing");

        let config = Arc::new(self.config.clone());
        let completed = Arc::new(AtomicUsize::new(0));
        let concurrency = self.config.batch.concurrent_jobs.max(1);
        info!("Optimizing {} files with {} workers", total, concurrency);

        let mut results = stream::iter(inputs.into_iter().enumerate())
            .map(|(index, input)| {
                let config = Arc::clone(&config);
                let completed = Arc::clone(&completed);
                let progress_bar = progress_bar.clone();
                let job = OptimizeJob::for_batch(input, &output_dir);

                async move {
                    let input = job.input.clone();
                    let result = tokio::task::spawn_blocking(move || process_job(&config, &job))
                        .await
                        .map_err(|e| anyhow!("Worker for {} stopped: {}", input.display(), e))
                        .and_then(|result| result);

                    if let Err(e) = &result {
                        error!("Error processing {}: {:#}", input.display(), e);
                    }
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_bar.set_position(done as u64);

                    (index, input, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;

        progress_bar.finish_and_clear();
        results.sort_by_key(|(index, _, _)| *index);

        let summary = BatchSummary {
            results: results.into_iter().map(|(_, input, result)| (input, result)).collect(),
        };
        info!(
            "Batch completed in {}: {} valid, {} with errors, {} failed",
            Self::format_duration(start_time.elapsed()),
            summary.succeeded(),
            summary.invalid(),
            summary.failed()
        );
        Ok(summary)
    }

    /// Validate an existing SRT file
    pub fn validate_file(
        &self,
        srt: &Path,
        transcript: Option<&Path>,
        reference: Option<&Path>,
        report: Option<&Path>,
    ) -> Result<ValidationReport> {
        let content = FileManager::read_to_string(srt)?;
        let entries = SubtitleCollection::parse_srt_unchecked(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", srt.display()))?;
        let source_text = transcript.map(FileManager::read_to_string).transpose()?;
        let speech = match reference {
            Some(path) => span_of(&Self::load_reference(path)?),
            None => None,
        };

        let validation = Validator::new(&self.config.constraints).validate(&entries, source_text.as_deref(), speech);
        if let Some(report) = report {
            write_report(report, &srt.display().to_string(), &validation.to_string())?;
        }
        Ok(validation)
    }

    /// Detect the offset that moves `srt1` onto `srt2`
    pub fn detect_offset(&self, srt1: &Path, srt2: &Path) -> Result<i64> {
        let track1 = SubtitleCollection::from_srt_file(srt1)?;
        let track2 = SubtitleCollection::from_srt_file(srt2)?;
        let offset = OffsetAligner::new(&self.config.offset).detect(&track1.entries, &track2.entries)?;
        Ok(offset)
    }

    /// Shift an SRT file by a constant offset; returns the number of lines written
    pub fn apply_offset(&self, srt: &Path, offset_ms: i64, output: &Path) -> Result<usize> {
        let collection = SubtitleCollection::from_srt_file(srt)?;
        let shifted = OffsetAligner::apply(&collection.entries, offset_ms)?;
        SubtitleCollection::new(output.to_path_buf(), shifted).write_to_srt(output)?;
        info!(
            "Written {} lines to {} (offset: {:+}ms)",
            collection.entries.len(),
            output.display(),
            offset_ms
        );
        Ok(collection.entries.len())
    }

    /// Export an SRT file as plain text paragraphs
    pub fn export_text(&self, srt: &Path, output: &Path, pause_ms: u64, double_spacing: bool) -> Result<usize> {
        text_export::export_file(srt, output, pause_ms, double_spacing)
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Load, optimize and publish one unit
fn process_job(config: &Config, job: &OptimizeJob) -> Result<UnitOutcome> {
    let mut timed = Controller::load_input(&job.input, job.kind)
        .with_context(|| format!("Failed to load {}", job.input.display()))?;
    if let Some(reference) = &job.reference {
        let entries = Controller::load_reference(reference)?;
        timed.time_source = std::mem::take(&mut timed.time_source).with_reference(entries);
    }

    let mut track = Optimizer::new(config)
        .run(&timed)
        .with_context(|| format!("Failed to time {}", job.input.display()))?;

    if let Some(transcript) = &job.transcript {
        let text = FileManager::read_to_string(transcript)?;
        track.diagnostics.extend(TextValidator::validate(&track.entries, &text));
        sort_diagnostics(&mut track.diagnostics);
    }

    publish(job, &track)?;

    if !track.is_valid() {
        warn!(
            "{}: {} errors, {} warnings",
            job.input.display(),
            track.error_count(),
            track.warning_count()
        );
    }

    Ok(UnitOutcome {
        input: job.input.clone(),
        output: job.output.clone(),
        valid: track.is_valid(),
        errors: track.error_count(),
        warnings: track.warning_count(),
        digest: track.digest.clone(),
    })
}

// Write the track, then its report; each file appears complete or not at all
fn publish(job: &OptimizeJob, track: &OptimizedTrack) -> Result<()> {
    if let Some(parent) = job.output.parent() {
        FileManager::ensure_dir(parent)?;
    }
    FileManager::write_atomic(&job.output, &track.render_srt())?;
    info!("Success: {}", job.output.display());

    if let Some(report) = &job.report {
        write_report(report, &job.input.display().to_string(), &track.report())?;
    }
    Ok(())
}

/// Write a timestamped text report
pub fn write_report(path: &Path, subject: &str, body: &str) -> Result<()> {
    let content = format!(
        "subfit report: {}\nGenerated: {}\n\n{}\n",
        subject,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        body.trim_end()
    );
    FileManager::write_atomic(path, &content)
        .with_context(|| format!("Failed to write report: {}", path.display()))
}

fn span_of(entries: &[SubtitleEntry]) -> Option<TimeRange> {
    let start_ms = entries.iter().map(|e| e.start_time_ms).min()?;
    let end_ms = entries.iter().map(|e| e.end_time_ms).max()?;
    Some(TimeRange::new(start_ms, end_ms))
}
