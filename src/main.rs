// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use subfit::app_config::{self, Config};
use subfit::app_controller::{Controller, OptimizeJob};
use subfit::file_utils::{FileManager, InputKind};
use subfit::text_export::DEFAULT_PAUSE_MS;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for InputKind to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliInputFormat {
    Srt,
    Mapping,
    Aligned,
}

impl From<CliInputFormat> for InputKind {
    fn from(format: CliInputFormat) -> Self {
        match format {
            CliInputFormat::Srt => InputKind::Srt,
            CliInputFormat::Mapping => InputKind::Mapping,
            CliInputFormat::Aligned => InputKind::Aligned,
        }
    }
}

/// Per-run overrides of the readability thresholds
#[derive(Args, Debug, Clone, Default)]
struct ThresholdArgs {
    /// Maximum characters per line
    #[arg(long)]
    max_chars_per_line: Option<usize>,

    /// Target reading speed in characters per second
    #[arg(long)]
    cps_target: Option<f64>,

    /// Hard maximum reading speed in characters per second
    #[arg(long)]
    cps_hard_max: Option<f64>,

    /// Minimum line duration in milliseconds
    #[arg(long)]
    min_duration_ms: Option<u64>,

    /// Maximum line duration in milliseconds
    #[arg(long)]
    max_duration_ms: Option<u64>,

    /// Minimum gap between lines in milliseconds
    #[arg(long)]
    min_gap_ms: Option<u64>,

    /// Maximum enforcement passes
    #[arg(long)]
    max_passes: Option<usize>,

    /// Let the last line run past the maximum duration
    #[arg(long)]
    final_block_unbounded: bool,

    /// Close gaps of 3 to 11 frames down to the minimum gap
    #[arg(long)]
    chaining: bool,
}

impl ThresholdArgs {
    fn apply(&self, config: &mut Config) {
        let c = &mut config.constraints;
        if let Some(value) = self.max_chars_per_line {
            c.max_chars_per_line = value;
        }
        if let Some(value) = self.cps_target {
            c.cps_target = value;
        }
        if let Some(value) = self.cps_hard_max {
            c.cps_hard_max = value;
        }
        if let Some(value) = self.min_duration_ms {
            c.min_duration_ms = value;
        }
        if let Some(value) = self.max_duration_ms {
            c.max_duration_ms = value;
        }
        if let Some(value) = self.min_gap_ms {
            c.min_gap_ms = value;
        }
        if let Some(value) = self.max_passes {
            c.max_passes = value;
        }
        c.final_block_unbounded |= self.final_block_unbounded;
        c.chaining |= self.chaining;
    }
}

#[derive(Subcommand, Debug)]
enum OffsetCommands {
    /// Detect the constant offset between two timings of the same speech
    Detect {
        /// Reference SRT file
        #[arg(long)]
        srt1: PathBuf,

        /// SRT file to compare against the reference
        #[arg(long)]
        srt2: PathBuf,
    },

    /// Shift every line of an SRT file
    Apply {
        /// Input SRT file
        #[arg(long)]
        srt: PathBuf,

        /// Offset in milliseconds (may be negative)
        #[arg(long, allow_hyphen_values = true)]
        offset_ms: i64,

        /// Output SRT file
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Optimize one input into a readable SRT track
    Optimize {
        /// SRT, mapping file or aligned JSON
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output SRT file (default: <input>.optimized.srt next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a text report with statistics and diagnostics
        #[arg(long)]
        report: Option<PathBuf>,

        /// Aligned JSON marking where speech happens
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Transcript the track must reproduce word for word
        #[arg(long)]
        transcript: Option<PathBuf>,

        /// Input format (detected from the file by default)
        #[arg(long, value_enum)]
        format: Option<CliInputFormat>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Optimize every input in a directory concurrently
    Batch {
        /// Directory to scan recursively
        #[arg(value_name = "DIR")]
        input_dir: PathBuf,

        /// Where optimized tracks and reports go (default: next to each input)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Validate an existing SRT track
    Validate {
        /// SRT file to check
        #[arg(value_name = "SRT")]
        srt: PathBuf,

        /// Transcript the track must reproduce word for word
        #[arg(long)]
        transcript: Option<PathBuf>,

        /// Aligned JSON marking where speech happens
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Write the report to a file as well
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Detect or apply a constant time offset
    Offset {
        #[command(subcommand)]
        command: OffsetCommands,
    },

    /// Export an SRT track as plain text paragraphs
    Export {
        /// Input SRT file
        #[arg(long)]
        srt: PathBuf,

        /// Output text file
        #[arg(long)]
        output: PathBuf,

        /// Pause that starts a new paragraph, in milliseconds
        #[arg(long, default_value_t = DEFAULT_PAUSE_MS)]
        pause_ms: u64,

        /// Separate paragraphs with a blank line
        #[arg(long)]
        double_spacing: bool,
    },

    /// Generate shell completions for subfit
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subfit - constraint-based subtitle timing optimizer
///
/// Turns translated text plus word timestamps into a subtitle track that
/// respects line length, reading speed, duration and gap limits.
#[derive(Parser, Debug)]
#[command(name = "subfit")]
#[command(version)]
#[command(about = "Constraint-based subtitle timing optimizer")]
#[command(long_about = "subfit splits and times subtitle lines so they respect line length, reading speed, duration and gap limits.

EXAMPLES:
    subfit optimize talk.srt                          # Write talk.optimized.srt
    subfit optimize talk.json --report talk.txt       # Word-aligned input with a report
    subfit optimize talk.srt --max-chars-per-line 50  # Override one threshold
    subfit batch talks/ --output-dir out/             # Optimize a whole directory
    subfit validate talk.srt --transcript talk_uk.txt # Check an existing track
    subfit offset detect --srt1 a.srt --srt2 b.srt    # Find the shift between two recordings
    subfit completions bash > subfit.bash             # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

EXIT STATUS:
    0 when no error diagnostics were found, 1 otherwise.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI colour for a log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("🚧", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (marker, colour) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, marker, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the max level filters until the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subfit", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        log::set_max_level(level_filter(&level.clone().into()));
    }

    let mut config = load_config(&cli.config_path)?;
    match &cli.command {
        Commands::Optimize { thresholds, .. }
        | Commands::Batch { thresholds, .. }
        | Commands::Validate { thresholds, .. } => thresholds.apply(&mut config),
        _ => {}
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    } else {
        log::set_max_level(level_filter(&config.log_level));
    }

    let controller = Controller::with_config(config)?;
    if !run_command(&controller, cli.command).await? {
        std::process::exit(1);
    }
    Ok(())
}

// Load the configuration, creating a default file when it is missing
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .with_context(|| format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

// Returns false when the command found error diagnostics or failed units
async fn run_command(controller: &Controller, command: Commands) -> Result<bool> {
    match command {
        Commands::Optimize {
            input,
            output,
            report,
            reference,
            transcript,
            format,
            ..
        } => {
            if !FileManager::file_exists(&input) {
                return Err(anyhow::anyhow!("Input file does not exist: {}", input.display()));
            }
            let output_dir = input.parent().unwrap_or(Path::new(".")).to_path_buf();
            let job = OptimizeJob {
                output: output.unwrap_or_else(|| {
                    FileManager::generate_output_path(&input, &output_dir, "optimized", "srt")
                }),
                report,
                reference,
                transcript,
                kind: format.map(InputKind::from),
                input,
            };
            let outcome = controller.run_job(&job)?;
            info!(
                "{}: {} errors, {} warnings (sha256 {})",
                outcome.output.display(),
                outcome.errors,
                outcome.warnings,
                &outcome.digest[..12]
            );
            Ok(outcome.valid)
        }
        Commands::Batch { input_dir, output_dir, .. } => {
            let summary = controller.run_batch(&input_dir, output_dir.as_deref()).await?;
            for (input, result) in &summary.results {
                match result {
                    Ok(outcome) if outcome.valid => info!("OK    {}", input.display()),
                    Ok(outcome) => warn!("ERRORS {} ({} errors)", input.display(), outcome.errors),
                    Err(e) => error!("FAILED {}: {:#}", input.display(), e),
                }
            }
            Ok(summary.is_success())
        }
        Commands::Validate {
            srt,
            transcript,
            reference,
            report,
            ..
        } => {
            let validation = controller.validate_file(
                &srt,
                transcript.as_deref(),
                reference.as_deref(),
                report.as_deref(),
            )?;
            print!("{}", validation);
            Ok(validation.is_valid())
        }
        Commands::Offset { command } => match command {
            OffsetCommands::Detect { srt1, srt2 } => match controller.detect_offset(&srt1, &srt2) {
                Ok(offset) => {
                    println!("OFFSET: {}ms ({:+.3}s)", offset, offset as f64 / 1000.0);
                    Ok(true)
                }
                Err(e) => {
                    error!("{:#}", e);
                    Ok(false)
                }
            },
            OffsetCommands::Apply { srt, offset_ms, output } => {
                controller.apply_offset(&srt, offset_ms, &output)?;
                Ok(true)
            }
        },
        Commands::Export {
            srt,
            output,
            pause_ms,
            double_spacing,
        } => {
            controller.export_text(&srt, &output, pause_ms, double_spacing)?;
            Ok(true)
        }
        Commands::Completions { .. } => Ok(true),
    }
}
