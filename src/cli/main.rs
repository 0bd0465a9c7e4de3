//! White background removal CLI tool
//!
//! Command-line interface for segmenting white backgrounds out of images.

use super::config::CliConfigBuilder;
use crate::{
    config::{OutputFormat, RemovalConfig},
    processor::BackgroundRemovalProcessor,
    remove_background_from_reader,
    services::{ImageIOService, OutputFormatHandler},
    tracing_config::{events, init_cli_tracing, spans, TracingFormat},
    types::RemovalResult,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;


/// Remove white backgrounds from product shots, scans and icons
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "whitebg-remove")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Output format [default: png]
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// Removal mode [default: segment]
    #[arg(short, long, value_enum)]
    pub mode: Option<CliMode>,

    /// Channels must all exceed this value for a pixel to count as background [default: 240]
    #[arg(long, value_name = "0-255")]
    pub white_threshold: Option<u8>,

    /// Fraction of background neighbors required to remove an interior pixel [default: 0.6]
    #[arg(long, value_name = "RATIO")]
    pub density_threshold: Option<f32>,

    /// Run both passes on the current thread
    #[arg(long)]
    pub no_parallel: bool,

    /// Fall back to flattening when a buffer cannot be segmented
    #[arg(long)]
    pub fallback_flatten: bool,

    /// JSON configuration file; command-line flags take precedence
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Process directory recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for batch processing (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as compact plain text
    #[arg(long)]
    pub compact_logs: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Webp,
    Tiff,
    Rgba8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliMode {
    /// Density and connectivity segmentation
    Segment,
    /// Clear every background-colored pixel
    Flatten,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format = if cli.compact_logs {
        TracingFormat::Compact
    } else {
        TracingFormat::Console
    };
    let session_id =
        init_cli_tracing(cli.verbose, log_format).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid configuration")?;
    let _session = spans::session(&session_id, &config.mode.to_string()).entered();

    info!("Input(s): {}", cli.input.join(", "));
    info!(
        "Mode: {}, white threshold: {}, density threshold: {}",
        config.mode, config.segmentation.white_threshold, config.segmentation.density_threshold
    );

    let start_time = Instant::now();
    let processed_count = process_inputs(&cli, config).await?;

    info!(
        "Processed {} image(s) in {:.2}s",
        processed_count,
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

async fn process_inputs(cli: &Cli, config: RemovalConfig) -> Result<usize> {
    if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        return process_stdin(cli.output.as_deref(), &config).await;
    }

    let all_files = collect_input_files(&cli.input, cli.recursive, cli.pattern.as_deref())?;
    if all_files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(0);
    }

    let file_count = all_files.len();
    info!("Found {} image file(s) to process", file_count);

    let output_format = config.output_format;
    let processor = BackgroundRemovalProcessor::new(config)
        .context("Failed to create background removal processor")?;

    let output_dir = if file_count > 1 {
        prepare_output_dir(cli.output.as_deref())?
    } else {
        None
    };

    let progress = if file_count > 1 {
        let pb = ProgressBar::new(file_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let _batch = spans::batch_processing(file_count).entered();
    let batch_start = Instant::now();
    let mut processed_count = 0;
    let mut failed_count = 0;

    for input_file in &all_files {
        if let Some(ref pb) = progress {
            pb.set_message(format!("Processing {}", input_file.display()));
        }

        let target = if file_count == 1 {
            match cli.output.as_deref() {
                Some(target) => OutputTarget::from_arg(target),
                None => OutputTarget::File(generate_output_path(input_file, output_format)),
            }
        } else {
            let path = match &output_dir {
                Some(dir) => generate_output_path_with_dir(input_file, dir, output_format),
                None => generate_output_path(input_file, output_format),
            };
            OutputTarget::File(path)
        };

        match process_single_file(&processor, input_file, &target) {
            Ok(()) => processed_count += 1,
            Err(e) => {
                error!("Failed to process {}: {:#}", input_file.display(), e);
                failed_count += 1;
            },
        }

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Completed! Processed: {processed_count}, Failed: {failed_count}"
        ));
    }

    events::batch_summary(
        processed_count,
        failed_count,
        batch_start.elapsed().as_millis() as u64,
    );

    if failed_count > 0 {
        warn!("Some files failed to process. Processed: {processed_count}, Failed: {failed_count}");
    }
    if processed_count == 0 && failed_count > 0 {
        anyhow::bail!("All {failed_count} input file(s) failed to process");
    }

    Ok(processed_count)
}

/// Where a single result is written
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

async fn process_stdin(output_target: Option<&str>, config: &RemovalConfig) -> Result<usize> {
    info!("Reading image from stdin");

    let start_time = Instant::now();
    let data = read_stdin().await?;
    match detect_image_format(&data) {
        Some(ext) => info!("Detected image format: {}", ext.to_uppercase()),
        None => warn!("Could not detect image format from stdin data, relying on the decoder"),
    }

    let mut result = remove_background_from_reader(io::Cursor::new(data), config)
        .await
        .context("Failed to remove background from stdin image")?;

    let target = output_target.map_or(OutputTarget::Stdout, OutputTarget::from_arg);
    write_result(&mut result, &target, config.output_format)?;

    info!(
        "Processed stdin image in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(1)
}

fn process_single_file(
    processor: &BackgroundRemovalProcessor,
    input_path: &Path,
    target: &OutputTarget,
) -> Result<()> {
    let format = processor.config().output_format;
    let _span =
        spans::file_processing(input_path, OutputFormatHandler::format_name(format)).entered();

    let mut result = processor
        .process_file(input_path)
        .context("Failed to remove background")?;

    write_result(&mut result, target, format)?;

    let stats = &result.statistics;
    info!(
        "{}: {} of {} pixels transparent ({:.1}%), {}",
        input_path.display(),
        stats.transparent_pixels,
        stats.total_pixels,
        stats.transparent_ratio() * 100.0,
        result.timing_summary()
    );
    Ok(())
}

fn write_result(result: &mut RemovalResult, target: &OutputTarget, format: OutputFormat) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            let data = result.to_bytes(format)?;
            write_stdout(&data)?;
            info!("Image written to stdout");
        },
        OutputTarget::File(path) => {
            result
                .save(path, format)
                .with_context(|| format!("Failed to save result to {}", path.display()))?;
        },
    }
    Ok(())
}

async fn read_stdin() -> Result<Vec<u8>> {
    use tokio::io::AsyncReadExt;

    let mut buffer = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut buffer)
        .await
        .context("Failed to read image data from stdin")?;

    if buffer.is_empty() {
        anyhow::bail!("No data received from stdin");
    }
    Ok(buffer)
}

fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Detect image format from binary data by examining magic bytes
fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }

    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }
    // RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP".as_slice())
    {
        return Some("webp");
    }
    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        return Some("tiff");
    }
    if data.starts_with(b"BM") {
        return Some("bmp");
    }

    None
}

/// Expand the command-line inputs into a sorted list of image files
fn collect_input_files(
    inputs: &[String],
    recursive: bool,
    pattern: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();

    for input in inputs {
        let path = PathBuf::from(input);

        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(&path, recursive, pattern)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    // Sort for a stable processing order
    all_files.sort();
    Ok(all_files)
}

fn prepare_output_dir(output: Option<&str>) -> Result<Option<PathBuf>> {
    let Some(output) = output else {
        return Ok(None);
    };
    if output == "-" {
        anyhow::bail!("Cannot use stdout (-) as output when processing multiple files");
    }

    let output_path = PathBuf::from(output);
    if output_path.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            output_path.display()
        );
    }
    std::fs::create_dir_all(&output_path).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;
    Ok(Some(output_path))
}

fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if ImageIOService::is_supported_format(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if ImageIOService::is_supported_format(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}

fn output_file_name(input_path: &Path, format: OutputFormat) -> String {
    let stem = input_path.file_stem().unwrap_or_default();
    format!(
        "{}_bg_removed.{}",
        stem.to_string_lossy(),
        OutputFormatHandler::get_extension(format)
    )
}

/// Output path next to the input
fn generate_output_path(input_path: &Path, format: OutputFormat) -> PathBuf {
    let dir = input_path.parent().unwrap_or(Path::new("."));
    dir.join(output_file_name(input_path, format))
}

fn generate_output_path_with_dir(
    input_path: &Path,
    output_dir: &Path,
    format: OutputFormat,
) -> PathBuf {
    output_dir.join(output_file_name(input_path, format))
}
