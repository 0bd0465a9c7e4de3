//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliMode, CliOutputFormat};
use crate::config::{OutputFormat, RemovalConfig, RemovalConfigBuilder, RemovalMode};
use anyhow::{Context, Result};
use std::path::Path;

/// Convert CLI arguments to a `RemovalConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration: JSON file (if any) first, flags on top
    pub(crate) fn from_cli(cli: &Cli) -> Result<RemovalConfig> {
        Self::validate_cli(cli)?;

        let base = match &cli.config {
            Some(path) => RemovalConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => RemovalConfig::default(),
        };

        let mut builder = RemovalConfigBuilder::from_config(base);

        if let Some(mode) = cli.mode {
            builder = builder.mode(Self::mode(mode));
        }
        if let Some(format) = cli.format {
            builder = builder.output_format(Self::output_format(format));
        } else if let Some(format) = Self::format_from_output_path(cli)? {
            builder = builder.output_format(format);
        }
        if let Some(threshold) = cli.white_threshold {
            builder = builder.white_threshold(threshold);
        }
        if let Some(threshold) = cli.density_threshold {
            builder = builder.density_threshold(threshold);
        }
        if cli.no_parallel {
            builder = builder.parallel(false);
        }
        if cli.fallback_flatten {
            builder = builder.fallback_to_flatten(true);
        }
        if cli.verbose >= 2 {
            builder = builder.debug(true);
        }

        builder.build().context("Invalid configuration")
    }

    /// Infer the format from a single output file's extension
    ///
    /// Batch runs and directory inputs treat `-o` as a directory, so nothing
    /// is inferred for them.
    fn format_from_output_path(cli: &Cli) -> Result<Option<OutputFormat>> {
        let single_input = match cli.input.as_slice() {
            [input] => input == "-" || !Path::new(input).is_dir(),
            _ => false,
        };
        if !single_input {
            return Ok(None);
        }
        let Some(output) = cli.output.as_deref().filter(|o| *o != "-") else {
            return Ok(None);
        };
        let path = Path::new(output);
        if path.is_dir() {
            return Ok(None);
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => ext
                .parse()
                .map(Some)
                .with_context(|| format!("Cannot write output file {output}")),
            None => Ok(None),
        }
    }

    pub(crate) fn output_format(format: CliOutputFormat) -> OutputFormat {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Webp => OutputFormat::WebP,
            CliOutputFormat::Tiff => OutputFormat::Tiff,
            CliOutputFormat::Rgba8 => OutputFormat::Rgba8,
        }
    }

    pub(crate) fn mode(mode: CliMode) -> RemovalMode {
        match mode {
            CliMode::Segment => RemovalMode::Segment,
            CliMode::Flatten => RemovalMode::Flatten,
        }
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.input.len() > 1 && cli.input.iter().any(|s| s == "-") {
            anyhow::bail!("Stdin (-) cannot be combined with other inputs");
        }
        if let Some(pattern) = &cli.pattern {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid file pattern: {pattern}"))?;
        }
        #[cfg(not(feature = "webp-support"))]
        if cli.format == Some(CliOutputFormat::Webp) {
            anyhow::bail!("WebP output requires the webp-support feature");
        }
        Ok(())
    }
}
