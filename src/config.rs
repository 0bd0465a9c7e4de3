//! Configuration types for background removal operations

use crate::error::{RemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default per-channel cutoff above which a pixel counts as background
pub const DEFAULT_WHITE_THRESHOLD: u8 = 240;

/// Default fraction of background-colored neighbors required by the density vote
pub const DEFAULT_DENSITY_THRESHOLD: f32 = 0.6;

/// Which removal path to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalMode {
    /// Density vote plus border-seeded flood fill
    #[default]
    Segment,
    /// Every background-colored pixel becomes transparent, no analysis
    Flatten,
}

impl std::fmt::Display for RemovalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Segment => write!(f, "segment"),
            Self::Flatten => write!(f, "flatten"),
        }
    }
}

/// Output image format options
///
/// Only formats that can carry an alpha channel are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// WebP with alpha channel transparency (lossless)
    WebP,
    /// TIFF with alpha channel transparency
    Tiff,
    /// Raw RGBA8 pixel data (4 bytes per pixel)
    Rgba8,
}

impl std::str::FromStr for OutputFormat {
    type Err = RemovalError;

    /// Parse a format name or file extension
    ///
    /// Alpha-less containers (`jpg`, `jpeg`, `bmp`) are rejected with
    /// `RemovalError::UnsupportedFormat`.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "tif" | "tiff" => Ok(Self::Tiff),
            "rgba" | "rgba8" | "raw" => Ok(Self::Rgba8),
            "jpg" | "jpeg" | "bmp" => Err(RemovalError::unsupported_format(format!(
                "{s} cannot carry an alpha channel; use png, webp or tiff"
            ))),
            other => Err(RemovalError::unsupported_format(other)),
        }
    }
}

/// Parameters of the segmentation passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// A pixel is background-colored when R, G and B all exceed this value
    pub white_threshold: u8,

    /// Interior pixels are voted transparent when the background fraction
    /// of their neighbors is strictly greater than this value
    pub density_threshold: f32,

    /// Run the density and flood fill passes concurrently
    pub parallel: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            white_threshold: DEFAULT_WHITE_THRESHOLD,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            parallel: true,
        }
    }
}

impl SegmentationConfig {
    /// Validate pass parameters
    ///
    /// # Errors
    /// `RemovalError::InvalidConfig` when the density threshold is not a
    /// finite value in `[0.0, 1.0)`. A threshold of 1.0 or more could never
    /// be exceeded and would silently disable the density vote.
    pub fn validate(&self) -> Result<()> {
        if !self.density_threshold.is_finite()
            || !(0.0..1.0).contains(&self.density_threshold)
        {
            return Err(RemovalError::config_value_error(
                "density threshold",
                self.density_threshold,
                "0.0-1.0 (exclusive)",
                Some(DEFAULT_DENSITY_THRESHOLD),
            ));
        }
        Ok(())
    }
}

/// Configuration for background removal operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Removal path
    pub mode: RemovalMode,

    /// Segmentation parameters (the white threshold is shared with flatten mode)
    pub segmentation: SegmentationConfig,

    /// Output format
    pub output_format: OutputFormat,

    /// Retry with the flatten path when segmentation rejects the buffer
    pub fallback_to_flatten: bool,

    /// Enable debug mode (additional logging of pass statistics)
    pub debug: bool,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            mode: RemovalMode::default(),
            segmentation: SegmentationConfig::default(),
            output_format: OutputFormat::default(),
            fallback_to_flatten: false,
            debug: false,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use whitebg_remove::{OutputFormat, RemovalConfig, RemovalMode};
    ///
    /// let config = RemovalConfig::builder()
    ///     .mode(RemovalMode::Segment)
    ///     .white_threshold(235)
    ///     .output_format(OutputFormat::WebP)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.segmentation.white_threshold, 235);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// Invalid segmentation parameters.
    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    ///
    /// # Errors
    /// Malformed JSON or invalid parameters.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            RemovalError::invalid_config(format!("Failed to parse configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    ///
    /// # Errors
    /// File read failures, malformed JSON or invalid parameters.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RemovalError::file_io_error("read configuration file", path, &e))?;
        Self::from_json_str(&content)
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    /// Start from an existing configuration, e.g. one loaded from JSON
    #[must_use]
    pub fn from_config(config: RemovalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn mode(mut self, mode: RemovalMode) -> Self {
        self.config.mode = mode;
        self
    }

    #[must_use]
    pub fn white_threshold(mut self, threshold: u8) -> Self {
        self.config.segmentation.white_threshold = threshold;
        self
    }

    #[must_use]
    pub fn density_threshold(mut self, threshold: f32) -> Self {
        self.config.segmentation.density_threshold = threshold;
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.segmentation.parallel = parallel;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn fallback_to_flatten(mut self, fallback: bool) -> Self {
        self.config.fallback_to_flatten = fallback;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// Invalid segmentation parameters.
    pub fn build(self) -> Result<RemovalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
