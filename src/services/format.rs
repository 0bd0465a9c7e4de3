//! Output format handling service

use crate::config::OutputFormat;
use image::ImageFormat;

/// Service for mapping output formats to containers and file names
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Container format for the `image` crate, `None` for raw RGBA8
    #[must_use]
    pub fn to_image_format(format: OutputFormat) -> Option<ImageFormat> {
        match format {
            OutputFormat::Png => Some(ImageFormat::Png),
            OutputFormat::WebP => Some(ImageFormat::WebP),
            OutputFormat::Tiff => Some(ImageFormat::Tiff),
            OutputFormat::Rgba8 => None,
        }
    }

    /// Get the appropriate file extension for a given output format
    ///
    /// # Examples
    /// ```rust
    /// use whitebg_remove::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Rgba8), "rgba8");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Rgba8 => "rgba8",
        }
    }

    #[must_use]
    pub fn format_name(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Rgba8 => "RGBA8",
        }
    }
}
