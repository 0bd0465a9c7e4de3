//! Image I/O operations service
//!
//! Decoding and encoding live here so the segmentation engine only ever
//! sees raw RGBA buffers.

use crate::{
    config::OutputFormat,
    error::{RemovalError, Result},
    services::OutputFormatHandler,
    types::PixelBuffer,
};
use image::DynamicImage;
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Tries extension-based format detection first and falls back to
    /// sniffing the file content.
    ///
    /// # Errors
    /// Missing file, read failures or undecodable content.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use whitebg_remove::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("input.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(RemovalError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref)
                    .map_err(|io_err| RemovalError::file_io_error("read image data", path_ref, &io_err))?;

                image::load_from_memory(&data).map_err(|content_err| {
                    let extension = path_ref
                        .extension()
                        .and_then(|s| s.to_str())
                        .unwrap_or("unknown");

                    RemovalError::processing_stage_error(
                        "image loading",
                        &format!(
                            "extension-based ({extension}) and content-based detection both failed. Extension error: {e}. Content error: {content_err}"
                        ),
                        Some(&format!("path: {}, size: {} bytes", path_ref.display(), data.len())),
                    )
                })
            },
        }
    }

    /// Load a file and normalize it to an RGBA buffer
    ///
    /// # Errors
    /// See [`ImageIOService::load_image`].
    pub fn load_buffer<P: AsRef<Path>>(path: P) -> Result<PixelBuffer> {
        let image = Self::load_image(path)?;
        Ok(PixelBuffer::from_dynamic_image(&image))
    }

    /// Decode compressed bytes into an RGBA buffer, synthesizing alpha if absent
    ///
    /// # Errors
    /// Empty input or undecodable content.
    pub fn decode_bytes(bytes: &[u8]) -> Result<PixelBuffer> {
        let image = Self::load_from_bytes(bytes)?;
        Ok(PixelBuffer::from_dynamic_image(&image))
    }

    /// Decode compressed bytes
    ///
    /// # Errors
    /// Empty input or undecodable content.
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(RemovalError::processing("No image data provided"));
        }
        image::load_from_memory(bytes).map_err(|e| {
            RemovalError::processing(format!("Failed to decode image from bytes: {e}"))
        })
    }

    /// Encode an RGBA buffer
    ///
    /// # Errors
    /// Malformed buffers, or an encoder that is not compiled in.
    pub fn encode_buffer(buffer: &PixelBuffer, format: OutputFormat) -> Result<Vec<u8>> {
        let rgba = buffer.clone().into_rgba_image()?;

        let Some(image_format) = OutputFormatHandler::to_image_format(format) else {
            // Raw RGBA8 needs no container
            return Ok(rgba.into_raw());
        };

        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image_format)
            .map_err(|e| {
                RemovalError::processing_stage_error(
                    "image encode",
                    &e.to_string(),
                    Some(OutputFormatHandler::format_name(format)),
                )
            })?;
        Ok(bytes)
    }

    /// Encode an RGBA buffer and write it to disk, creating parent directories
    ///
    /// # Errors
    /// Encoding or file system failures.
    pub fn save_buffer<P: AsRef<Path>>(
        buffer: &PixelBuffer,
        path: P,
        format: OutputFormat,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RemovalError::file_io_error("create output directory", parent, &e))?;
        }

        let bytes = Self::encode_buffer(buffer, format)?;
        std::fs::write(path_ref, bytes)
            .map_err(|e| RemovalError::file_io_error("write output image", path_ref, &e))
    }

    /// Check if a file path has a supported input image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif" | "bmp"
                )
            })
    }
}
