//! Core types for background removal operations

use crate::{
    config::{OutputFormat, RemovalMode},
    error::{RemovalError, Result},
    services::ImageIOService,
};
use image::{DynamicImage, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of interleaved bytes per RGBA pixel
pub const RGBA_CHANNELS: u8 = 4;

/// Index of the alpha byte inside a pixel
const ALPHA_OFFSET: usize = 3;

/// Interleaved 8-bit pixel data, row-major with no row padding
///
/// Pixel `(x, y)` occupies bytes `[(y * width + x) * channels, +channels)`.
/// The segmentation engine requires at least four channels, with alpha at
/// offset 3. Fields are public so callers can hand over buffers produced by
/// their own decoders; [`PixelBuffer::validate`] is run before any pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Raw interleaved channel bytes
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bytes per pixel
    pub channels: u8,
}

impl PixelBuffer {
    /// Create a validated buffer
    ///
    /// # Errors
    /// Returns `RemovalError::InvalidBuffer` when `data.len()` does not equal
    /// `width * height * channels` or when `channels < 4`.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self> {
        let buffer = Self {
            data,
            width,
            height,
            channels,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    /// Create an RGBA buffer filled with one color
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let data = rgba.iter().copied().cycle().take(pixels * 4).collect();
        Self {
            data,
            width,
            height,
            channels: RGBA_CHANNELS,
        }
    }

    /// Check the layout invariants required by the segmentation engine
    ///
    /// # Errors
    /// `RemovalError::InvalidBuffer` on fewer than four channels or a length mismatch.
    pub fn validate(&self) -> Result<()> {
        if self.channels < RGBA_CHANNELS {
            return Err(RemovalError::invalid_buffer(format!(
                "{} channel(s) provided, an alpha channel (4 channels) is required",
                self.channels
            )));
        }

        let expected = self.expected_len().ok_or_else(|| {
            RemovalError::invalid_buffer(format!(
                "{}x{}x{} overflows addressable memory",
                self.width, self.height, self.channels
            ))
        })?;

        if self.data.len() != expected {
            return Err(RemovalError::buffer_length_mismatch(
                expected,
                self.data.len(),
                (self.width, self.height, self.channels),
            ));
        }

        Ok(())
    }

    /// `width * height * channels`, or `None` on overflow
    #[must_use]
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(usize::from(self.channels))
    }

    /// Number of pixels (`width * height`)
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Flattened `y * width + x` index
    #[must_use]
    pub fn pixel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// First byte of the pixel at `index`
    #[must_use]
    pub fn byte_offset(&self, index: usize) -> usize {
        index * usize::from(self.channels)
    }

    /// Red, green, blue bytes of the pixel at `index`
    #[must_use]
    pub fn rgb_at(&self, index: usize) -> [u8; 3] {
        let offset = self.byte_offset(index);
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    #[must_use]
    pub fn alpha_at(&self, index: usize) -> u8 {
        self.data[self.byte_offset(index) + ALPHA_OFFSET]
    }

    pub fn set_alpha(&mut self, index: usize, alpha: u8) {
        let offset = self.byte_offset(index) + ALPHA_OFFSET;
        self.data[offset] = alpha;
    }

    /// Whether `(x, y)` lies on the outermost ring of the image
    #[must_use]
    pub fn is_border(&self, x: u32, y: u32) -> bool {
        x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height
    }

    /// Wrap an RGBA image without copying
    #[must_use]
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            channels: RGBA_CHANNELS,
        }
    }

    /// Normalize any decoded image to RGBA8, synthesizing an opaque alpha channel if absent
    #[must_use]
    pub fn from_dynamic_image(image: &DynamicImage) -> Self {
        Self::from_rgba_image(image.to_rgba8())
    }

    /// Convert back into an RGBA image for encoding
    ///
    /// # Errors
    /// `RemovalError::InvalidBuffer` when the buffer is not exactly 4 channels
    /// or its length does not match its dimensions.
    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        self.validate()?;
        if self.channels != RGBA_CHANNELS {
            return Err(RemovalError::invalid_buffer(format!(
                "cannot encode {} channel buffer as RGBA8",
                self.channels
            )));
        }
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.data).ok_or_else(|| {
            RemovalError::invalid_buffer(format!("{width}x{height} RGBA8 buffer rejected"))
        })
    }
}

/// Final per-pixel outcome of segmentation
///
/// Kept as a tagged value rather than a bare boolean so each pass can be
/// inspected on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelDecision {
    /// Alpha left untouched
    Opaque,
    /// Transparent through the neighbor-density vote only
    Density,
    /// Transparent through border connectivity only
    Connectivity,
    /// Transparent through both votes
    Both,
    /// Transparent through the flatten path, which runs neither pass
    Flattened,
}

impl PixelDecision {
    /// Combine the two pass votes for one pixel
    #[must_use]
    pub fn from_votes(density: bool, connectivity: bool) -> Self {
        match (density, connectivity) {
            (false, false) => Self::Opaque,
            (true, false) => Self::Density,
            (false, true) => Self::Connectivity,
            (true, true) => Self::Both,
        }
    }

    #[must_use]
    pub fn is_transparent(self) -> bool {
        !matches!(self, Self::Opaque)
    }

    #[must_use]
    pub fn voted_by_density(self) -> bool {
        matches!(self, Self::Density | Self::Both)
    }

    #[must_use]
    pub fn voted_by_connectivity(self) -> bool {
        matches!(self, Self::Connectivity | Self::Both)
    }
}

/// Per-pixel transparency decisions for one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Decisions in row-major order
    pub decisions: Vec<PixelDecision>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    #[must_use]
    pub fn new(decisions: Vec<PixelDecision>, dimensions: (u32, u32)) -> Self {
        Self {
            decisions,
            dimensions,
        }
    }

    /// Decision at `(x, y)`, `None` when out of bounds
    #[must_use]
    pub fn decision_at(&self, x: u32, y: u32) -> Option<PixelDecision> {
        let (width, height) = self.dimensions;
        if x >= width || y >= height {
            return None;
        }
        self.decisions
            .get(y as usize * width as usize + x as usize)
            .copied()
    }

    #[must_use]
    pub fn is_transparent(&self, x: u32, y: u32) -> bool {
        self.decision_at(x, y)
            .is_some_and(PixelDecision::is_transparent)
    }

    #[must_use]
    pub fn transparent_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_transparent()).count()
    }

    /// Render as a grayscale image: 255 keeps the pixel, 0 removes it
    ///
    /// # Errors
    /// `RemovalError::Processing` if the decision count does not match the dimensions.
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        let data = self
            .decisions
            .iter()
            .map(|d| if d.is_transparent() { 0 } else { 255 })
            .collect();
        GrayImage::from_raw(width, height, data).ok_or_else(|| {
            RemovalError::processing("Failed to create image from mask data")
        })
    }

    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let mut stats = MaskStatistics {
            total_pixels: self.decisions.len(),
            ..MaskStatistics::default()
        };

        for decision in &self.decisions {
            match decision {
                PixelDecision::Opaque => stats.opaque_pixels += 1,
                PixelDecision::Density => stats.density_only_pixels += 1,
                PixelDecision::Connectivity => stats.connectivity_only_pixels += 1,
                PixelDecision::Both => stats.both_pixels += 1,
                PixelDecision::Flattened => stats.flattened_pixels += 1,
            }
        }

        stats.transparent_pixels = stats.total_pixels - stats.opaque_pixels;
        stats
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub transparent_pixels: usize,
    pub opaque_pixels: usize,
    pub density_only_pixels: usize,
    pub connectivity_only_pixels: usize,
    pub both_pixels: usize,
    pub flattened_pixels: usize,
}

impl MaskStatistics {
    /// Fraction of pixels made transparent (0.0 for an empty image)
    #[must_use]
    pub fn transparent_ratio(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.transparent_pixels as f64 / self.total_pixels as f64
        }
    }
}

/// Timing breakdown for one processed image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Decoding compressed bytes into a pixel buffer
    pub image_decode_ms: u64,
    /// Both passes plus alpha writing
    pub segmentation_ms: u64,
    /// Encoding, when measured
    pub image_encode_ms: Option<u64>,
    /// Wall time for the whole request
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Total: {}ms | Decode: {}ms | Segmentation: {}ms",
            self.total_ms, self.image_decode_ms, self.segmentation_ms
        );
        if let Some(encode_ms) = self.image_encode_ms {
            summary.push_str(&format!(" | Encode: {encode_ms}ms"));
        }
        summary
    }
}

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// RGBA pixels with background alpha cleared
    pub buffer: PixelBuffer,

    /// Counts of each decision kind
    pub statistics: MaskStatistics,

    /// Which removal path produced the buffer
    pub mode: RemovalMode,

    pub timings: ProcessingTimings,

    /// Original input path (for logging purposes)
    pub input_path: Option<String>,
}

impl RemovalResult {
    #[must_use]
    pub fn new(
        buffer: PixelBuffer,
        statistics: MaskStatistics,
        mode: RemovalMode,
        timings: ProcessingTimings,
    ) -> Self {
        Self {
            buffer,
            statistics,
            mode,
            timings,
            input_path: None,
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Encode the buffer into the given format
    ///
    /// # Errors
    /// Encoding failures or an unsupported output format.
    pub fn to_bytes(&self, format: OutputFormat) -> Result<Vec<u8>> {
        ImageIOService::encode_buffer(&self.buffer, format)
    }

    /// Encode and write to `path`, recording the encode time
    ///
    /// # Errors
    /// Encoding or file system failures.
    pub fn save<P: AsRef<Path>>(&mut self, path: P, format: OutputFormat) -> Result<()> {
        let encode_start = instant::Instant::now();
        ImageIOService::save_buffer(&self.buffer, path.as_ref(), format)?;
        let encode_ms = encode_start.elapsed().as_millis() as u64;
        self.timings.image_encode_ms = Some(encode_ms);

        tracing::info!(
            input = %self.input_path.as_deref().unwrap_or("input"),
            output = %path.as_ref().display(),
            encode_ms,
            "Saved result"
        );
        Ok(())
    }

    /// Consume the result into an `image` crate value
    ///
    /// # Errors
    /// The buffer is not a well-formed RGBA8 buffer.
    pub fn into_image(self) -> Result<DynamicImage> {
        Ok(DynamicImage::ImageRgba8(self.buffer.into_rgba_image()?))
    }

    #[must_use]
    pub fn timing_summary(&self) -> String {
        self.timings.summary()
    }
}
