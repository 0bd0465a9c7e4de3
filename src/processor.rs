//! Background removal processor
//!
//! Ties decoding, the selected removal path and timing collection together.
//! Used by the library entry points and the CLI so both behave the same.

use crate::{
    config::{RemovalConfig, RemovalMode},
    error::{RemovalError, Result},
    flatten,
    segmentation::{BackgroundClassifier, Segmenter},
    services::ImageIOService,
    types::{PixelBuffer, ProcessingTimings, RemovalResult, SegmentationMask},
};
use image::DynamicImage;
use instant::Instant;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Background removal processor
pub struct BackgroundRemovalProcessor {
    config: RemovalConfig,
    segmenter: Segmenter,
}

impl BackgroundRemovalProcessor {
    /// # Errors
    /// Invalid configuration.
    pub fn new(config: RemovalConfig) -> Result<Self> {
        config.validate()?;
        let segmenter = Segmenter::new(config.segmentation.clone())?;
        Ok(Self { config, segmenter })
    }

    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Remove the background from an image file
    ///
    /// # Errors
    /// File I/O, decode or buffer validation failures.
    #[instrument(skip(self, input_path), fields(path = %input_path.as_ref().display()))]
    pub fn process_file<P: AsRef<Path>>(&self, input_path: P) -> Result<RemovalResult> {
        let input_path = input_path.as_ref();
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let buffer = ImageIOService::load_buffer(input_path)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let mut result = self.process_buffer(buffer)?;
        result.timings.image_decode_ms = decode_ms;
        result.timings.total_ms = total_start.elapsed().as_millis() as u64;
        result.input_path = Some(input_path.display().to_string());
        Ok(result)
    }

    /// Remove the background from encoded image bytes
    ///
    /// # Errors
    /// Decode or buffer validation failures.
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<RemovalResult> {
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let buffer = ImageIOService::decode_bytes(bytes)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let mut result = self.process_buffer(buffer)?;
        result.timings.image_decode_ms = decode_ms;
        result.timings.total_ms = total_start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Remove the background from a decoded image
    ///
    /// # Errors
    /// Buffer validation failures.
    pub fn process_image(&self, image: &DynamicImage) -> Result<RemovalResult> {
        self.process_buffer(PixelBuffer::from_dynamic_image(image))
    }

    /// Remove the background from a raw buffer, in place
    ///
    /// # Errors
    /// `RemovalError::InvalidBuffer` for malformed buffers, unless
    /// `fallback_to_flatten` is set and the flatten path can handle it.
    #[instrument(
        skip(self, buffer),
        fields(mode = %self.config.mode, dimensions = %format!("{}x{}", buffer.width, buffer.height))
    )]
    pub fn process_buffer(&self, mut buffer: PixelBuffer) -> Result<RemovalResult> {
        let start = Instant::now();

        let (mask, mode) = match self.config.mode {
            RemovalMode::Segment => match self.segmenter.apply(&mut buffer) {
                Ok(mask) => (mask, RemovalMode::Segment),
                Err(e) if e.is_invalid_buffer() && self.config.fallback_to_flatten => {
                    warn!(error = %e, "Segmentation rejected buffer, falling back to flatten");
                    (self.flatten(&mut buffer)?, RemovalMode::Flatten)
                },
                Err(e) => return Err(e),
            },
            RemovalMode::Flatten => (self.flatten(&mut buffer)?, RemovalMode::Flatten),
        };

        let segmentation_ms = start.elapsed().as_millis() as u64;
        let statistics = mask.statistics();

        if self.config.debug {
            debug!(?statistics, "Mask statistics");
        }
        info!(
            transparent = statistics.transparent_pixels,
            total = statistics.total_pixels,
            segmentation_ms,
            "Background removed"
        );

        let timings = ProcessingTimings {
            segmentation_ms,
            total_ms: segmentation_ms,
            ..ProcessingTimings::default()
        };
        Ok(RemovalResult::new(buffer, statistics, mode, timings))
    }

    /// Compute the decision mask for a buffer without modifying it
    ///
    /// # Errors
    /// `RemovalError::InvalidBuffer` for malformed buffers.
    pub fn mask_for(&self, buffer: &PixelBuffer) -> Result<SegmentationMask> {
        match self.config.mode {
            RemovalMode::Segment => self.segmenter.segment(buffer),
            RemovalMode::Flatten => flatten::flatten_mask(buffer, self.classifier()),
        }
    }

    fn classifier(&self) -> BackgroundClassifier {
        self.segmenter.classifier()
    }

    fn flatten(&self, buffer: &mut PixelBuffer) -> Result<SegmentationMask> {
        if buffer.channels < crate::types::RGBA_CHANNELS && self.config.fallback_to_flatten {
            // Synthesize alpha so the flatten path has somewhere to write
            *buffer = with_opaque_alpha(buffer)?;
        }
        let mask = flatten::flatten_mask(buffer, self.classifier())?;
        crate::segmentation::apply_mask(buffer, &mask)?;
        Ok(mask)
    }
}

/// Expand a 3-channel buffer to RGBA with every pixel opaque
fn with_opaque_alpha(buffer: &PixelBuffer) -> Result<PixelBuffer> {
    let channels = usize::from(buffer.channels);
    if channels != 3 || buffer.data.len() != buffer.pixel_count() * 3 {
        return Err(RemovalError::invalid_buffer(format!(
            "cannot synthesize alpha for a {}-channel buffer of {} bytes",
            buffer.channels,
            buffer.data.len()
        )));
    }

    let data = buffer
        .data
        .chunks_exact(3)
        .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
        .collect();
    PixelBuffer::new(data, buffer.width, buffer.height, crate::types::RGBA_CHANNELS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    fn rgb_buffer() -> PixelBuffer {
        PixelBuffer {
            data: vec![255; 2 * 2 * 3],
            width: 2,
            height: 2,
            channels: 3,
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RemovalConfig {
            segmentation: crate::config::SegmentationConfig {
                density_threshold: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(BackgroundRemovalProcessor::new(config).is_err());
    }

    #[test]
    fn test_segment_mode() {
        let processor = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
        let result = processor
            .process_buffer(PixelBuffer::filled(4, 4, [255, 255, 255, 255]))
            .unwrap();
        assert_eq!(result.mode, RemovalMode::Segment);
        assert_eq!(result.statistics.transparent_pixels, 16);
        assert!(result.buffer.data.chunks_exact(4).all(|px| px[3] == 0));
    }

    #[test]
    fn test_flatten_mode_removes_enclosed_white() {
        let mut buffer = PixelBuffer::filled(3, 3, [0, 0, 0, 255]);
        buffer.data[16..19].copy_from_slice(&[255, 255, 255]);

        let segment = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
        let kept = segment.process_buffer(buffer.clone()).unwrap();
        assert_eq!(kept.buffer.alpha_at(4), 255);

        let flatten = BackgroundRemovalProcessor::new(
            RemovalConfig::builder().mode(RemovalMode::Flatten).build().unwrap(),
        )
        .unwrap();
        let removed = flatten.process_buffer(buffer).unwrap();
        assert_eq!(removed.mode, RemovalMode::Flatten);
        assert_eq!(removed.buffer.alpha_at(4), 0);
        assert_eq!(removed.statistics.flattened_pixels, 1);
    }

    #[test]
    fn test_invalid_buffer_without_fallback() {
        let processor = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
        let err = processor.process_buffer(rgb_buffer()).unwrap_err();
        assert!(err.is_invalid_buffer());
    }

    #[test]
    fn test_invalid_buffer_falls_back_to_flatten() {
        let processor = BackgroundRemovalProcessor::new(
            RemovalConfig::builder().fallback_to_flatten(true).build().unwrap(),
        )
        .unwrap();
        let result = processor.process_buffer(rgb_buffer()).unwrap();
        assert_eq!(result.mode, RemovalMode::Flatten);
        assert_eq!(result.buffer.channels, 4);
        assert!(result.buffer.data.chunks_exact(4).all(|px| px[3] == 0));
    }

    #[test]
    fn test_truncated_buffer_fails_even_with_fallback() {
        let processor = BackgroundRemovalProcessor::new(
            RemovalConfig::builder().fallback_to_flatten(true).build().unwrap(),
        )
        .unwrap();
        let buffer = PixelBuffer {
            data: vec![255; 7],
            width: 2,
            height: 1,
            channels: 4,
        };
        assert!(processor.process_buffer(buffer).unwrap_err().is_invalid_buffer());
    }

    #[test]
    fn test_process_bytes_roundtrip() {
        let processor = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
        let png = crate::services::ImageIOService::encode_buffer(
            &PixelBuffer::filled(3, 3, [255, 255, 255, 255]),
            OutputFormat::Png,
        )
        .unwrap();
        let result = processor.process_bytes(&png).unwrap();
        assert_eq!(result.dimensions(), (3, 3));
        assert_eq!(result.statistics.transparent_pixels, 9);
    }

    #[test]
    fn test_mask_for_does_not_mutate() {
        let processor = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
        let buffer = PixelBuffer::filled(2, 2, [255, 255, 255, 255]);
        let mask = processor.mask_for(&buffer).unwrap();
        assert_eq!(mask.transparent_count(), 4);
        assert!(buffer.data.chunks_exact(4).all(|px| px[3] == 255));
    }
}
