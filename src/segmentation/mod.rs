//! Background segmentation engine
//!
//! Two independent passes vote on each pixel of an RGBA buffer:
//!
//! - [`density`]: background-colored pixels on the border, or with more than
//!   60% background-colored 8-neighbors
//! - [`flood`]: background-colored pixels 4-connected to a background-colored
//!   border pixel
//!
//! [`combine`] unions the votes and clears alpha on every voted pixel. Only
//! pixels the [`classifier`] judges background-colored can ever be voted.

pub mod classifier;
pub mod combine;
pub mod density;
pub mod flood;

pub use classifier::{is_background_color, BackgroundClassifier, BackgroundMap};
pub use combine::{apply_mask, combine_votes};
pub use density::density_votes;
pub use flood::flood_votes;

use crate::{
    config::SegmentationConfig,
    error::Result,
    types::{PixelBuffer, SegmentationMask},
};
use tracing::{debug, instrument};

/// Runs both passes with a fixed configuration
///
/// Holds no per-image state; one instance may be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    /// # Errors
    /// Invalid segmentation parameters.
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    #[must_use]
    pub fn classifier(&self) -> BackgroundClassifier {
        BackgroundClassifier::new(self.config.white_threshold)
    }

    /// Compute the decision mask without touching the buffer
    ///
    /// # Errors
    /// `RemovalError::InvalidBuffer` for malformed buffers.
    #[instrument(
        skip(self, buffer),
        fields(width = buffer.width, height = buffer.height, channels = buffer.channels)
    )]
    pub fn segment(&self, buffer: &PixelBuffer) -> Result<SegmentationMask> {
        buffer.validate()?;

        let map = BackgroundMap::classify(buffer, self.classifier());
        let (density, connectivity) = self.run_passes(&map);
        let mask = combine_votes(&density, &connectivity, buffer.dimensions())?;

        let stats = mask.statistics();
        debug!(
            background = map.background_count(),
            transparent = stats.transparent_pixels,
            density_only = stats.density_only_pixels,
            connectivity_only = stats.connectivity_only_pixels,
            both = stats.both_pixels,
            "Segmentation passes complete"
        );
        Ok(mask)
    }

    /// Segment and clear alpha in place, returning the decision mask
    ///
    /// # Errors
    /// `RemovalError::InvalidBuffer` for malformed buffers; the buffer is
    /// left untouched.
    pub fn apply(&self, buffer: &mut PixelBuffer) -> Result<SegmentationMask> {
        let mask = self.segment(buffer)?;
        apply_mask(buffer, &mask)?;
        Ok(mask)
    }

    /// Segment and clear alpha, handing the same buffer back
    ///
    /// # Errors
    /// `RemovalError::InvalidBuffer` for malformed buffers.
    pub fn segment_and_make_transparent(&self, mut buffer: PixelBuffer) -> Result<PixelBuffer> {
        self.apply(&mut buffer)?;
        Ok(buffer)
    }

    #[cfg(feature = "parallel")]
    fn run_passes(&self, map: &BackgroundMap) -> (Vec<bool>, Vec<bool>) {
        let threshold = self.config.density_threshold;
        if self.config.parallel {
            rayon::join(
                || density::density_votes_parallel(map, threshold),
                || flood_votes(map),
            )
        } else {
            (density_votes(map, threshold), flood_votes(map))
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_passes(&self, map: &BackgroundMap) -> (Vec<bool>, Vec<bool>) {
        (
            density_votes(map, self.config.density_threshold),
            flood_votes(map),
        )
    }
}

/// Segment with default parameters and clear alpha on background pixels
///
/// # Errors
/// `RemovalError::InvalidBuffer` when `buffer.data.len() != width * height * channels`
/// or `channels < 4`. No byte is modified on error.
///
/// # Examples
///
/// ```rust
/// use whitebg_remove::{segment_and_make_transparent, PixelBuffer};
///
/// let mut buffer = PixelBuffer::filled(5, 5, [255, 255, 255, 255]);
/// let center = buffer.pixel_index(2, 2);
/// buffer.data[center * 4..center * 4 + 3].copy_from_slice(&[0, 0, 0]);
///
/// let out = segment_and_make_transparent(buffer).unwrap();
/// assert_eq!(out.alpha_at(center), 255);
/// assert_eq!(out.alpha_at(0), 0);
/// ```
pub fn segment_and_make_transparent(buffer: PixelBuffer) -> Result<PixelBuffer> {
    Segmenter::default().segment_and_make_transparent(buffer)
}
