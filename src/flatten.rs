//! Flatten path: clear alpha on every background-colored pixel
//!
//! No density or connectivity analysis is done, so white highlights inside
//! the subject are removed as well. Cheap fallback for buffers or callers
//! that do not need segmentation.

use crate::{
    error::Result,
    segmentation::BackgroundClassifier,
    types::{PixelBuffer, PixelDecision, SegmentationMask},
};

/// Decision mask for the flatten path
///
/// # Errors
/// `RemovalError::InvalidBuffer` for malformed buffers.
pub fn flatten_mask(
    buffer: &PixelBuffer,
    classifier: BackgroundClassifier,
) -> Result<SegmentationMask> {
    buffer.validate()?;
    let decisions = buffer
        .data
        .chunks_exact(usize::from(buffer.channels))
        .map(|px| {
            if classifier.is_background(px[0], px[1], px[2]) {
                PixelDecision::Flattened
            } else {
                PixelDecision::Opaque
            }
        })
        .collect();
    Ok(SegmentationMask::new(decisions, buffer.dimensions()))
}

/// Clear alpha on every pixel whose R, G and B all exceed `threshold`
///
/// # Errors
/// `RemovalError::InvalidBuffer` for malformed buffers; nothing is written.
pub fn flatten_white_to_transparent(buffer: &mut PixelBuffer, threshold: u8) -> Result<usize> {
    let mask = flatten_mask(buffer, BackgroundClassifier::new(threshold))?;
    crate::segmentation::apply_mask(buffer, &mask)
}
