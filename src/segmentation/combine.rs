//! Vote union and alpha writing

use crate::{
    error::{RemovalError, Result},
    types::{PixelBuffer, PixelDecision, SegmentationMask},
};

/// Union the density and connectivity votes into a decision mask
///
/// # Errors
/// `RemovalError::Processing` when the vote arrays differ in length or do
/// not cover `width * height` pixels.
pub fn combine_votes(
    density: &[bool],
    connectivity: &[bool],
    dimensions: (u32, u32),
) -> Result<SegmentationMask> {
    let expected = dimensions.0 as usize * dimensions.1 as usize;
    if density.len() != expected || connectivity.len() != expected {
        return Err(RemovalError::processing_stage_error(
            "combine votes",
            &format!(
                "vote arrays of {} and {} entries for {expected} pixels",
                density.len(),
                connectivity.len()
            ),
            Some(&format!("{}x{}", dimensions.0, dimensions.1)),
        ));
    }

    let decisions = density
        .iter()
        .zip(connectivity)
        .map(|(&d, &c)| PixelDecision::from_votes(d, c))
        .collect();

    Ok(SegmentationMask::new(decisions, dimensions))
}

/// Set alpha to 0 on every transparent pixel, leaving all other bytes untouched
///
/// Returns the number of pixels made transparent.
///
/// # Errors
/// `RemovalError::InvalidBuffer` when the buffer is malformed or its
/// dimensions differ from the mask's. Nothing is written in that case.
pub fn apply_mask(buffer: &mut PixelBuffer, mask: &SegmentationMask) -> Result<usize> {
    buffer.validate()?;
    if buffer.dimensions() != mask.dimensions || mask.decisions.len() != buffer.pixel_count() {
        return Err(RemovalError::invalid_buffer(format!(
            "buffer is {}x{} but mask is {}x{}",
            buffer.width, buffer.height, mask.dimensions.0, mask.dimensions.1
        )));
    }

    let channels = usize::from(buffer.channels);
    let mut cleared = 0;
    for (pixel, decision) in buffer.data.chunks_exact_mut(channels).zip(&mask.decisions) {
        if decision.is_transparent() {
            pixel[3] = 0;
            cleared += 1;
        }
    }
    Ok(cleared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_tags_each_source() {
        let mask = combine_votes(
            &[false, true, false, true],
            &[false, false, true, true],
            (2, 2),
        )
        .unwrap();
        assert_eq!(
            mask.decisions,
            vec![
                PixelDecision::Opaque,
                PixelDecision::Density,
                PixelDecision::Connectivity,
                PixelDecision::Both
            ]
        );
    }

    #[test]
    fn test_mismatched_votes_rejected() {
        assert!(combine_votes(&[true], &[true, false], (2, 1)).is_err());
        assert!(combine_votes(&[true], &[true], (2, 1)).is_err());
    }

    #[test]
    fn test_apply_only_touches_alpha() {
        let mut buffer = PixelBuffer::filled(2, 1, [250, 251, 252, 200]);
        let mask = SegmentationMask::new(
            vec![PixelDecision::Connectivity, PixelDecision::Opaque],
            (2, 1),
        );
        let cleared = apply_mask(&mut buffer, &mask).unwrap();
        assert_eq!(cleared, 1);
        assert_eq!(buffer.data, vec![250, 251, 252, 0, 250, 251, 252, 200]);
    }

    #[test]
    fn test_apply_dimension_mismatch_writes_nothing() {
        let mut buffer = PixelBuffer::filled(2, 1, [255, 255, 255, 255]);
        let before = buffer.clone();
        let mask = SegmentationMask::new(vec![PixelDecision::Both; 2], (1, 2));
        assert!(apply_mask(&mut buffer, &mask).unwrap_err().is_invalid_buffer());
        assert_eq!(buffer, before);
    }
}
