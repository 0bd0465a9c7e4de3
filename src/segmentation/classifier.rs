//! Background color classification

use crate::{config::DEFAULT_WHITE_THRESHOLD, types::PixelBuffer};

/// Near-white predicate with a fixed per-channel cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundClassifier {
    threshold: u8,
}

impl Default for BackgroundClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_WHITE_THRESHOLD)
    }
}

impl BackgroundClassifier {
    #[must_use]
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub fn threshold(self) -> u8 {
        self.threshold
    }

    /// `true` iff every color channel is strictly above the threshold
    #[inline]
    #[must_use]
    pub fn is_background(self, r: u8, g: u8, b: u8) -> bool {
        r > self.threshold && g > self.threshold && b > self.threshold
    }

    #[inline]
    #[must_use]
    pub fn is_background_rgb(self, [r, g, b]: [u8; 3]) -> bool {
        self.is_background(r, g, b)
    }
}

/// Classify with the default cutoff of 240
#[inline]
#[must_use]
pub fn is_background_color(r: u8, g: u8, b: u8) -> bool {
    BackgroundClassifier::default().is_background(r, g, b)
}

/// Classification of every pixel of a buffer, computed once and shared by both passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundMap {
    cells: Vec<bool>,
    width: u32,
    height: u32,
}

impl BackgroundMap {
    /// Classify each pixel of a validated buffer
    #[must_use]
    pub fn classify(buffer: &PixelBuffer, classifier: BackgroundClassifier) -> Self {
        let cells = buffer
            .data
            .chunks_exact(usize::from(buffer.channels))
            .map(|px| classifier.is_background(px[0], px[1], px[2]))
            .collect();

        Self {
            cells,
            width: buffer.width,
            height: buffer.height,
        }
    }

    /// Build directly from row-major flags
    ///
    /// # Panics
    /// If `cells.len() != width * height`.
    #[must_use]
    pub fn from_cells(cells: Vec<bool>, width: u32, height: u32) -> Self {
        assert_eq!(
            cells.len(),
            width as usize * height as usize,
            "background map size mismatch"
        );
        Self {
            cells,
            width,
            height,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_background(&self, index: usize) -> bool {
        self.cells[index]
    }

    #[inline]
    #[must_use]
    pub fn is_background_at(&self, x: u32, y: u32) -> bool {
        self.is_background(y as usize * self.width as usize + x as usize)
    }

    #[inline]
    #[must_use]
    pub fn is_border(&self, x: u32, y: u32) -> bool {
        x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height
    }

    #[must_use]
    pub fn background_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        assert!(is_background_color(241, 241, 241));
        assert!(is_background_color(255, 255, 255));
        assert!(!is_background_color(240, 255, 255));
        assert!(!is_background_color(255, 240, 255));
        assert!(!is_background_color(255, 255, 240));
        assert!(!is_background_color(100, 100, 100));
    }

    #[test]
    fn test_custom_threshold() {
        let classifier = BackgroundClassifier::new(200);
        assert_eq!(classifier.threshold(), 200);
        assert!(classifier.is_background(201, 201, 201));
        assert!(!classifier.is_background_rgb([201, 199, 201]));
    }

    #[test]
    fn test_classify_ignores_alpha() {
        let mut buffer = PixelBuffer::filled(2, 1, [250, 250, 250, 0]);
        buffer.data[4..8].copy_from_slice(&[10, 250, 250, 255]);

        let map = BackgroundMap::classify(&buffer, BackgroundClassifier::default());
        assert_eq!(map.len(), 2);
        assert!(map.is_background(0));
        assert!(!map.is_background_at(1, 0));
        assert_eq!(map.background_count(), 1);
    }
}
