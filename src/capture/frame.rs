//! Frame data structures for captured video content

use image::RgbImage;
use std::time::Instant;

/// A captured video frame
///
/// `Clone` produces an independent pixel buffer, which is what the capture
/// loop hands to the recognition worker.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// RGB pixel data
    pub image: RgbImage,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl CapturedFrame {
    /// Create a new captured frame stamped with the current time
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            timestamp: Instant::now(),
        }
    }

    /// Frame with no pixels
    #[cfg(any(test, feature = "backend-opencv"))]
    pub fn empty() -> Self {
        Self::new(RgbImage::new(0, 0))
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_empty_frame() {
        assert!(CapturedFrame::empty().is_empty());
        assert!(CapturedFrame::new(RgbImage::new(0, 10)).is_empty());
        assert!(!CapturedFrame::new(RgbImage::new(4, 4)).is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut frame = CapturedFrame::new(RgbImage::new(2, 2));
        let copy = frame.clone();

        frame.image.put_pixel(0, 0, Rgb([255, 0, 0]));

        assert_eq!(copy.image.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(copy.timestamp, frame.timestamp);
        assert_eq!(copy.dimensions(), (2, 2));
    }
}
