//! Region preprocessing before recognition
//!
//! Converts a frame to single-channel intensity once per job, then for each
//! region: crop (clipped to the frame), scale with linear interpolation and
//! encode as PNG for the engine.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

use crate::capture::frame::CapturedFrame;
use crate::regions::Region;
use crate::vision::RecognitionError;

/// Convert a frame to grayscale
pub fn to_luma(frame: &CapturedFrame) -> GrayImage {
    imageops::grayscale(&frame.image)
}

/// Crop a region, clipped to the image bounds. Returns `None` if nothing of
/// the region lies inside the image.
pub fn crop_region(gray: &GrayImage, region: &Region) -> Option<GrayImage> {
    let (x0, y0, x1, y1) = region.bounds();
    let x1 = x1.min(gray.width());
    let y1 = y1.min(gray.height());
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    Some(imageops::crop_imm(gray, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Resize by `scale` with linear interpolation. A scale of 1.0 is a no-op.
pub fn scale_image(image: GrayImage, scale: f64) -> GrayImage {
    if (scale - 1.0).abs() < f64::EPSILON {
        return image;
    }

    let width = scaled_dimension(image.width(), scale);
    let height = scaled_dimension(image.height(), scale);
    imageops::resize(&image, width, height, FilterType::Triangle)
}

fn scaled_dimension(value: u32, scale: f64) -> u32 {
    ((value as f64 * scale).round() as u32).max(1)
}

/// Encode as lossless PNG
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, RecognitionError> {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(image.clone()).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Crop, scale and encode one region. `Ok(None)` means the region lies
/// outside the frame and there is nothing to recognize.
pub fn prepare_region(gray: &GrayImage, region: &Region, scale: f64) -> Result<Option<Vec<u8>>, RecognitionError> {
    let Some(cropped) = crop_region(gray, region) else {
        debug!("Region {} lies outside the {}x{} frame", region, gray.width(), gray.height());
        return Ok(None);
    };

    let scaled = scale_image(cropped, scale);
    encode_png(&scaled).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn gray(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]))
    }

    #[test]
    fn test_to_luma() {
        let frame = CapturedFrame::new(RgbImage::from_pixel(2, 2, Rgb([255, 255, 255])));
        let gray = to_luma(&frame);
        assert_eq!(gray.dimensions(), (2, 2));
        assert_eq!(gray.get_pixel(1, 1), &Luma([255]));
    }

    #[test]
    fn test_crop_is_clipped() {
        let image = gray(100, 50);
        let region = Region { x: 80, y: 40, width: 50, height: 50 };
        let cropped = crop_region(&image, &region).unwrap();
        assert_eq!(cropped.dimensions(), (20, 10));
        assert_eq!(cropped.get_pixel(0, 0), image.get_pixel(80, 40));
    }

    #[test]
    fn test_crop_outside_frame() {
        let image = gray(100, 50);
        let region = Region { x: 200, y: 0, width: 10, height: 10 };
        assert!(crop_region(&image, &region).is_none());
        assert_eq!(prepare_region(&image, &region, 1.0).unwrap(), None);
    }

    #[test]
    fn test_scale_image() {
        assert_eq!(scale_image(gray(100, 40), 0.5).dimensions(), (50, 20));
        assert_eq!(scale_image(gray(100, 40), 1.0).dimensions(), (100, 40));
        // Never collapses to zero
        assert_eq!(scale_image(gray(3, 3), 0.1).dimensions(), (1, 1));
    }

    #[test]
    fn test_prepare_region_produces_png() {
        let image = gray(64, 64);
        let region = Region { x: 0, y: 0, width: 40, height: 20 };
        let png = prepare_region(&image, &region, 0.5).unwrap().unwrap();

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }
}
