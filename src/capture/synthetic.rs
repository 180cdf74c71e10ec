//! Synthetic test pattern source
//!
//! Renders a moving gradient with dark bars so the pipeline can run without
//! a capture device.

use image::{Rgb, RgbImage};

use super::frame::CapturedFrame;
use super::{CaptureError, CaptureProperties, FrameSource, SYNTHETIC_SOURCE};

/// Highest frame rate the pattern generator reports as supported
pub const SYNTHETIC_MAX_FPS: u32 = 30;

pub struct SyntheticSource {
    props: CaptureProperties,
    max_fps: u32,
    frame_index: u64,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::with_max_fps(SYNTHETIC_MAX_FPS)
    }

    pub fn with_max_fps(max_fps: u32) -> Self {
        Self {
            props: CaptureProperties {
                width: 640,
                height: 480,
                fps: 0,
            },
            max_fps,
            frame_index: 0,
        }
    }

    fn render(&self) -> RgbImage {
        let (width, height) = (self.props.width, self.props.height);
        let shift = (self.frame_index % 256) as u32;
        let bar_height = (height / 8).max(1);

        RgbImage::from_fn(width, height, |x, y| {
            // Dark horizontal bars stand in for lines of text
            if (y / bar_height) % 3 == 1 && x % 64 < 48 {
                return Rgb([16, 16, 16]);
            }
            let r = ((x + shift) % 256) as u8;
            let g = ((y + shift) % 256) as u8;
            Rgb([r, g, 200])
        })
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        SYNTHETIC_SOURCE
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        self.props.width = width;
        self.props.height = height;
    }

    fn set_fps(&mut self, fps: u32) {
        if fps <= self.max_fps {
            self.props.fps = fps;
        }
    }

    fn properties(&self) -> CaptureProperties {
        self.props
    }

    fn read(&mut self) -> Result<CapturedFrame, CaptureError> {
        let frame = CapturedFrame::new(self.render());
        self.frame_index += 1;
        Ok(frame)
    }
}
