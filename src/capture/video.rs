//! Video device and file source backed by OpenCV `videoio`
//!
//! A numeric identifier opens that camera index, anything else is handed to
//! OpenCV as a path or URL (`/dev/video0`, `clip.mp4`, `rtsp://...`).

use image::RgbImage;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgproc, videoio};
use tracing::debug;

use super::frame::CapturedFrame;
use super::{CaptureError, CaptureProperties, FrameSource};

pub struct VideoCaptureSource {
    name: String,
    capture: videoio::VideoCapture,
    /// Files end; devices only ever hiccup
    is_file: bool,
    bgr: Mat,
    rgb: Mat,
}

impl VideoCaptureSource {
    pub fn open(identifier: &str) -> Result<Self, CaptureError> {
        let open_error = |e: opencv::Error| CaptureError::open(identifier, e.to_string());

        let (capture, is_file) = match identifier.parse::<i32>() {
            Ok(index) => (
                videoio::VideoCapture::new(index, videoio::CAP_ANY).map_err(open_error)?,
                false,
            ),
            Err(_) => (
                videoio::VideoCapture::from_file(identifier, videoio::CAP_ANY).map_err(open_error)?,
                !identifier.starts_with("/dev/"),
            ),
        };

        if !capture.is_opened().map_err(open_error)? {
            return Err(CaptureError::open(identifier, "device or file could not be opened"));
        }

        Ok(Self {
            name: identifier.to_string(),
            capture,
            is_file,
            bgr: Mat::default(),
            rgb: Mat::default(),
        })
    }

    fn set_property(&mut self, property: i32, value: f64) {
        if let Err(e) = self.capture.set(property, value) {
            debug!("Source {} rejected property {} = {}: {}", self.name, property, value, e);
        }
    }

    fn property(&self, property: i32) -> u32 {
        self.capture
            .get(property)
            .map(|v| if v.is_finite() && v > 0.0 { v.round() as u32 } else { 0 })
            .unwrap_or(0)
    }

    fn to_frame(&mut self) -> Result<CapturedFrame, CaptureError> {
        imgproc::cvt_color(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| CaptureError::Read(e.to_string()))?;

        let width = u32::try_from(self.rgb.cols()).unwrap_or(0);
        let height = u32::try_from(self.rgb.rows()).unwrap_or(0);
        let data = self
            .rgb
            .data_bytes()
            .map_err(|e| CaptureError::Read(e.to_string()))?
            .to_vec();

        RgbImage::from_raw(width, height, data)
            .map(CapturedFrame::new)
            .ok_or_else(|| CaptureError::Read(format!("unexpected {}x{} frame layout", width, height)))
    }
}

impl FrameSource for VideoCaptureSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        self.set_property(videoio::CAP_PROP_FRAME_WIDTH, width as f64);
        self.set_property(videoio::CAP_PROP_FRAME_HEIGHT, height as f64);
    }

    fn set_fps(&mut self, fps: u32) {
        self.set_property(videoio::CAP_PROP_FPS, fps as f64);
    }

    fn properties(&self) -> CaptureProperties {
        CaptureProperties {
            width: self.property(videoio::CAP_PROP_FRAME_WIDTH),
            height: self.property(videoio::CAP_PROP_FRAME_HEIGHT),
            fps: self.property(videoio::CAP_PROP_FPS),
        }
    }

    fn read(&mut self) -> Result<CapturedFrame, CaptureError> {
        let grabbed = self
            .capture
            .read(&mut self.bgr)
            .map_err(|e| CaptureError::Read(e.to_string()))?;

        if !grabbed {
            if self.is_file {
                return Err(CaptureError::EndOfStream);
            }
            return Ok(CapturedFrame::empty());
        }
        if self.bgr.empty() {
            return Ok(CapturedFrame::empty());
        }

        self.to_frame()
    }
}
