//! Frame Capture Layer
//!
//! Frame sources are thin wrappers behind the [`FrameSource`] trait. The
//! pipeline only needs open/configure/read; everything device specific stays
//! inside the implementation.

pub mod frame;
pub mod image_source;
pub mod synthetic;
#[cfg(feature = "backend-opencv")]
pub mod video;

use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capture::frame::CapturedFrame;

pub use image_source::ImageSequenceSource;
pub use synthetic::SyntheticSource;

/// Source identifier selecting the built-in test pattern
pub const SYNTHETIC_SOURCE: &str = "synthetic";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open source {source_id}: {reason}")]
    Open { source_id: String, reason: String },
    #[error("failed to read frame: {0}")]
    Read(String),
    #[error("end of stream")]
    EndOfStream,
}

impl CaptureError {
    pub fn open(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Open {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }
}

/// Properties reported back by a source after configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureProperties {
    pub width: u32,
    pub height: u32,
    /// Active frame rate (0 = unset)
    pub fps: u32,
}

/// A source of video frames
pub trait FrameSource {
    /// Human readable identifier for logs
    fn name(&self) -> &str;

    /// Request a frame size; the source may ignore it
    fn set_resolution(&mut self, width: u32, height: u32);

    /// Request a frame rate; read back with [`FrameSource::properties`]
    fn set_fps(&mut self, fps: u32);

    /// Currently active properties
    fn properties(&self) -> CaptureProperties;

    /// Read the next frame. `Read` errors are transient.
    fn read(&mut self) -> Result<CapturedFrame, CaptureError>;
}

/// Open a source from its identifier.
///
/// "synthetic" selects the test pattern, a directory or image file replays
/// images (once, or forever with `loop_images`), anything else is a camera
/// index, device path or video file.
pub fn open_source(identifier: &str, loop_images: bool) -> Result<Box<dyn FrameSource>, CaptureError> {
    if identifier == SYNTHETIC_SOURCE {
        info!("Opening synthetic test pattern source");
        return Ok(Box::new(SyntheticSource::new()));
    }

    let path = Path::new(identifier);
    if path.is_dir() || image_source::is_image_path(path) {
        let source = ImageSequenceSource::open(path, loop_images)?;
        info!("Opened image source {} ({} images)", identifier, source.len());
        return Ok(Box::new(source));
    }

    open_video(identifier)
}

#[cfg(feature = "backend-opencv")]
fn open_video(identifier: &str) -> Result<Box<dyn FrameSource>, CaptureError> {
    let source = video::VideoCaptureSource::open(identifier)?;
    info!("Opened video source {}", identifier);
    Ok(Box::new(source))
}

#[cfg(not(feature = "backend-opencv"))]
fn open_video(identifier: &str) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::open(
        identifier,
        "video devices and files need a build with --features backend-opencv",
    ))
}

/// Best-effort configuration: set the resolution, then walk the frame rate
/// down from `fps` until the source reports the value back.
///
/// Returns the accepted frame rate, or `None` if nothing down to 1 was accepted.
pub fn configure(source: &mut dyn FrameSource, width: u32, height: u32, fps: u32) -> Option<u32> {
    source.set_resolution(width, height);

    for candidate in (1..=fps).rev() {
        source.set_fps(candidate);
        if source.properties().fps == candidate {
            debug!("Source {} accepted {} fps", source.name(), candidate);
            return Some(candidate);
        }
    }

    warn!("Source {} accepted no frame rate up to {}", source.name(), fps);
    None
}

/// Log the negotiated capture properties
pub fn log_properties(source: &dyn FrameSource) {
    let props = source.properties();
    info!("Source: {}", source.name());
    info!("Frame Width: {}", props.width);
    info!("Frame Height: {}", props.height);
    info!("FPS: {}", props.fps);
}
