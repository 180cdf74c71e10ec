//! Overlay Presentation Layer
//!
//! Draws the active regions (and any in-progress drag) onto each frame and
//! hands it to a [`DisplaySurface`]. The display is also the source of
//! operator input events.

pub mod console;
#[cfg(feature = "backend-opencv")]
pub mod window;
pub mod zone_selection;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::capture::frame::CapturedFrame;
use crate::hotkey::Key;
use crate::regions::Region;

/// Outline color for active regions
pub const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Outline color for the rectangle being dragged
pub const SELECTION_COLOR: Rgb<u8> = Rgb([0, 150, 255]);
/// Outline thickness in pixels
pub const OUTLINE_THICKNESS: u32 = 3;

/// Input event reported by a display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    None,
    Key(Key),
    MouseDown { x: i32, y: i32 },
    MouseMove { x: i32, y: i32 },
    MouseUp { x: i32, y: i32 },
}

/// A surface that shows frames and reports operator input
pub trait DisplaySurface {
    /// Present an annotated frame
    fn show(&mut self, frame: &CapturedFrame) -> Result<()>;

    /// Next pending input event, without blocking
    fn poll_event(&mut self) -> UiEvent;
}

/// Outline every region, plus the in-progress selection if any
pub fn annotate_frame(image: &mut RgbImage, regions: &[Region], selection: Option<(i64, i64, i64, i64)>) {
    for region in regions {
        draw_outline(
            image,
            region.x as i64,
            region.y as i64,
            region.width as i64,
            region.height as i64,
            REGION_COLOR,
        );
    }

    if let Some((x, y, width, height)) = selection {
        draw_outline(image, x, y, width, height, SELECTION_COLOR);
    }
}

fn draw_outline(image: &mut RgbImage, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
    for inset in 0..OUTLINE_THICKNESS as i64 {
        let w = width - 2 * inset;
        let h = height - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let (Ok(rx), Ok(ry), Ok(rw), Ok(rh)) = (
            i32::try_from(x + inset),
            i32::try_from(y + inset),
            u32::try_from(w),
            u32::try_from(h),
        ) else {
            return;
        };
        draw_hollow_rect_mut(image, Rect::at(rx, ry).of_size(rw, rh), color);
    }
}

/// Display without a window
///
/// Optionally writes the latest annotated frame to a PNG file, and reports
/// the quit key once a frame limit is reached so unattended runs end cleanly.
/// Other input comes from an optional event channel (see [`console`]).
pub struct HeadlessDisplay {
    input: Option<Receiver<UiEvent>>,
    snapshot_path: Option<PathBuf>,
    snapshot_every: u64,
    max_frames: u64,
    quit_key: Key,
    shown: u64,
    quit_reported: bool,
}

impl HeadlessDisplay {
    pub fn new(quit_key: Key) -> Self {
        Self {
            input: None,
            snapshot_path: None,
            snapshot_every: 1,
            max_frames: 0,
            quit_key,
            shown: 0,
            quit_reported: false,
        }
    }

    /// Write a snapshot every `every` frames
    pub fn with_snapshot(mut self, path: PathBuf, every: u64) -> Self {
        self.snapshot_path = Some(path);
        self.snapshot_every = every.max(1);
        self
    }

    /// Report events arriving on `input`
    pub fn with_input(mut self, input: Receiver<UiEvent>) -> Self {
        self.input = Some(input);
        self
    }

    /// Report the quit key after `max_frames` frames (0 = never)
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Frames shown so far
    #[cfg(test)]
    pub fn shown(&self) -> u64 {
        self.shown
    }
}

impl DisplaySurface for HeadlessDisplay {
    fn show(&mut self, frame: &CapturedFrame) -> Result<()> {
        self.shown += 1;

        if let Some(path) = &self.snapshot_path {
            if self.shown % self.snapshot_every == 0 {
                frame
                    .image
                    .save(path)
                    .with_context(|| format!("Failed to write snapshot {:?}", path))?;
                let (width, height) = frame.dimensions();
                debug!("Wrote {}x{} snapshot {:?}", width, height, path);
            }
        }
        Ok(())
    }

    fn poll_event(&mut self) -> UiEvent {
        if self.max_frames > 0 && self.shown >= self.max_frames && !self.quit_reported {
            self.quit_reported = true;
            info!("Frame limit of {} reached", self.max_frames);
            return UiEvent::Key(self.quit_key);
        }

        self.input
            .as_ref()
            .and_then(|input| input.try_recv().ok())
            .unwrap_or(UiEvent::None)
    }
}
