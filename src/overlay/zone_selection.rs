//! Drag gesture for defining OCR regions
//!
//! Pure two-point state: mouse-down latches an anchor, mouse-up turns the
//! anchor and the release point into a candidate region descriptor. Event
//! polling and drawing live elsewhere.

use std::fmt;

use crate::config::ConfigError;
use crate::regions::Region;

/// Candidate region as drawn: `(x0, y0, x1 - x0, y1 - y0)`.
/// Width or height are negative when the drag went up or left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionDescriptor {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl RegionDescriptor {
    /// Validate into a region
    pub fn to_region(&self) -> Result<Region, ConfigError> {
        Region::new(self.x, self.y, self.width, self.height)
    }
}

impl fmt::Display for RegionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DragGesture {
    /// Press position
    anchor: Option<(i64, i64)>,
    /// Latest pointer position while dragging
    current: Option<(i64, i64)>,
}

impl DragGesture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mouse button pressed: latch the anchor
    pub fn press(&mut self, x: i32, y: i32) {
        let point = (x as i64, y as i64);
        self.anchor = Some(point);
        self.current = Some(point);
    }

    /// Pointer moved; only tracked while a drag is in progress
    pub fn moved(&mut self, x: i32, y: i32) {
        if self.anchor.is_some() {
            self.current = Some((x as i64, y as i64));
        }
    }

    /// Mouse button released: produce the descriptor and reset.
    /// Returns `None` for a release without a prior press.
    pub fn release(&mut self, x: i32, y: i32) -> Option<RegionDescriptor> {
        let (x0, y0) = self.anchor.take()?;
        self.current = None;

        let (x1, y1) = (x as i64, y as i64);
        Some(RegionDescriptor {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Rectangle currently being dragged, normalized to its top-left corner:
    /// (x, y, width, height)
    pub fn preview(&self) -> Option<(i64, i64, i64, i64)> {
        let (ax, ay) = self.anchor?;
        let (cx, cy) = self.current?;
        Some((ax.min(cx), ay.min(cy), (cx - ax).abs(), (cy - ay).abs()))
    }
}
