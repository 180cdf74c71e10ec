//! Region Model
//!
//! Ordered list of frame rectangles to run text recognition on. Regions are
//! appended at startup (from configuration) and interactively (drag gesture);
//! they are never removed automatically.

use parking_lot::RwLock;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ConfigError;

/// A rectangle in source-frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Validate and build a region from signed components
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Result<Self, ConfigError> {
        if width <= 0 || height <= 0 {
            return Err(ConfigError::EmptyRegion { width, height });
        }
        if x < 0 || y < 0 {
            return Err(ConfigError::NegativeOrigin { x, y });
        }
        let to_u32 = |v: i64| u32::try_from(v).map_err(|_| ConfigError::RegionOutOfRange(v));
        Ok(Self {
            x: to_u32(x)?,
            y: to_u32(y)?,
            width: to_u32(width)?,
            height: to_u32(height)?,
        })
    }

    /// Region covering a whole frame of the given size
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Corner form: (x0, y0, x1, y1)
    pub fn bounds(&self) -> (u32, u32, u32, u32) {
        (
            self.x,
            self.y,
            self.x.saturating_add(self.width),
            self.y.saturating_add(self.height),
        )
    }
}

impl fmt::Display for Region {
    /// Formats as the `x,y,w,h` form accepted by `--region`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    /// Parse `x,y,w,h`
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidRegion(value.to_string());

        let parts: Vec<&str> = value.split(',').map(|s| s.trim()).collect();
        if parts.len() != 4 {
            return Err(invalid());
        }

        let mut nums = [0i64; 4];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Region::new(nums[0], nums[1], nums[2], nums[3])
    }
}

/// Shared, append-only list of regions
///
/// Cloning yields another handle to the same list.
#[derive(Debug, Clone, Default)]
pub struct RegionModel {
    regions: Arc<RwLock<Vec<Region>>>,
}

impl RegionModel {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from already-validated regions
    pub fn with_regions(regions: Vec<Region>) -> Self {
        Self {
            regions: Arc::new(RwLock::new(regions)),
        }
    }

    /// Validate and append a rectangle
    pub fn add_region(&self, x: i64, y: i64, width: i64, height: i64) -> Result<Region, ConfigError> {
        let region = Region::new(x, y, width, height)?;
        self.regions.write().push(region);
        Ok(region)
    }

    /// Install a single full-frame region if the list is empty.
    /// Returns true if the default was installed.
    pub fn default_if_empty(&self, frame_width: u32, frame_height: u32) -> bool {
        let mut regions = self.regions.write();
        if regions.is_empty() {
            regions.push(Region::full_frame(frame_width, frame_height));
            true
        } else {
            false
        }
    }

    /// Immutable snapshot of the current list, in insertion order
    pub fn regions(&self) -> Arc<[Region]> {
        Arc::from(self.regions.read().as_slice())
    }

    pub fn len(&self) -> usize {
        self.regions.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.regions.read().is_empty()
    }
}
