use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Smallest width or height accepted for a capture region
pub const MIN_REGION_SIZE: u32 = 10;

/// Axis-aligned rectangle in screen pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    /// Validate against [`MIN_REGION_SIZE`]
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Result<Self, CaptureError> {
        Self::with_minimum(x, y, width, height, MIN_REGION_SIZE)
    }

    pub fn with_minimum(
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        min: u32,
    ) -> Result<Self, CaptureError> {
        let region = Self {
            x,
            y,
            width,
            height,
        };
        region.validate(min)?;
        Ok(region)
    }

    pub fn validate(&self, min: u32) -> Result<(), CaptureError> {
        if self.width < min.max(1) || self.height < min.max(1) {
            return Err(CaptureError::InvalidRegion {
                width: self.width,
                height: self.height,
                min,
            });
        }
        Ok(())
    }

    /// Region spanned by two drag corners, in any order
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Result<Self, CaptureError> {
        let x = a.0.min(b.0);
        let y = a.1.min(b.1);
        let width = a.0.abs_diff(b.0);
        let height = a.1.abs_diff(b.1);
        Self::new(x, y, width, height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// What the region picker hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSelection {
    Selected(CaptureRegion),
    Cancelled,
}

impl From<Option<CaptureRegion>> for RegionSelection {
    fn from(region: Option<CaptureRegion>) -> Self {
        region.map_or(RegionSelection::Cancelled, RegionSelection::Selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_below_minimum_rejected() {
        let err = CaptureRegion::new(0, 0, 5, 5).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidRegion {
                width: 5,
                height: 5,
                min: MIN_REGION_SIZE
            }
        ));
    }

    #[test]
    fn test_region_at_minimum_accepted() {
        let region = CaptureRegion::new(-20, 40, 10, 10).unwrap();
        assert_eq!(region.pixel_count(), 100);
        assert_eq!(region.to_string(), "10x10+-20+40");
    }

    #[test]
    fn test_one_thin_side_is_enough_to_reject() {
        assert!(CaptureRegion::new(0, 0, 800, 4).is_err());
        assert!(CaptureRegion::with_minimum(0, 0, 60, 60, 50).is_ok());
        assert!(CaptureRegion::with_minimum(0, 0, 60, 40, 50).is_err());
    }

    #[test]
    fn test_zero_minimum_still_rejects_empty() {
        assert!(CaptureRegion::with_minimum(0, 0, 0, 10, 0).is_err());
    }

    #[test]
    fn test_from_corners_normalizes_drag_direction() {
        let region = CaptureRegion::from_corners((300, 200), (100, 50)).unwrap();
        assert_eq!(
            region,
            CaptureRegion {
                x: 100,
                y: 50,
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn test_selection_from_option() {
        assert_eq!(RegionSelection::from(None), RegionSelection::Cancelled);
        let region = CaptureRegion::new(0, 0, 20, 20).unwrap();
        assert_eq!(
            RegionSelection::from(Some(region)),
            RegionSelection::Selected(region)
        );
    }
}
