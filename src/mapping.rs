// Normalized tap coordinates -> screen pixels -> overlay-local pixels.
//
// Students report taps as fractions of the slide (0..1 on each axis). The
// overlay covers a display region on the presenter's screen; a tap lands at
// `origin + fraction * size`. Dots are stored in the overlay's own (local)
// coordinates, so the overlay origin is subtracted afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A rectangle on the virtual desktop, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Absolute screen position of a normalized tap. Not clamped: input outside
    /// [0,1] maps outside the region.
    pub fn to_screen(&self, nx: f64, ny: f64) -> (f64, f64) {
        (nx * self.width as f64 + self.x as f64, ny * self.height as f64 + self.y as f64)
    }

    /// Screen position relative to this region's top-left corner.
    pub fn to_local(&self, px: f64, py: f64) -> (f64, f64) {
        (px - self.x as f64, py - self.y as f64)
    }

    /// True if the local point lies on the region (edges included).
    pub fn contains_local(&self, lx: f64, ly: f64) -> bool {
        lx >= 0.0 && ly >= 0.0 && lx <= self.width as f64 && ly <= self.height as f64
    }
}

/// Reject coordinates a student client could not have produced.
pub fn validate_normalized(nx: f64, ny: f64) -> Result<()> {
    let ok = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if ok(nx) && ok(ny) {
        Ok(())
    } else {
        Err(Error::MalformedTap(format!("normalized position ({nx}, {ny}) outside [0,1]")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONITOR: Region = Region::new(1920, 40, 1280, 720);

    #[test]
    fn corners_and_midpoint_map_exactly() {
        assert_eq!(MONITOR.to_screen(0.0, 0.0), (1920.0, 40.0));
        assert_eq!(MONITOR.to_screen(1.0, 1.0), (3200.0, 760.0));
        assert_eq!(MONITOR.to_screen(0.5, 0.5), (2560.0, 400.0));
    }

    #[test]
    fn mapping_is_not_clamped() {
        assert_eq!(MONITOR.to_screen(-0.5, 2.0), (1280.0, 1480.0));
    }

    #[test]
    fn local_round_trip_through_origin() {
        let (px, py) = MONITOR.to_screen(0.25, 0.75);
        let (lx, ly) = MONITOR.to_local(px, py);
        assert_eq!((lx, ly), (320.0, 540.0));
        assert!(MONITOR.contains_local(lx, ly));
        assert!(!MONITOR.contains_local(-1.0, 10.0));
        assert!(!MONITOR.contains_local(10.0, 721.0));
    }

    #[test]
    fn validation_rejects_out_of_range_and_nan() {
        assert!(validate_normalized(0.0, 1.0).is_ok());
        assert!(validate_normalized(1.01, 0.5).is_err());
        assert!(validate_normalized(0.5, -0.01).is_err());
        assert!(validate_normalized(f64::NAN, 0.5).is_err());
        assert!(validate_normalized(0.5, f64::INFINITY).is_err());
    }
}
