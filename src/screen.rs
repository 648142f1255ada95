//! Coordinate transforms between the device and application screen units
//!
//! The tracking device reports gaze in the normalized active display
//! coordinate system: (0, 0) top-left, (1, 1) bottom-right. Applications work
//! in one of six configurable unit systems with a centered origin and an
//! upward vertical axis. Both directions first/last apply the vertical flip
//! `y' = 1 - y` so the round-trip is exact.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::GazeError;
use crate::geometry::Point2;

/// Small-angle factor: centimeters per degree at 1 cm viewing distance
const DEG_PER_CM_FACTOR: f64 = 0.017455;

/// Application screen unit systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenUnits {
    /// Pixels, centered on the screen
    Pix,
    /// Physical centimeters, centered on the screen
    Cm,
    /// Normalized device-independent [-1, 1]
    Norm,
    /// Fraction of screen height
    Height,
    /// Visual angle in degrees (small-angle approximation)
    Deg,
    /// Visual angle in degrees with flat-screen correction
    #[serde(rename = "degFlat")]
    DegFlat,
}

impl ScreenUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenUnits::Pix => "pix",
            ScreenUnits::Cm => "cm",
            ScreenUnits::Norm => "norm",
            ScreenUnits::Height => "height",
            ScreenUnits::Deg => "deg",
            ScreenUnits::DegFlat => "degFlat",
        }
    }
}

impl FromStr for ScreenUnits {
    type Err = GazeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pix" => Ok(ScreenUnits::Pix),
            "cm" => Ok(ScreenUnits::Cm),
            "norm" => Ok(ScreenUnits::Norm),
            "height" => Ok(ScreenUnits::Height),
            "deg" => Ok(ScreenUnits::Deg),
            "degFlat" | "degflat" => Ok(ScreenUnits::DegFlat),
            other => Err(GazeError::UnsupportedUnits(other.to_string())),
        }
    }
}

/// Screen geometry and the unit system the application renders in
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub width_px: u32,
    pub height_px: u32,
    pub width_cm: f64,
    pub height_cm: f64,
    /// Viewing distance, used by the visual-angle units
    pub distance_cm: f64,
    pub units: ScreenUnits,
}

impl ScreenConfig {
    pub fn new(
        width_px: u32,
        height_px: u32,
        width_cm: f64,
        height_cm: f64,
        distance_cm: f64,
        units: ScreenUnits,
    ) -> Result<Self, GazeError> {
        if width_px == 0 || height_px == 0 {
            return Err(GazeError::InvalidConfig(
                "screen resolution must be non-zero".to_string(),
            ));
        }
        if width_cm <= 0.0 || height_cm <= 0.0 {
            return Err(GazeError::InvalidConfig(
                "physical screen size must be positive".to_string(),
            ));
        }
        if matches!(units, ScreenUnits::Deg | ScreenUnits::DegFlat) && distance_cm <= 0.0 {
            return Err(GazeError::InvalidConfig(
                "viewing distance must be positive for visual-angle units".to_string(),
            ));
        }
        Ok(Self {
            width_px,
            height_px,
            width_cm,
            height_cm,
            distance_cm,
            units,
        })
    }

    fn width_px_f(&self) -> f64 {
        self.width_px as f64
    }

    fn height_px_f(&self) -> f64 {
        self.height_px as f64
    }

    /// Pixels to centimeters. Scale is derived from the screen width and
    /// applied to both axes; pixels are assumed square.
    pub fn pix2cm(&self, pixels: f64) -> f64 {
        pixels * self.width_cm / self.width_px_f()
    }

    pub fn cm2pix(&self, cm: f64) -> f64 {
        cm * self.width_px_f() / self.width_cm
    }

    /// Centimeters to visual degrees, small-angle approximation
    pub fn cm2deg(&self, cm: f64) -> f64 {
        cm / (self.distance_cm * DEG_PER_CM_FACTOR)
    }

    pub fn deg2cm(&self, deg: f64) -> f64 {
        deg * self.distance_cm * DEG_PER_CM_FACTOR
    }

    /// Centimeters to visual degrees, corrected for a flat screen
    pub fn cm2deg_flat(&self, cm: f64) -> f64 {
        (cm / self.distance_cm).atan().to_degrees()
    }

    pub fn deg2cm_flat(&self, deg: f64) -> f64 {
        self.distance_cm * deg.to_radians().tan()
    }

    pub fn pix2deg(&self, pixels: f64, flat: bool) -> f64 {
        let cm = self.pix2cm(pixels);
        if flat {
            self.cm2deg_flat(cm)
        } else {
            self.cm2deg(cm)
        }
    }

    pub fn deg2pix(&self, deg: f64, flat: bool) -> f64 {
        let cm = if flat {
            self.deg2cm_flat(deg)
        } else {
            self.deg2cm(deg)
        };
        self.cm2pix(cm)
    }

    /// Convert a device point (normalized active display coordinates) into
    /// the application's screen units.
    pub fn to_screen(&self, p: Point2) -> Point2 {
        let p = Point2::new(p.x, 1.0 - p.y); // flip vertical axis
        match self.units {
            ScreenUnits::Norm => Point2::new(2.0 * p.x - 1.0, 2.0 * p.y - 1.0),
            ScreenUnits::Height => Point2::new(
                (p.x - 0.5) * self.width_px_f() / self.height_px_f(),
                p.y - 0.5,
            ),
            ScreenUnits::Pix => Point2::new(
                (p.x - 0.5) * self.width_px_f(),
                (p.y - 0.5) * self.height_px_f(),
            ),
            ScreenUnits::Cm => Point2::new(
                self.pix2cm((p.x - 0.5) * self.width_px_f()),
                self.pix2cm((p.y - 0.5) * self.height_px_f()),
            ),
            ScreenUnits::Deg => Point2::new(
                self.pix2deg((p.x - 0.5) * self.width_px_f(), false),
                self.pix2deg((p.y - 0.5) * self.height_px_f(), false),
            ),
            ScreenUnits::DegFlat => Point2::new(
                self.pix2deg((p.x - 0.5) * self.width_px_f(), true),
                self.pix2deg((p.y - 0.5) * self.height_px_f(), true),
            ),
        }
    }

    /// Convert an application screen point back into the device's normalized
    /// active display coordinates. Exact algebraic inverse of
    /// [`to_screen`](Self::to_screen) per unit kind.
    pub fn to_device(&self, p: Point2) -> Point2 {
        let gp = match self.units {
            ScreenUnits::Norm => Point2::new((p.x + 1.0) / 2.0, (p.y + 1.0) / 2.0),
            ScreenUnits::Height => Point2::new(
                p.x * self.height_px_f() / self.width_px_f() + 0.5,
                p.y + 0.5,
            ),
            ScreenUnits::Pix => Point2::new(
                p.x / self.width_px_f() + 0.5,
                p.y / self.height_px_f() + 0.5,
            ),
            ScreenUnits::Cm => Point2::new(
                self.cm2pix(p.x) / self.width_px_f() + 0.5,
                self.cm2pix(p.y) / self.height_px_f() + 0.5,
            ),
            ScreenUnits::Deg => Point2::new(
                self.deg2pix(p.x, false) / self.width_px_f() + 0.5,
                self.deg2pix(p.y, false) / self.height_px_f() + 0.5,
            ),
            ScreenUnits::DegFlat => Point2::new(
                self.deg2pix(p.x, true) / self.width_px_f() + 0.5,
                self.deg2pix(p.y, true) / self.height_px_f() + 0.5,
            ),
        };
        Point2::new(gp.x, 1.0 - gp.y) // flip vertical axis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(units: ScreenUnits) -> ScreenConfig {
        ScreenConfig::new(1920, 1080, 52.0, 29.0, 60.0, units).unwrap()
    }

    const ALL_UNITS: [ScreenUnits; 6] = [
        ScreenUnits::Pix,
        ScreenUnits::Cm,
        ScreenUnits::Norm,
        ScreenUnits::Height,
        ScreenUnits::Deg,
        ScreenUnits::DegFlat,
    ];

    #[test]
    fn test_round_trip_all_units() {
        for units in ALL_UNITS {
            let cfg = config(units);
            // 100 points strictly inside the visible area
            for i in 0..10 {
                for j in 0..10 {
                    let p = Point2::new(
                        0.05 + 0.1 * i as f64,
                        0.05 + 0.1 * j as f64,
                    );
                    let round = cfg.to_device(cfg.to_screen(p));
                    assert!(
                        (round.x - p.x).abs() < 1e-6 && (round.y - p.y).abs() < 1e-6,
                        "round-trip failed for {:?} at ({}, {}): got ({}, {})",
                        units,
                        p.x,
                        p.y,
                        round.x,
                        round.y
                    );
                }
            }
        }
    }

    #[test]
    fn test_center_maps_to_origin() {
        for units in ALL_UNITS {
            let cfg = config(units);
            let center = cfg.to_screen(Point2::new(0.5, 0.5));
            assert!(center.x.abs() < 1e-9 && center.y.abs() < 1e-9);
        }
    }

    #[test]
    fn test_vertical_flip() {
        let cfg = config(ScreenUnits::Pix);
        // (0, 0) is the device's top-left; in pix units that is up-left of center
        let p = cfg.to_screen(Point2::new(0.0, 0.0));
        assert!((p.x - -960.0).abs() < 1e-9);
        assert!((p.y - 540.0).abs() < 1e-9);
    }

    #[test]
    fn test_norm_units() {
        let cfg = config(ScreenUnits::Norm);
        let p = cfg.to_screen(Point2::new(1.0, 1.0));
        assert!((p.x - 1.0).abs() < 1e-9);
        assert!((p.y - -1.0).abs() < 1e-9);
    }

    #[test]
    fn test_deg_small_angle() {
        let cfg = config(ScreenUnits::Deg);
        // One degree to the right of center
        let x_cm = cfg.deg2cm(1.0);
        assert!((x_cm - 60.0 * 0.017455).abs() < 1e-12);
        let p_dev = cfg.to_device(Point2::new(1.0, 0.0));
        let back = cfg.to_screen(p_dev);
        assert!((back.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_deg_flat_uses_atan() {
        let cfg = config(ScreenUnits::DegFlat);
        // 60 cm offset at 60 cm distance is exactly 45 degrees
        assert!((cfg.cm2deg_flat(60.0) - 45.0).abs() < 1e-9);
        assert!((cfg.deg2cm_flat(45.0) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_units_from_str() {
        assert_eq!("pix".parse::<ScreenUnits>().unwrap(), ScreenUnits::Pix);
        assert_eq!(
            "degFlat".parse::<ScreenUnits>().unwrap(),
            ScreenUnits::DegFlat
        );
        assert!(matches!(
            "furlong".parse::<ScreenUnits>(),
            Err(GazeError::UnsupportedUnits(_))
        ));
    }

    #[test]
    fn test_units_json_form_matches_canonical_token() {
        // The serialized form must parse back through FromStr
        for units in ALL_UNITS {
            let json = serde_json::to_string(&units).unwrap();
            let token = json.trim_matches('"');
            assert_eq!(token, units.as_str());
            assert_eq!(token.parse::<ScreenUnits>().unwrap(), units);
        }
        assert_eq!(
            serde_json::to_string(&ScreenUnits::DegFlat).unwrap(),
            "\"degFlat\""
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ScreenConfig::new(0, 1080, 52.0, 29.0, 60.0, ScreenUnits::Pix).is_err());
        assert!(ScreenConfig::new(1920, 1080, 52.0, 29.0, 0.0, ScreenUnits::Deg).is_err());
        // Zero distance is fine for non-angle units
        assert!(ScreenConfig::new(1920, 1080, 52.0, 29.0, 0.0, ScreenUnits::Pix).is_ok());
    }
}
