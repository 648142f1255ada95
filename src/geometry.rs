//! Geometry primitives for gaze computations
//!
//! 2D/3D points and vectors used by the coordinate transforms and the
//! calibration validation statistics. Equality is tolerance-based because
//! screen points are compared after floating-point arithmetic.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Relative tolerance used for coordinate comparisons
const REL_TOL: f64 = 1e-9;

/// Tolerance-based float comparison: `|a-b| <= rel_tol * max(|a|, |b|)`
pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= REL_TOL * a.abs().max(b.abs())
}

/// A 2D point in the normalized active display coordinate system
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True if both coordinates lie in [0, 1]
    pub fn in_unit_square(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

impl PartialEq for Point2 {
    fn eq(&self, other: &Self) -> bool {
        approx_eq(self.x, other.x) && approx_eq(self.y, other.y)
    }
}

/// A 3D point in the device's user coordinate system (millimeters)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point3) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2) + (other.z - self.z).powi(2))
            .sqrt()
    }
}

impl PartialEq for Point3 {
    fn eq(&self, other: &Self) -> bool {
        approx_eq(self.x, other.x) && approx_eq(self.y, other.y) && approx_eq(self.z, other.z)
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A 3D direction vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Displacement vector from one point to another
    pub fn between(from: Point3, to: Point3) -> Self {
        let d = to - from;
        Self::new(d.x, d.y, d.z)
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// Scale to unit length. Undefined for zero-magnitude vectors; callers
    /// must guarantee a non-degenerate direction.
    pub fn normalize(&self) -> Vector3 {
        let inv = 1.0 / self.magnitude();
        Vector3::new(self.x * inv, self.y * inv, self.z * inv)
    }

    /// Angle between two vectors, in degrees.
    ///
    /// The cosine is clamped to [-1, 1] before `acos`: floating error can push
    /// it fractionally outside the domain for near-parallel vectors.
    pub fn angle(&self, other: &Vector3) -> f64 {
        let cos = self.dot(other) / (self.magnitude() * other.magnitude());
        cos.clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Average of a set of 3D points. NaN components on an empty set.
pub fn mean_point(points: &[Point3]) -> Point3 {
    let mut sum = Point3::default();
    for p in points {
        sum = sum + *p;
    }
    sum * (1.0 / points.len() as f64)
}

/// Physical display area geometry in the device's 3D user coordinate space,
/// described by three corner points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DisplayArea {
    pub top_left: Point3,
    pub top_right: Point3,
    pub bottom_left: Point3,
}

impl DisplayArea {
    /// Map a normalized screen point onto the physical display plane.
    pub fn point_on_display(&self, target: Point2) -> Point3 {
        let dx = (self.top_right - self.top_left) * target.x;
        let dy = (self.bottom_left - self.top_left) * target.y;
        self.top_left + dx + dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_equality() {
        let a = Point2::new(0.1 + 0.2, 1.0);
        let b = Point2::new(0.3, 1.0);
        assert_eq!(a, b);
        assert_ne!(Point2::new(0.3, 1.0), Point2::new(0.3001, 1.0));
    }

    #[test]
    fn test_angle_identical_and_opposite() {
        let v = Vector3::new(0.0, 0.0, 1.0);
        assert!(v.angle(&v).abs() < 1e-9);

        let w = Vector3::new(0.0, 0.0, -1.0);
        assert!((v.angle(&w) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_clamps_cosine() {
        // Parallel unit vectors whose dot product can exceed 1.0 by rounding
        let v = Vector3::new(0.1, 0.2, 0.3).normalize();
        let angle = v.angle(&v);
        assert!(angle.is_finite());
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn test_angle_right_angle() {
        let v = Vector3::new(1.0, 0.0, 0.0);
        let w = Vector3::new(0.0, 1.0, 0.0);
        assert!((v.angle(&w) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_magnitude() {
        let v = Vector3::new(3.0, 4.0, 12.0);
        assert!((v.normalize().magnitude() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_point() {
        let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(3.0, 4.0, 5.0)];
        let mean = mean_point(&points);
        assert_eq!(mean, Point3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_mean_point_empty_is_nan() {
        let mean = mean_point(&[]);
        assert!(mean.x.is_nan() && mean.y.is_nan() && mean.z.is_nan());
    }

    #[test]
    fn test_point_on_display_corners() {
        let area = DisplayArea {
            top_left: Point3::new(-200.0, 150.0, 10.0),
            top_right: Point3::new(200.0, 150.0, 10.0),
            bottom_left: Point3::new(-200.0, -150.0, 10.0),
        };
        assert_eq!(
            area.point_on_display(Point2::new(0.0, 0.0)),
            area.top_left
        );
        assert_eq!(
            area.point_on_display(Point2::new(1.0, 0.0)),
            area.top_right
        );
        assert_eq!(
            area.point_on_display(Point2::new(0.5, 1.0)),
            Point3::new(0.0, -150.0, 10.0)
        );
    }

    #[test]
    fn test_distance() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }
}
