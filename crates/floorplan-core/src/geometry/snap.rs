//! Snap functionality for aligning points to the grid and lines to standard angles.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Grid size for snapping (matches the visual grid).
pub const GRID_SIZE: f64 = 20.0;

/// Angles, in degrees, that wall lines snap to.
pub const STANDARD_ANGLES: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

/// Lines closer than this to a target angle count as already aligned.
const ALIGNED_TOLERANCE_DEGREES: f64 = 1e-6;

/// Lines shorter than this have no meaningful angle.
const MIN_LINE_LENGTH: f64 = 1e-9;

/// Snap mode for aligning pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapMode {
    /// No snapping.
    None,
    /// Snap points to grid intersections.
    Grid,
    /// Snap line directions to the standard angles.
    Angle,
    /// Snap to both grid and angles.
    #[default]
    All,
}

impl SnapMode {
    /// Cycle to the next snap mode.
    pub fn next(self) -> Self {
        match self {
            SnapMode::None => SnapMode::Grid,
            SnapMode::Grid => SnapMode::Angle,
            SnapMode::Angle => SnapMode::All,
            SnapMode::All => SnapMode::None,
        }
    }

    /// Check if grid snapping is enabled.
    pub fn snaps_to_grid(self) -> bool {
        matches!(self, SnapMode::Grid | SnapMode::All)
    }

    /// Check if angle snapping is enabled.
    pub fn snaps_to_angles(self) -> bool {
        matches!(self, SnapMode::Angle | SnapMode::All)
    }

    /// Check if any snapping is enabled.
    pub fn is_enabled(self) -> bool {
        self != SnapMode::None
    }
}

/// Result of a per-axis snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Result of an angle snap operation.
#[derive(Debug, Clone, Copy)]
pub struct AngleSnapResult {
    /// The snapped endpoint.
    pub point: Point,
    /// The snapped angle in degrees (0-360).
    pub angle_degrees: f64,
    /// The original (unsnapped) angle in degrees.
    pub original_angle_degrees: f64,
    /// Whether the endpoint moved.
    pub snapped: bool,
    /// Distance from start point (preserved from original).
    pub distance: f64,
}

impl AngleSnapResult {
    /// Create a result with no snapping.
    fn unchanged(point: Point, angle_degrees: f64, distance: f64) -> Self {
        Self {
            point,
            angle_degrees,
            original_angle_degrees: angle_degrees,
            snapped: false,
            distance,
        }
    }
}

fn valid_grid_size(grid_size: f64) -> bool {
    grid_size.is_finite() && grid_size > 0.0
}

/// Round a single coordinate to the nearest multiple of `grid_size`.
fn nearest_line(value: f64, grid_size: f64) -> f64 {
    (value / grid_size).round() * grid_size
}

/// Normalize an angle in degrees to `[0, 360)`.
fn normalize_degrees(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Shortest distance between two angles on the circle, in degrees.
fn circular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// Snap a point to the nearest grid intersection.
///
/// Rounds rather than truncates, so negative coordinates snap symmetrically.
/// A non-positive or non-finite grid size leaves the point unchanged.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    if !valid_grid_size(grid_size) {
        return point;
    }
    Point::new(
        nearest_line(point.x, grid_size),
        nearest_line(point.y, grid_size),
    )
}

/// Nearest grid intersection to `point`. Same as [`snap_to_grid`].
pub fn get_nearest_grid_intersection(point: Point, grid_size: f64) -> Point {
    snap_to_grid(point, grid_size)
}

/// Snap each axis independently, but only when the point is close to a grid line.
///
/// `threshold` is the largest offset from the nearest line, as a fraction of
/// `grid_size`, that still snaps. It is clamped to `[0, 1]`. Axes further away
/// pass through unchanged, so a point can snap on one axis only.
pub fn snap_with_threshold(point: Point, grid_size: f64, threshold: f64) -> SnapResult {
    if !valid_grid_size(grid_size) {
        return SnapResult::none(point);
    }
    let threshold = if threshold.is_nan() { 0.0 } else { threshold.clamp(0.0, 1.0) };

    let axis = |value: f64| -> (f64, bool) {
        let line = nearest_line(value, grid_size);
        let ratio = (value - line).abs() / grid_size;
        if ratio <= threshold { (line, true) } else { (value, false) }
    };

    let (x, snapped_x) = axis(point.x);
    let (y, snapped_y) = axis(point.y);
    SnapResult {
        point: Point::new(x, y),
        snapped_x,
        snapped_y,
    }
}

/// Perpendicular distance from `point` to the nearest vertical (x) and horizontal (y) grid line.
pub fn distance_to_nearest_grid_line(point: Point, grid_size: f64) -> Vec2 {
    if !valid_grid_size(grid_size) {
        return Vec2::ZERO;
    }
    Vec2::new(
        (point.x - nearest_line(point.x, grid_size)).abs(),
        (point.y - nearest_line(point.y, grid_size)).abs(),
    )
}

/// Snap a line endpoint to the nearest of `angles` (degrees) around `start`.
///
/// The distance from `start` is preserved. Zero-length lines, an empty angle
/// set, and lines already on a target angle come back unchanged.
pub fn snap_line_endpoint(start: Point, end: Point, angles: &[f64]) -> AngleSnapResult {
    let delta = end - start;
    let distance = delta.hypot();
    if distance < MIN_LINE_LENGTH {
        return AngleSnapResult::unchanged(end, 0.0, distance);
    }

    let original = normalize_degrees(delta.y.atan2(delta.x).to_degrees());

    let Some(target) = angles
        .iter()
        .map(|&a| normalize_degrees(a))
        .min_by(|a, b| {
            circular_distance(*a, original).total_cmp(&circular_distance(*b, original))
        })
    else {
        return AngleSnapResult::unchanged(end, original, distance);
    };

    if circular_distance(target, original) < ALIGNED_TOLERANCE_DEGREES {
        return AngleSnapResult::unchanged(end, original, distance);
    }

    let radians = target.to_radians();
    AngleSnapResult {
        point: Point::new(
            start.x + distance * radians.cos(),
            start.y + distance * radians.sin(),
        ),
        angle_degrees: target,
        original_angle_degrees: original,
        snapped: true,
        distance,
    }
}

/// Snap a line endpoint to the nearest standard angle, returning the new endpoint.
pub fn snap_line_to_standard_angles(start: Point, end: Point, angles: &[f64]) -> Point {
    snap_line_endpoint(start, end, angles).point
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: Point, b: Point) -> f64 {
        (b - a).hypot()
    }

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid(Point::new(23.0, 19.0), 10.0), Point::new(20.0, 20.0));
    }

    #[test]
    fn test_snap_to_grid_negative() {
        assert_eq!(
            snap_to_grid(Point::new(-23.0, -19.0), 10.0),
            Point::new(-20.0, -20.0)
        );
    }

    #[test]
    fn test_snap_to_grid_idempotent() {
        let samples = [
            Point::new(0.0, 0.0),
            Point::new(13.7, -42.2),
            Point::new(-0.4, 999.9),
            Point::new(1e6 + 0.3, -1e6 - 0.7),
        ];
        for grid in [1.0, 7.5, 10.0, 20.0, 0.3] {
            for p in samples {
                let once = snap_to_grid(p, grid);
                assert_eq!(snap_to_grid(once, grid), once, "grid {grid} point {p:?}");
            }
        }
    }

    #[test]
    fn test_snap_to_grid_exact() {
        let p = Point::new(40.0, 60.0);
        assert_eq!(snap_to_grid(p, 20.0), p);
    }

    #[test]
    fn test_snap_to_grid_invalid_size() {
        let p = Point::new(3.3, 4.4);
        assert_eq!(snap_to_grid(p, 0.0), p);
        assert_eq!(snap_to_grid(p, -10.0), p);
        assert_eq!(snap_to_grid(p, f64::NAN), p);
    }

    #[test]
    fn test_nearest_intersection_matches_snap() {
        let p = Point::new(31.0, 51.0);
        assert_eq!(get_nearest_grid_intersection(p, 20.0), snap_to_grid(p, 20.0));
    }

    #[test]
    fn test_snap_with_threshold_single_axis() {
        // x is 1 unit (0.1) off a line, y is 4 units (0.4) off.
        let result = snap_with_threshold(Point::new(21.0, 34.0), 10.0, 0.2);
        assert_eq!(result.point, Point::new(20.0, 34.0));
        assert!(result.snapped_x);
        assert!(!result.snapped_y);
        assert!(result.is_snapped());
    }

    #[test]
    fn test_snap_with_threshold_bounds() {
        let p = Point::new(21.0, 34.0);
        assert!(!snap_with_threshold(p, 10.0, 0.0).is_snapped());
        let full = snap_with_threshold(p, 10.0, 1.0);
        assert_eq!(full.point, snap_to_grid(p, 10.0));
        // Out-of-range thresholds are clamped.
        assert_eq!(snap_with_threshold(p, 10.0, 5.0).point, full.point);
    }

    #[test]
    fn test_distance_to_nearest_grid_line() {
        let d = distance_to_nearest_grid_line(Point::new(23.0, -19.0), 10.0);
        assert!((d.x - 3.0).abs() < 1e-9);
        assert!((d.y - 1.0).abs() < 1e-9);

        let on_line = distance_to_nearest_grid_line(Point::new(40.0, 60.0), 20.0);
        assert_eq!(on_line, Vec2::ZERO);
    }

    #[test]
    fn test_snap_mode_cycle() {
        assert_eq!(SnapMode::None.next(), SnapMode::Grid);
        assert_eq!(SnapMode::Grid.next(), SnapMode::Angle);
        assert_eq!(SnapMode::Angle.next(), SnapMode::All);
        assert_eq!(SnapMode::All.next(), SnapMode::None);
    }

    #[test]
    fn test_snap_mode_flags() {
        assert!(!SnapMode::None.is_enabled());
        assert!(SnapMode::Grid.snaps_to_grid());
        assert!(!SnapMode::Grid.snaps_to_angles());
        assert!(SnapMode::Angle.snaps_to_angles());
        assert!(SnapMode::All.snaps_to_grid() && SnapMode::All.snaps_to_angles());
    }

    #[test]
    fn test_angle_snap_near_horizontal() {
        let start = Point::new(100.0, 100.0);
        let end = Point::new(200.0, 105.0);
        let result = snap_line_to_standard_angles(start, end, &STANDARD_ANGLES);

        assert!((result.y - 100.0).abs() < 1e-9);
        // Length is kept, so x lands just past 200.
        assert!((result.x - 200.0).abs() < 0.2);
        assert!((distance(start, result) - distance(start, end)).abs() < 1e-3);
    }

    #[test]
    fn test_angle_snap_preserves_distance() {
        let start = Point::new(-12.5, 40.0);
        for (dx, dy) in [(100.0, 10.0), (3.0, 97.0), (-50.0, 44.0), (-7.0, -80.0), (60.0, -61.0)] {
            let end = Point::new(start.x + dx, start.y + dy);
            let result = snap_line_endpoint(start, end, &STANDARD_ANGLES);
            assert!(result.snapped);
            assert!((distance(start, result.point) - distance(start, end)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_angle_snap_45_degrees() {
        let result = snap_line_endpoint(Point::ZERO, Point::new(100.0, 102.0), &STANDARD_ANGLES);
        assert!((result.angle_degrees - 45.0).abs() < 1e-9);
        assert!((result.point.x - result.point.y).abs() < 1e-9);
    }

    #[test]
    fn test_angle_snap_wraparound() {
        // 359 degrees is 1 degree away from 0, not 44 away from 315.
        let radians = 359.0_f64.to_radians();
        let end = Point::new(100.0 * radians.cos(), 100.0 * radians.sin());
        let result = snap_line_endpoint(Point::ZERO, end, &STANDARD_ANGLES);
        assert_eq!(result.angle_degrees, 0.0);
        assert!(result.point.y.abs() < 1e-9);

        let coarse = snap_line_endpoint(Point::ZERO, end, &[90.0, 180.0, 270.0, 360.0]);
        assert_eq!(coarse.angle_degrees, 0.0);
    }

    #[test]
    fn test_angle_snap_aligned_unchanged() {
        let start = Point::new(10.0, 10.0);
        let end = Point::new(10.0, 90.0);
        let result = snap_line_endpoint(start, end, &STANDARD_ANGLES);
        assert!(!result.snapped);
        assert_eq!(result.point, end);
    }

    #[test]
    fn test_angle_snap_degenerate() {
        let p = Point::new(5.0, 5.0);
        assert_eq!(snap_line_to_standard_angles(p, p, &STANDARD_ANGLES), p);

        let end = Point::new(30.0, 7.0);
        assert_eq!(snap_line_to_standard_angles(p, end, &[]), end);
    }
}
