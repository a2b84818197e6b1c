//! Path simplification, smoothing, and pressure-to-width mapping for strokes.

use kurbo::{CubicBez, ParamCurve, Point};

/// Deviations below this are treated as collinear regardless of epsilon.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Calculate perpendicular distance from point to line.
pub fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;

    let line_len_sq = dx * dx + dy * dy;
    if line_len_sq < f64::EPSILON {
        // Line is a point
        return (point - line_start).hypot();
    }

    // Area of triangle * 2 / base = height
    let area2 = ((point.x - line_start.x) * dy - (point.y - line_start.y) * dx).abs();
    area2 / line_len_sq.sqrt()
}

/// Ramer-Douglas-Peucker line simplification.
///
/// Paths of two points or fewer are returned unchanged. Endpoints are
/// always kept.
pub fn simplify_path(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let epsilon = if epsilon.is_nan() { 0.0 } else { epsilon.max(COLLINEAR_TOLERANCE) };
    rdp(points, epsilon)
}

fn rdp(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];

    // Find point with maximum distance from line between first and last
    let mut max_dist = 0.0;
    let mut max_index = 0;
    for (i, point) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let dist = perpendicular_distance(*point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > epsilon {
        let mut left = rdp(&points[..=max_index], epsilon);
        let right = rdp(&points[max_index..], epsilon);

        // Combine, removing duplicate point at junction
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

/// Symmetric moving average over interior points.
///
/// Near the ends the window shrinks so it stays centered; the first and last
/// points are never moved.
pub fn smooth_path(points: &[Point], window_size: usize) -> Vec<Point> {
    let half = window_size / 2;
    if points.len() <= 2 || half == 0 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut smoothed = Vec::with_capacity(points.len());
    smoothed.push(points[0]);
    for i in 1..last {
        let reach = half.min(i).min(last - i);
        let window = &points[i - reach..=i + reach];
        let (sx, sy) = window
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        let n = window.len() as f64;
        smoothed.push(Point::new(sx / n, sy / n));
    }
    smoothed.push(points[last]);
    smoothed
}

/// Resample a polyline as a chain of cubic Bézier segments.
///
/// Control points are derived from each point's neighbours scaled by
/// `tension` (0.5 gives a Catmull-Rom curve). Every original point appears
/// exactly in the output, followed by `num_segments` samples per segment.
pub fn smooth_points_with_bezier(points: &[Point], tension: f64, num_segments: usize) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let segments = num_segments.max(1);
    let factor = tension / 3.0;
    let last = points.len() - 1;

    let mut out = Vec::with_capacity(last * segments + 1);
    out.push(points[0]);
    for i in 0..last {
        let p0 = points[i];
        let p1 = points[i + 1];
        let before = points[i.saturating_sub(1)];
        let after = points[(i + 2).min(last)];

        let c0 = p0 + (p1 - before) * factor;
        let c1 = p1 - (after - p0) * factor;
        let curve = CubicBez::new(p0, c0, c1, p1);

        for s in 1..=segments {
            if s == segments {
                out.push(p1);
            } else {
                out.push(curve.eval(s as f64 / segments as f64));
            }
        }
    }
    out
}

/// Stroke width for a pen pressure.
///
/// Pressure is clamped to `[0, 1]` and squared before interpolating between
/// `base_width * min_ratio` and `base_width * max_ratio`.
pub fn get_pressure_adjusted_width(pressure: f64, base_width: f64, min_ratio: f64, max_ratio: f64) -> f64 {
    let pressure = if pressure.is_nan() { 0.0 } else { pressure.clamp(0.0, 1.0) };
    let response = pressure * pressure;
    let min_width = base_width * min_ratio;
    let max_width = base_width * max_ratio;
    min_width + (max_width - min_width) * response
}
