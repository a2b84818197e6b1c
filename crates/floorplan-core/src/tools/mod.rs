//! Drawing tools: turns pointer samples into strokes.

use crate::config::EngineConfig;
use crate::geometry::{
    get_pressure_adjusted_width, simplify_path, smooth_path, smooth_points_with_bezier, snap_line_to_standard_angles,
    snap_to_grid, snap_with_threshold,
};
use crate::scene::{Stroke, StrokeKind};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Pressure assumed when the input device reports none.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Wall,
    Freehand,
}

impl ToolKind {
    /// Whether this tool produces drawings.
    pub fn draws(self) -> bool {
        matches!(self, ToolKind::Wall | ToolKind::Freehand)
    }
}

/// One normalized pointer event in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub position: Point,
    pub pressure: Option<f64>,
}

impl PointerSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            pressure: None,
        }
    }

    pub fn with_pressure(x: f64, y: f64, pressure: f64) -> Self {
        Self {
            position: Point::new(x, y),
            pressure: Some(pressure),
        }
    }

    fn pressure_or_default(&self) -> f64 {
        self.pressure.filter(|p| p.is_finite()).unwrap_or(DEFAULT_PRESSURE)
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Active {
        tool: ToolKind,
        samples: Vec<PointerSample>,
    },
}

/// Accumulates pointer samples for one interaction and builds the stroke.
#[derive(Debug, Clone, Default)]
pub struct StrokeBuilder {
    state: ToolState,
}

impl StrokeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// Start an interaction, discarding any unfinished one.
    pub fn begin(&mut self, tool: ToolKind, sample: PointerSample) {
        self.state = ToolState::Active {
            tool,
            samples: vec![sample],
        };
    }

    /// Add a sample to the current interaction. Ignored when idle.
    pub fn push(&mut self, sample: PointerSample) {
        if let ToolState::Active { samples, .. } = &mut self.state {
            samples.push(sample);
        }
    }

    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    /// End the interaction and build its stroke.
    ///
    /// Returns `None` for non-drawing tools and for input with fewer than two
    /// distinct points. Samples with non-finite coordinates are ignored.
    pub fn finish(&mut self, config: &EngineConfig) -> Option<Stroke> {
        let ToolState::Active { tool, samples } = std::mem::take(&mut self.state) else {
            return None;
        };
        match tool {
            ToolKind::Wall => build_wall(&samples, config),
            ToolKind::Freehand => build_freehand(&samples, config),
            ToolKind::Select | ToolKind::Pan => None,
        }
    }
}

/// Straight wall from the first to the last sample.
fn build_wall(samples: &[PointerSample], config: &EngineConfig) -> Option<Stroke> {
    let mut finite = samples.iter().filter(|s| s.position.is_finite());
    let first = finite.next()?;
    let last = finite.last().unwrap_or(first);
    let mode = config.snap.mode;
    let grid_size = config.grid.grid_size;

    let mut start = first.position;
    let mut end = last.position;
    if mode.snaps_to_grid() {
        start = snap_to_grid(start, grid_size);
    }
    if mode.snaps_to_angles() {
        end = snap_line_to_standard_angles(start, end, &config.snap.angles);
    }
    if mode.snaps_to_grid() {
        end = snap_to_grid(end, grid_size);
    }
    if start == end {
        return None;
    }

    let s = &config.stroke;
    let width = |sample: &PointerSample| {
        get_pressure_adjusted_width(sample.pressure_or_default(), s.base_width, s.min_width_ratio, s.max_width_ratio)
    };
    Some(Stroke::new(
        StrokeKind::Wall,
        vec![start, end],
        vec![width(first), width(last)],
    ))
}

/// Freehand path: snap, simplify, smooth, then resample as Bézier curves.
fn build_freehand(samples: &[PointerSample], config: &EngineConfig) -> Option<Stroke> {
    let mut points: Vec<Point> = Vec::with_capacity(samples.len());
    let mut pressures: Vec<f64> = Vec::with_capacity(samples.len());
    for sample in samples.iter().filter(|s| s.position.is_finite()) {
        let point = if config.snap.mode.snaps_to_grid() {
            snap_with_threshold(sample.position, config.grid.grid_size, config.snap.threshold).point
        } else {
            sample.position
        };
        if points.last() == Some(&point) {
            continue;
        }
        points.push(point);
        pressures.push(sample.pressure_or_default());
    }
    if points.len() < 2 {
        return None;
    }

    let s = &config.stroke;
    let simplified = simplify_path(&points, s.simplify_epsilon);
    let smoothed = smooth_path(&simplified, s.smoothing_window);
    let curve = smooth_points_with_bezier(&smoothed, s.bezier_tension, s.bezier_segments);

    let widths = curve
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let pressure = pressures[sample_index(i, curve.len(), pressures.len())];
            get_pressure_adjusted_width(pressure, s.base_width, s.min_width_ratio, s.max_width_ratio)
        })
        .collect();

    Some(Stroke::new(StrokeKind::Freehand, curve, widths))
}

/// Map output index `i` of `out_len` onto the proportional input sample.
fn sample_index(i: usize, out_len: usize, in_len: usize) -> usize {
    if out_len <= 1 || in_len <= 1 {
        return 0;
    }
    let t = i as f64 / (out_len - 1) as f64;
    ((t * (in_len - 1) as f64).round() as usize).min(in_len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SnapMode;

    fn config(mode: SnapMode) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.snap.mode = mode;
        config
    }

    fn draw(tool: ToolKind, samples: &[PointerSample], config: &EngineConfig) -> Option<Stroke> {
        let mut builder = StrokeBuilder::new();
        builder.begin(tool, samples[0]);
        for sample in &samples[1..] {
            builder.push(*sample);
        }
        builder.finish(config)
    }

    #[test]
    fn test_begin_push_finish() {
        let mut builder = StrokeBuilder::new();
        assert!(!builder.is_active());
        builder.push(PointerSample::new(1.0, 1.0));
        assert!(!builder.is_active());

        builder.begin(ToolKind::Wall, PointerSample::new(0.0, 0.0));
        assert!(builder.is_active());
        builder.push(PointerSample::new(100.0, 0.0));
        assert!(builder.finish(&EngineConfig::default()).is_some());
        assert!(!builder.is_active());
        assert!(builder.finish(&EngineConfig::default()).is_none());
    }

    #[test]
    fn test_cancel() {
        let mut builder = StrokeBuilder::new();
        builder.begin(ToolKind::Freehand, PointerSample::new(0.0, 0.0));
        builder.cancel();
        assert!(!builder.is_active());
        assert!(builder.finish(&EngineConfig::default()).is_none());
    }

    #[test]
    fn test_non_drawing_tools() {
        let samples = [PointerSample::new(0.0, 0.0), PointerSample::new(100.0, 100.0)];
        assert!(draw(ToolKind::Select, &samples, &EngineConfig::default()).is_none());
        assert!(draw(ToolKind::Pan, &samples, &EngineConfig::default()).is_none());
        assert!(!ToolKind::Pan.draws());
        assert!(ToolKind::Wall.draws());
    }

    #[test]
    fn test_wall_snaps_angle_then_grid() {
        let samples = [PointerSample::new(100.0, 100.0), PointerSample::new(200.0, 105.0)];
        let stroke = draw(ToolKind::Wall, &samples, &config(SnapMode::All)).unwrap();
        assert_eq!(stroke.kind, StrokeKind::Wall);
        assert_eq!(stroke.points, vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0)]);
        assert_eq!(stroke.widths.len(), 2);
    }

    #[test]
    fn test_wall_angle_only_preserves_length() {
        let samples = [PointerSample::new(100.0, 100.0), PointerSample::new(200.0, 105.0)];
        let stroke = draw(ToolKind::Wall, &samples, &config(SnapMode::Angle)).unwrap();
        let end = stroke.points[1];
        assert!((end.y - 100.0).abs() < 1e-9);
        let raw = Point::new(100.0, 100.0).distance(Point::new(200.0, 105.0));
        assert!((stroke.points[0].distance(end) - raw).abs() < 1e-3);
    }

    #[test]
    fn test_wall_unsnapped() {
        let samples = [PointerSample::new(3.0, 4.0), PointerSample::new(97.0, 13.0)];
        let stroke = draw(ToolKind::Wall, &samples, &config(SnapMode::None)).unwrap();
        assert_eq!(stroke.points, vec![Point::new(3.0, 4.0), Point::new(97.0, 13.0)]);
    }

    #[test]
    fn test_degenerate_wall() {
        let samples = [PointerSample::new(101.0, 99.0), PointerSample::new(102.0, 101.0)];
        assert!(draw(ToolKind::Wall, &samples, &config(SnapMode::All)).is_none());
        let single = [PointerSample::new(5.0, 5.0)];
        assert!(draw(ToolKind::Wall, &single, &config(SnapMode::None)).is_none());
    }

    #[test]
    fn test_freehand_pipeline() {
        let samples = [
            PointerSample::new(0.0, 0.0),
            PointerSample::new(50.0, 0.0),
            PointerSample::new(50.0, 50.0),
        ];
        let stroke = draw(ToolKind::Freehand, &samples, &config(SnapMode::None)).unwrap();
        assert_eq!(stroke.kind, StrokeKind::Freehand);
        assert_eq!(stroke.points.len(), 2 * 8 + 1);
        assert_eq!(stroke.points.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(stroke.points.last(), Some(&Point::new(50.0, 50.0)));
        assert_eq!(stroke.widths.len(), stroke.points.len());
        // Missing pressure uses 0.5: 1.0 + (3.0 - 1.0) * 0.25
        assert!(stroke.widths.iter().all(|w| (w - 1.5).abs() < 1e-12));
    }

    #[test]
    fn test_freehand_collinear_collapses() {
        let samples: Vec<PointerSample> = (0..10).map(|i| PointerSample::new(i as f64 * 10.0, 0.0)).collect();
        let stroke = draw(ToolKind::Freehand, &samples, &config(SnapMode::None)).unwrap();
        assert_eq!(stroke.points, vec![Point::new(0.0, 0.0), Point::new(90.0, 0.0)]);
    }

    #[test]
    fn test_freehand_pressure_widths() {
        let samples = [
            PointerSample::with_pressure(0.0, 0.0, 0.0),
            PointerSample::with_pressure(100.0, 0.0, 1.0),
        ];
        let stroke = draw(ToolKind::Freehand, &samples, &config(SnapMode::None)).unwrap();
        assert_eq!(stroke.widths, vec![1.0, 3.0]);
    }

    #[test]
    fn test_non_finite_samples_ignored() {
        let samples = [
            PointerSample::new(0.0, 0.0),
            PointerSample::new(f64::NAN, 10.0),
            PointerSample::with_pressure(100.0, 0.0, f64::NAN),
            PointerSample::new(f64::INFINITY, 0.0),
        ];
        let wall = draw(ToolKind::Wall, &samples, &config(SnapMode::None)).unwrap();
        assert_eq!(wall.points, vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        assert!(wall.is_finite());

        let freehand = draw(ToolKind::Freehand, &samples, &config(SnapMode::None)).unwrap();
        assert!(freehand.is_finite());
        assert_eq!(freehand.points.last(), Some(&Point::new(100.0, 0.0)));

        let only_nan = [PointerSample::new(f64::NAN, f64::NAN), PointerSample::new(f64::NAN, 1.0)];
        assert!(draw(ToolKind::Wall, &only_nan, &config(SnapMode::All)).is_none());
        assert!(draw(ToolKind::Freehand, &only_nan, &config(SnapMode::All)).is_none());
    }

    #[test]
    fn test_freehand_needs_two_distinct_points() {
        let samples = [PointerSample::new(7.0, 7.0), PointerSample::new(7.0, 7.0)];
        assert!(draw(ToolKind::Freehand, &samples, &config(SnapMode::None)).is_none());

        // Both samples snap onto the same grid intersection.
        let samples = [PointerSample::new(40.5, 39.5), PointerSample::new(39.5, 40.5)];
        assert!(draw(ToolKind::Freehand, &samples, &config(SnapMode::Grid)).is_none());
    }
}
