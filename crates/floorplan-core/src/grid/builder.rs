//! Builds grid line objects for a viewport and checks they landed in the scene.

use super::GridError;
use crate::config::GridConfig;
use crate::scene::{GridLine, ObjectId, ObjectTag, Scene, SceneObject};
use kurbo::{Point, Rect};

/// Default cap on the number of lines in one grid.
pub const DEFAULT_MAX_LINES: usize = 2000;

/// Largest line index that still maps exactly onto an `f64` coordinate.
const MAX_LINE_INDEX: f64 = 9_007_199_254_740_992.0;

/// Produces the grid line objects that cover a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBuilder {
    pub grid_size: f64,
    /// Every Nth line is major. Zero disables major lines.
    pub major_every: u32,
    /// Upper bound on lines per build. Zoomed-out viewports get a coarser step.
    pub max_lines: usize,
}

impl GridBuilder {
    pub fn new(grid_size: f64, major_every: u32) -> Self {
        Self {
            grid_size,
            major_every,
            max_lines: DEFAULT_MAX_LINES,
        }
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.grid_size, config.major_every).with_max_lines(config.max_lines)
    }

    /// Grid bounds covering `viewport`, expanded outwards to whole steps,
    /// as inclusive line indices `(x0, y0, x1, y1)`.
    fn line_range(viewport: Rect, step: f64) -> (f64, f64, f64, f64) {
        (
            (viewport.x0 / step).floor(),
            (viewport.y0 / step).floor(),
            (viewport.x1 / step).ceil(),
            (viewport.y1 / step).ceil(),
        )
    }

    fn line_count(viewport: Rect, step: f64) -> f64 {
        let (x0, y0, x1, y1) = Self::line_range(viewport, step);
        (x1 - x0 + 1.0) + (y1 - y0 + 1.0)
    }

    /// Cells per line step, growing by `major_every` (or 2) until the grid
    /// fits in `max_lines`.
    fn cells_per_step(&self, viewport: Rect) -> u64 {
        let base = u64::from(self.major_every.max(2));
        let max_lines = self.max_lines.max(4) as f64;
        let mut cells: u64 = 1;
        while Self::line_count(viewport, self.grid_size * cells as f64) > max_lines {
            match cells.checked_mul(base) {
                Some(next) => cells = next,
                None => break,
            }
        }
        cells
    }

    fn is_major(&self, cell: i128) -> bool {
        self.major_every > 0 && cell.rem_euclid(i128::from(self.major_every)) == 0
    }

    /// Build vertical then horizontal lines covering `viewport` (world coordinates).
    pub fn build(&self, viewport: Rect) -> Result<Vec<SceneObject>, GridError> {
        if !self.grid_size.is_finite() || self.grid_size <= 0.0 {
            return Err(GridError::InvalidGridSize(self.grid_size));
        }
        if !viewport.is_finite() {
            return Err(GridError::InvalidViewport);
        }
        let viewport = viewport.abs();
        if !(viewport.width() > 0.0 && viewport.height() > 0.0) {
            return Err(GridError::EmptyViewport);
        }

        let cells = self.cells_per_step(viewport);
        let step = self.grid_size * cells as f64;
        let (fx0, fy0, fx1, fy1) = Self::line_range(viewport, step);
        let lines = Self::line_count(viewport, step);
        if [fx0, fy0, fx1, fy1].iter().any(|v| v.abs() > MAX_LINE_INDEX) || lines > self.max_lines.max(4) as f64 {
            return Err(GridError::InvalidViewport);
        }
        if cells > 1 {
            log::debug!("Grid coarsened to {} cells per line for {:?}", cells, viewport);
        }

        let (ix0, iy0, ix1, iy1) = (fx0 as i64, fy0 as i64, fx1 as i64, fy1 as i64);
        let (start_x, end_x) = (fx0 * step, fx1 * step);
        let (start_y, end_y) = (fy0 * step, fy1 * step);
        let major = |i: i64| self.is_major(i128::from(i) * i128::from(cells));

        let mut objects = Vec::with_capacity(lines as usize);

        // Vertical lines
        for i in ix0..=ix1 {
            let x = i as f64 * step;
            objects.push(SceneObject::grid_line(GridLine {
                start: Point::new(x, start_y),
                end: Point::new(x, end_y),
                major: major(i),
            }));
        }

        // Horizontal lines
        for j in iy0..=iy1 {
            let y = j as f64 * step;
            objects.push(SceneObject::grid_line(GridLine {
                start: Point::new(start_x, y),
                end: Point::new(end_x, y),
                major: major(j),
            }));
        }

        Ok(objects)
    }
}

/// Remove every grid object from the scene. Returns how many were removed.
pub fn remove_grid(scene: &mut impl Scene) -> usize {
    let ids: Vec<ObjectId> = scene.grid_objects().map(|o| o.id).collect();
    ids.into_iter()
        .filter(|id| scene.remove(*id).is_some())
        .count()
}

/// Number of `created` ids that are attached to the scene as grid objects.
pub fn count_attached(scene: &impl Scene, created: &[ObjectId]) -> usize {
    created
        .iter()
        .filter(|id| scene.get(**id).is_some_and(|o| o.tag() == ObjectTag::Grid))
        .count()
}

/// True only if every created grid object is actually attached to the scene.
///
/// Guards against the renderer silently dropping objects. An empty creation
/// never verifies.
pub fn verify_creation(scene: &impl Scene, created: &[ObjectId]) -> bool {
    !created.is_empty() && count_attached(scene, created) == created.len()
}
