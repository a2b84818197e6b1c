//! Pure geometry for turning raw pointer input into drawable geometry.
//!
//! Nothing in here holds state or fails: degenerate input (zero-length
//! lines, single-point paths, non-positive grid sizes) comes back unchanged.

pub mod path;
pub mod snap;

pub use path::{
    get_pressure_adjusted_width, perpendicular_distance, simplify_path, smooth_path,
    smooth_points_with_bezier,
};
pub use snap::{
    AngleSnapResult, GRID_SIZE, STANDARD_ANGLES, SnapMode, SnapResult,
    distance_to_nearest_grid_line, get_nearest_grid_intersection, snap_line_endpoint,
    snap_line_to_standard_angles, snap_to_grid, snap_with_threshold,
};
