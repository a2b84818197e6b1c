//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document only overrides what
//! it names. Durations are stored as integer milliseconds.

use crate::geometry::{GRID_SIZE, SnapMode};
pub use crate::grid::GridLimits;
use crate::grid::builder::DEFAULT_MAX_LINES;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use web_time::Duration;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

/// Background grid appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub grid_size: f64,
    /// Every Nth grid line is drawn as a major line.
    pub major_every: u32,
    /// Delay before retrying a failed creation.
    pub retry_delay_ms: u64,
    /// Upper bound on lines per grid; larger viewports get a coarser step.
    pub max_lines: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            major_every: 5,
            retry_delay_ms: 1000,
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl GridConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 50 }
    }
}

/// Health check cadence and escalation points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Minimum spacing between grid health checks.
    pub check_interval_ms: u64,
    /// Consecutive failures at which a warning is logged.
    pub warn_after: u32,
    /// Consecutive failures at which an error is reported.
    pub report_after: u32,
    /// Recovery attempts at which a warning is reported.
    pub recovery_warn_at: u32,
    /// Recovery attempts at which a critical report is made.
    pub recovery_critical_at: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 1000,
            warn_after: 1,
            report_after: 3,
            recovery_warn_at: 3,
            recovery_critical_at: 10,
        }
    }
}

impl HealthConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    pub mode: SnapMode,
    /// Freehand points snap per axis when within this fraction of a cell.
    pub threshold: f64,
    /// Angles (degrees) walls snap to.
    pub angles: Vec<f64>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            mode: SnapMode::default(),
            threshold: 0.25,
            angles: crate::geometry::STANDARD_ANGLES.to_vec(),
        }
    }
}

/// Freehand stroke processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    pub simplify_epsilon: f64,
    pub smoothing_window: usize,
    pub bezier_tension: f64,
    pub bezier_segments: usize,
    pub base_width: f64,
    pub min_width_ratio: f64,
    pub max_width_ratio: f64,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            simplify_epsilon: 1.0,
            smoothing_window: 3,
            bezier_tension: 0.5,
            bezier_segments: 8,
            base_width: 2.0,
            min_width_ratio: 0.5,
            max_width_ratio: 1.5,
        }
    }
}

/// Configuration for one canvas session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub limits: GridLimits,
    pub history: HistoryConfig,
    pub health: HealthConfig,
    pub snap: SnapConfig,
    pub stroke: StrokeConfig,
}

impl EngineConfig {
    /// Serialize the config to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a config from JSON, filling gaps with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
