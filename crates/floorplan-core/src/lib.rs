//! Floorplan Core Library
//!
//! Platform-agnostic canvas consistency engine for the floor plan editor:
//! background grid lifecycle, snapping and path geometry, undo/redo history
//! and grid health monitoring.

pub mod config;
pub mod geometry;
pub mod grid;
pub mod health;
pub mod history;
pub mod scene;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod tools;

pub use config::EngineConfig;
pub use geometry::{GRID_SIZE, SnapMode, SnapResult, snap_line_to_standard_angles, snap_to_grid, snap_with_threshold};
pub use grid::{CreationOutcome, GridBuilder, GridCreationState, GridError, GridLifecycle, GridPhase, SkipReason};
pub use health::{GridHealthStatus, HealthMonitor, HealthReport, HealthReporter, LogReporter, Severity};
pub use history::{HistoryEntry, HistoryStack, HistoryStore};
pub use scene::{MemoryScene, ObjectId, ObjectKind, ObjectTag, Scene, SceneObject, SceneSnapshot, Stroke};
pub use scheduler::{Scheduler, TaskId};
pub use session::{CanvasSession, SessionTask};
pub use storage::{MemoryStorage, Storage, StorageError, StorageResult};
pub use tools::{PointerSample, StrokeBuilder, ToolKind};
