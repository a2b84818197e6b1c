//! One canvas editing session.
//!
//! [`CanvasSession`] owns the scene and every piece of engine state for it.
//! Canvas events (resize, zoom, tool switch) only queue work; the host calls
//! [`CanvasSession::tick`] from its event loop or a timer to run whatever is
//! due. Dropping or tearing down the session leaves no timers behind because
//! there are none: pending work lives in the session's scheduler.

use crate::config::EngineConfig;
use crate::grid::{CreationOutcome, GridBuilder, GridLifecycle, SkipReason};
use crate::health::{HealthMonitor, HealthReporter, LogReporter};
use crate::history::{HistoryEntry, HistoryStack, HistoryStore};
use crate::scene::{ObjectId, Scene, SceneObject, SceneSnapshot, Stroke};
use crate::scheduler::Scheduler;
use crate::storage::{Storage, StorageError, StorageResult};
use crate::tools::{PointerSample, StrokeBuilder, ToolKind};
use kurbo::Rect;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Deferred work queued by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTask {
    /// Build or rebuild the grid for the current viewport.
    CreateGrid,
    /// Try again after a failed creation.
    RetryGrid,
    /// Audit the grid and start recovery if it is gone.
    HealthCheck,
}

pub struct CanvasSession<S: Scene> {
    scene: S,
    config: EngineConfig,
    grid: GridLifecycle,
    health: HealthMonitor,
    history: HistoryStack,
    scheduler: Scheduler<SessionTask>,
    strokes: StrokeBuilder,
    viewport: Rect,
    tool: ToolKind,
    initialized: bool,
}

impl<S: Scene> CanvasSession<S> {
    /// Session whose health reports go to the `log` facade.
    pub fn new(scene: S, viewport: Rect, config: EngineConfig) -> Self {
        Self::with_reporter(scene, viewport, config, Box::new(LogReporter))
    }

    pub fn with_reporter(
        scene: S,
        viewport: Rect,
        config: EngineConfig,
        reporter: Box<dyn HealthReporter>,
    ) -> Self {
        Self {
            grid: GridLifecycle::new(GridBuilder::from_config(&config.grid), config.limits),
            health: HealthMonitor::new(config.health, reporter),
            history: HistoryStack::new(config.history.max_entries),
            scheduler: Scheduler::new(),
            strokes: StrokeBuilder::new(),
            viewport,
            tool: ToolKind::default(),
            initialized: false,
            scene,
            config,
        }
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Direct scene access for external collaborators. Changes made here are
    /// not recorded in history.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridLifecycle {
        &self.grid
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn scheduler(&self) -> &Scheduler<SessionTask> {
        &self.scheduler
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Record the baseline history state and queue the first grid build and
    /// health check.
    pub fn initialize(&mut self, now: Instant) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.history.clear();
        self.save_snapshot();
        self.request_grid(now);
        self.scheduler
            .schedule_after(now, self.config.health.check_interval(), SessionTask::HealthCheck);
        log::info!("Canvas session initialized for viewport {:?}", self.viewport);
    }

    pub fn resize(&mut self, viewport: Rect, now: Instant) {
        self.viewport = viewport;
        self.request_grid(now);
    }

    pub fn zoom(&mut self, viewport: Rect, now: Instant) {
        self.viewport = viewport;
        self.request_grid(now);
    }

    /// Switch tools. An unfinished stroke is dropped.
    pub fn switch_tool(&mut self, tool: ToolKind, now: Instant) {
        self.strokes.cancel();
        self.tool = tool;
        self.request_grid(now);
    }

    /// Queue a grid build unless one is already pending.
    fn request_grid(&mut self, now: Instant) {
        if !self.scheduler.any_pending(|t| *t == SessionTask::CreateGrid) {
            self.scheduler.schedule_at(now, SessionTask::CreateGrid);
        }
    }

    /// Run every task due at `now`. Returns how many ran.
    ///
    /// Tasks queued while running become due on the next tick.
    pub fn tick(&mut self, now: Instant) -> usize {
        let due = self.scheduler.poll_due(now);
        let count = due.len();
        for task in due {
            match task {
                SessionTask::CreateGrid | SessionTask::RetryGrid => {
                    self.run_grid_creation(now);
                }
                SessionTask::HealthCheck => self.run_health_check(now),
            }
        }
        count
    }

    fn run_grid_creation(&mut self, now: Instant) -> CreationOutcome {
        let outcome = self.grid.ensure_grid(&mut self.scene, self.viewport, now);
        match &outcome {
            CreationOutcome::Skipped(SkipReason::Throttled) => {
                let pending = self.scheduler.any_pending(|t| *t == SessionTask::CreateGrid);
                if let (Some(at), false) = (self.grid.state().next_allowed_at(), pending) {
                    self.scheduler.schedule_at(at, SessionTask::CreateGrid);
                }
            }
            CreationOutcome::Failed(_) if !self.grid.state().is_exhausted() => {
                if !self.scheduler.any_pending(|t| *t == SessionTask::RetryGrid) {
                    self.scheduler
                        .schedule_after(now, self.config.grid.retry_delay(), SessionTask::RetryGrid);
                }
            }
            _ => {}
        }
        outcome
    }

    fn run_health_check(&mut self, now: Instant) {
        let healthy = self
            .health
            .check_grid_health(&self.scene, now)
            .is_none_or(|status| status.is_healthy());

        if !healthy && !self.grid.state().in_progress() {
            self.grid.mark_missing();
            let attempts = self.health.register_grid_recovery_attempt();
            log::debug!("Grid recovery attempt {}", attempts);
            self.request_grid(now);
        }

        self.scheduler
            .schedule_after(now, self.config.health.check_interval(), SessionTask::HealthCheck);
    }

    /// User-triggered retry: clear the failure streak and build right away.
    pub fn retry_grid(&mut self, now: Instant) -> CreationOutcome {
        self.grid.reset();
        self.health.reset();
        self.run_grid_creation(now)
    }

    pub fn pointer_down(&mut self, sample: PointerSample) {
        if self.tool.draws() {
            self.strokes.begin(self.tool, sample);
        }
    }

    pub fn pointer_move(&mut self, sample: PointerSample) {
        self.strokes.push(sample);
    }

    /// Finish the current stroke and commit it. Returns the new drawing's id.
    pub fn pointer_up(&mut self, sample: PointerSample) -> Option<ObjectId> {
        if !self.strokes.is_active() {
            return None;
        }
        self.strokes.push(sample);
        let stroke = self.strokes.finish(&self.config)?;
        self.commit_stroke(stroke)
    }

    /// Add a drawing and record the new state.
    ///
    /// Strokes with non-finite coordinates or widths are rejected, since their
    /// snapshot could not be restored.
    pub fn commit_stroke(&mut self, stroke: Stroke) -> Option<ObjectId> {
        if !stroke.is_finite() {
            log::warn!("Rejected stroke with non-finite geometry");
            return None;
        }
        let id = self.scene.add(SceneObject::drawing(stroke));
        self.scene.request_repaint();
        self.save_snapshot();
        Some(id)
    }

    /// Remove a drawing and record the new state. Grid objects cannot be erased.
    pub fn erase(&mut self, id: ObjectId) -> bool {
        if self.scene.get(id).is_none_or(|o| o.is_grid()) {
            return false;
        }
        self.scene.remove(id);
        self.scene.request_repaint();
        self.save_snapshot();
        true
    }

    /// Snapshot the scene after a mutation.
    fn save_snapshot(&mut self) {
        match SceneSnapshot::capture(&self.scene).to_json() {
            Ok(json) => self.history.save_state(json),
            Err(e) => log::error!("Failed to serialize scene snapshot: {}", e),
        }
    }

    fn parse_snapshot(entry: Option<&HistoryEntry>) -> Option<SceneSnapshot> {
        let entry = entry?;
        match SceneSnapshot::from_json(&entry.snapshot) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::error!("Unreadable history snapshot, history left unchanged: {}", e);
                None
            }
        }
    }

    /// Step back one state. The history only moves once the target snapshot
    /// has been read, so a corrupt entry leaves scene and history in step.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = Self::parse_snapshot(self.history.peek_undo()) else {
            return false;
        };
        self.history.undo();
        snapshot.restore(&mut self.scene);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = Self::parse_snapshot(self.history.peek_redo()) else {
            return false;
        };
        self.history.redo();
        snapshot.restore(&mut self.scene);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Persist the undo history under `key`.
    pub async fn persist_history<St: Storage>(&self, store: &HistoryStore<St>, key: &str) -> StorageResult<()> {
        let entries: Vec<_> = self.history.past().iter().cloned().collect();
        store
            .save(key, &entries, self.config.history.max_entries)
            .await
    }

    /// Replace the history with the one saved under `key` and restore its
    /// present state into the scene. Returns false if nothing was saved.
    ///
    /// If the saved present state cannot be read, the current history and
    /// scene are kept and a serialization error is returned.
    pub async fn restore_history<St: Storage>(&mut self, store: &HistoryStore<St>, key: &str) -> StorageResult<bool> {
        let Some(entries) = store.load(key).await? else {
            return Ok(false);
        };
        let history = HistoryStack::from_entries(entries, self.config.history.max_entries);
        let current = history
            .current()
            .map(|entry| SceneSnapshot::from_json(&entry.snapshot))
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.history = history;
        if let Some(snapshot) = current {
            snapshot.restore(&mut self.scene);
        }
        log::info!("Restored {} history entries from {}", self.history.past().len(), key);
        Ok(true)
    }

    /// Cancel all pending work and drop the grid lock.
    pub fn teardown(&mut self) {
        self.scheduler.clear();
        self.grid.release_lock();
        self.strokes.cancel();
        self.initialized = false;
        log::info!("Canvas session torn down");
    }
}
