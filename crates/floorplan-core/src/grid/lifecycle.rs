//! The grid (re)creation protocol.
//!
//! Requests come from overlapping callbacks (resize, zoom, tool switch,
//! retry timers, health checks). Each one runs the whole protocol inside a
//! single synchronous call:
//!
//! guard → acquire lock → start → build, replace grid → verify →
//! complete or fail → release lock
//!
//! The lock is released on every path once acquired, including a panic from
//! the scene mid-build. A request that cannot
//! get past the guards or the lock is skipped, not queued; the next trigger
//! tries again.

use super::builder::{GridBuilder, count_attached, remove_grid, verify_creation};
use super::{GridCreationState, GridError, GridLimits, GridPhase, SkipReason};
use crate::scene::{ObjectId, Scene};
use kurbo::Rect;
use uuid::Uuid;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Result of a creation request.
#[derive(Debug, Clone, PartialEq)]
pub enum CreationOutcome {
    /// A new grid is attached and verified.
    Created { objects: Vec<ObjectId> },
    /// Nothing was attempted.
    Skipped(SkipReason),
    /// An attempt was made and failed; counted against the reset cap.
    Failed(GridError),
}

impl CreationOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreationOutcome::Created { .. })
    }
}

/// Owns the grid state for one canvas session and runs creation requests.
#[derive(Debug, Clone)]
pub struct GridLifecycle {
    state: GridCreationState,
    builder: GridBuilder,
    owner: Uuid,
}

impl GridLifecycle {
    pub fn new(builder: GridBuilder, limits: GridLimits) -> Self {
        Self {
            state: GridCreationState::new(limits),
            builder,
            owner: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> &GridCreationState {
        &self.state
    }

    pub fn builder(&self) -> &GridBuilder {
        &self.builder
    }

    pub fn phase(&self) -> GridPhase {
        self.state.phase()
    }

    /// Lock owner id used by this lifecycle.
    pub fn owner(&self) -> Uuid {
        self.owner
    }

    /// Which guard applies: first creation, or recreation of a built grid.
    fn check_guards(&self, now: Instant) -> Result<(), SkipReason> {
        if self.state.is_created() {
            self.state.check_recreate(now)
        } else {
            self.state.check_create(now)
        }
    }

    /// Build the grid for `viewport` if the guards and the lock allow it.
    pub fn ensure_grid(&mut self, scene: &mut impl Scene, viewport: Rect, now: Instant) -> CreationOutcome {
        if let Err(reason) = self.check_guards(now) {
            log::debug!("Grid creation skipped: {:?}", reason);
            return CreationOutcome::Skipped(reason);
        }
        if !self.state.acquire_lock(self.owner, now) {
            log::debug!("Grid creation lock held, deferring");
            return CreationOutcome::Skipped(SkipReason::Locked);
        }

        let builder = self.builder;
        let mut attempt = CreationAttempt::start(&mut self.state, now);
        log::debug!(
            "Creating grid (attempt {}) for viewport {:?}",
            attempt.state.attempts(),
            viewport
        );

        match rebuild(&builder, scene, viewport) {
            Ok(created) if verify_creation(scene, &created) => {
                attempt.complete();
                scene.request_repaint();
                log::info!(
                    "Grid created with {} lines (total creations: {})",
                    created.len(),
                    attempt.state.total_creations()
                );
                CreationOutcome::Created { objects: created }
            }
            Ok(created) => {
                let err = GridError::VerificationFailed {
                    expected: created.len(),
                    present: count_attached(scene, &created),
                };
                attempt.fail(err)
            }
            Err(err) => attempt.fail(err),
        }
    }

    /// The health monitor saw no grid in the scene.
    pub fn mark_missing(&mut self) {
        self.state.mark_missing();
    }

    /// User-triggered retry after the failure cap was reached.
    pub fn reset(&mut self) {
        log::info!("Grid state reset");
        self.state.reset();
    }

    /// Drop the lock if this session is going away mid-creation.
    pub fn release_lock(&mut self) {
        self.state.release_lock();
    }
}

/// Replace the old grid with a fresh one. The build happens first, so a
/// build error leaves the old grid in place.
fn rebuild(builder: &GridBuilder, scene: &mut impl Scene, viewport: Rect) -> Result<Vec<ObjectId>, GridError> {
    let objects = builder.build(viewport)?;
    remove_grid(scene);
    Ok(objects.into_iter().map(|o| scene.add(o)).collect())
}

/// One started creation. Dropping it releases the lock, and an attempt that
/// was never completed or failed (the scene panicked) is recorded as failed.
struct CreationAttempt<'a> {
    state: &'a mut GridCreationState,
    now: Instant,
    settled: bool,
}

impl<'a> CreationAttempt<'a> {
    fn start(state: &'a mut GridCreationState, now: Instant) -> Self {
        state.start_creation(now);
        Self {
            state,
            now,
            settled: false,
        }
    }

    fn complete(&mut self) {
        self.state.complete_creation(self.now);
        self.settled = true;
    }

    fn fail(&mut self, err: GridError) -> CreationOutcome {
        self.state.fail_creation(err.to_string(), self.now);
        self.settled = true;
        if self.state.is_exhausted() {
            log::error!(
                "Grid creation failed {} times in a row, giving up until reset: {}",
                self.state.consecutive_resets(),
                err
            );
        } else {
            log::warn!("Grid creation failed: {}", err);
        }
        CreationOutcome::Failed(err)
    }
}

impl Drop for CreationAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            log::error!("Grid creation aborted (attempt {})", self.state.attempts());
            self.state.fail_creation("grid creation aborted", self.now);
        }
        self.state.release_lock();
    }
}
