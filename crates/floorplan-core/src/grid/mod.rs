//! Grid lifecycle state machine.
//!
//! [`GridCreationState`] is the single record of whether the background grid
//! exists, whether a creation is in flight, and how often creation has been
//! tried. It changes only through the operations on it; the protocol that
//! strings those operations together lives in [`lifecycle`].
//!
//! # Invariants
//!
//! - At most one creation is in flight: while the creation lock is held and
//!   unexpired, [`GridCreationState::acquire_lock`] refuses.
//! - `consecutive_resets` returns to zero only through a verified
//!   [`GridCreationState::complete_creation`] or an explicit
//!   [`GridCreationState::reset`].
//! - `attempts` never decreases.

pub mod builder;
pub mod lifecycle;

pub use builder::{GridBuilder, remove_grid, verify_creation};
pub use lifecycle::{CreationOutcome, GridLifecycle};

use crate::scheduler::deadline_after;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

/// Grid creation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Invalid grid size: {0}")]
    InvalidGridSize(f64),
    #[error("Viewport has no area")]
    EmptyViewport,
    #[error("Viewport is not finite or too far from the origin")]
    InvalidViewport,
    #[error("Grid verification failed: {present} of {expected} objects attached")]
    VerificationFailed { expected: usize, present: usize },
}

/// Why a creation request was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A creation is already running.
    InProgress,
    /// Too many consecutive failures; waiting for an explicit reset.
    ResetCapReached,
    /// Too soon after the last creation.
    Throttled,
    /// The grid exists and has been recreated too many times.
    RecreationCapReached,
    /// Another caller holds the creation lock.
    Locked,
}

/// Coarse lifecycle phase, derived from the state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPhase {
    Idle,
    InProgress,
    Created,
    Failed,
}

/// Limits and intervals governing grid creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLimits {
    /// Consecutive failures tolerated before waiting for a manual reset.
    pub max_consecutive_resets: u32,
    /// Minimum spacing between creations.
    pub throttle_interval_ms: u64,
    /// Recreations allowed while the grid exists.
    pub max_recreations: u32,
    /// Minimum spacing between recreations.
    pub min_recreation_interval_ms: u64,
    /// How long a creation lock stays valid.
    pub max_lock_time_ms: u64,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_consecutive_resets: 3,
            throttle_interval_ms: 500,
            max_recreations: 10,
            min_recreation_interval_ms: 1000,
            max_lock_time_ms: 5000,
        }
    }
}

impl GridLimits {
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn min_recreation_interval(&self) -> Duration {
        Duration::from_millis(self.min_recreation_interval_ms)
    }

    pub fn max_lock_time(&self) -> Duration {
        Duration::from_millis(self.max_lock_time_ms)
    }
}

/// Time-boxed mutual exclusion token for grid creation.
///
/// Not a mutex: acquisition never waits. Expiry keeps a holder that never
/// releases from blocking creation forever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationLock {
    pub is_locked: bool,
    pub locked_by: Option<Uuid>,
    pub locked_at: Option<Instant>,
    pub lock_expires_at: Option<Instant>,
}

impl CreationLock {
    /// Whether the lock is held and has not expired at `now`.
    pub fn is_held(&self, now: Instant) -> bool {
        self.is_locked && self.lock_expires_at.is_some_and(|expires| now < expires)
    }
}

/// The authoritative record of the grid lifecycle for one canvas session.
#[derive(Debug, Clone)]
pub struct GridCreationState {
    in_progress: bool,
    is_created: bool,
    exists: bool,
    attempts: u32,
    last_attempt_time: Option<Instant>,
    has_error: bool,
    error_message: String,
    consecutive_resets: u32,
    last_creation_time: Option<Instant>,
    total_creations: u32,
    limits: GridLimits,
    creation_lock: CreationLock,
}

impl Default for GridCreationState {
    fn default() -> Self {
        Self::new(GridLimits::default())
    }
}

impl GridCreationState {
    pub fn new(limits: GridLimits) -> Self {
        Self {
            in_progress: false,
            is_created: false,
            exists: false,
            attempts: 0,
            last_attempt_time: None,
            has_error: false,
            error_message: String::new(),
            consecutive_resets: 0,
            last_creation_time: None,
            total_creations: 0,
            limits,
            creation_lock: CreationLock::default(),
        }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn is_created(&self) -> bool {
        self.is_created
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_attempt_time(&self) -> Option<Instant> {
        self.last_attempt_time
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn consecutive_resets(&self) -> u32 {
        self.consecutive_resets
    }

    pub fn last_creation_time(&self) -> Option<Instant> {
        self.last_creation_time
    }

    pub fn total_creations(&self) -> u32 {
        self.total_creations
    }

    pub fn limits(&self) -> &GridLimits {
        &self.limits
    }

    pub fn creation_lock(&self) -> &CreationLock {
        &self.creation_lock
    }

    /// Failures have hit the cap; only [`reset`](Self::reset) allows another try.
    pub fn is_exhausted(&self) -> bool {
        self.consecutive_resets >= self.limits.max_consecutive_resets
    }

    pub fn phase(&self) -> GridPhase {
        if self.in_progress {
            GridPhase::InProgress
        } else if self.has_error {
            GridPhase::Failed
        } else if self.is_created && self.exists {
            GridPhase::Created
        } else {
            GridPhase::Idle
        }
    }

    fn since_last_creation(&self, now: Instant) -> Option<Duration> {
        self.last_creation_time
            .map(|t| now.saturating_duration_since(t))
    }

    /// Earliest time a creation or recreation could pass the time guards.
    pub fn next_allowed_at(&self) -> Option<Instant> {
        let interval = if self.is_created {
            self.limits
                .throttle_interval()
                .max(self.limits.min_recreation_interval())
        } else {
            self.limits.throttle_interval()
        };
        self.last_creation_time.map(|t| deadline_after(t, interval))
    }

    /// Guards for a first creation, with the reason when refused.
    pub fn check_create(&self, now: Instant) -> Result<(), SkipReason> {
        if self.in_progress {
            return Err(SkipReason::InProgress);
        }
        if self.is_exhausted() {
            return Err(SkipReason::ResetCapReached);
        }
        if self
            .since_last_creation(now)
            .is_some_and(|elapsed| elapsed < self.limits.throttle_interval())
        {
            return Err(SkipReason::Throttled);
        }
        Ok(())
    }

    /// Guards for rebuilding a grid that was already created.
    ///
    /// Every creation guard applies, and additionally the recreation count
    /// and minimum recreation interval. Time and count guards are independent
    /// and must all pass.
    pub fn check_recreate(&self, now: Instant) -> Result<(), SkipReason> {
        self.check_create(now)?;
        if self.exists && self.total_creations >= self.limits.max_recreations {
            return Err(SkipReason::RecreationCapReached);
        }
        if self
            .since_last_creation(now)
            .is_some_and(|elapsed| elapsed < self.limits.min_recreation_interval())
        {
            return Err(SkipReason::Throttled);
        }
        Ok(())
    }

    pub fn can_create(&self, now: Instant) -> bool {
        self.check_create(now).is_ok()
    }

    pub fn can_recreate(&self, now: Instant) -> bool {
        self.check_recreate(now).is_ok()
    }

    /// Try to take the creation lock for `owner`.
    ///
    /// Fails only while another holder's lock is unexpired. Never waits.
    pub fn acquire_lock(&mut self, owner: Uuid, now: Instant) -> bool {
        if self.creation_lock.is_held(now) {
            return false;
        }
        self.creation_lock = CreationLock {
            is_locked: true,
            locked_by: Some(owner),
            locked_at: Some(now),
            lock_expires_at: Some(deadline_after(now, self.limits.max_lock_time())),
        };
        true
    }

    /// Clear the lock. Safe to call whether or not it is held.
    pub fn release_lock(&mut self) {
        self.creation_lock = CreationLock::default();
    }

    pub fn start_creation(&mut self, now: Instant) {
        self.in_progress = true;
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt_time = Some(now);
        self.has_error = false;
        self.error_message.clear();
    }

    /// Record a verified successful creation.
    pub fn complete_creation(&mut self, now: Instant) {
        self.in_progress = false;
        self.is_created = true;
        self.exists = true;
        self.has_error = false;
        self.error_message.clear();
        self.consecutive_resets = 0;
        self.last_creation_time = Some(now);
        self.total_creations = self.total_creations.saturating_add(1);
    }

    pub fn fail_creation(&mut self, message: impl Into<String>, now: Instant) {
        self.in_progress = false;
        self.has_error = true;
        self.error_message = message.into();
        self.consecutive_resets = self.consecutive_resets.saturating_add(1);
        self.last_attempt_time = Some(now);
    }

    /// The grid was observed missing from the scene.
    pub fn mark_missing(&mut self) {
        self.exists = false;
    }

    /// Explicit external retry: clears the failure streak, error and lock.
    ///
    /// `attempts` and `total_creations` are history and stay as they are.
    pub fn reset(&mut self) {
        self.in_progress = false;
        self.has_error = false;
        self.error_message.clear();
        self.consecutive_resets = 0;
        self.release_lock();
    }
}
