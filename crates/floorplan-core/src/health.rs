//! Grid health auditing.
//!
//! The monitor compares the scene against what the grid lifecycle believes
//! and escalates when the grid has gone missing or invisible. Escalation fires
//! when a counter reaches a threshold, not on every failing check.

use crate::config::HealthConfig;
use crate::scene::Scene;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Result of the latest health check. Recomputed, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridHealthStatus {
    pub grid_exists: bool,
    pub grid_visible: bool,
    pub grid_object_count: usize,
    pub visible_grid_object_count: usize,
    pub consecutive_failures: u32,
    pub recovery_attempts: u32,
    pub last_check_timestamp: Option<Instant>,
}

impl GridHealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.grid_exists && self.grid_visible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthReportKind {
    /// Consecutive failing checks reached the report threshold.
    GridUnhealthy,
    /// Recovery attempts reached a report threshold.
    RecoveryAttempts,
}

/// An escalation handed to the external reporter.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub kind: HealthReportKind,
    pub severity: Severity,
    pub status: GridHealthStatus,
}

/// Receives escalated health reports (error tracker, UI banner, ...).
pub trait HealthReporter {
    fn report(&mut self, report: &HealthReport);
}

/// Reporter that writes to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl HealthReporter for LogReporter {
    fn report(&mut self, report: &HealthReport) {
        match report.severity {
            Severity::Warning => log::warn!("Grid health report: {:?} {:?}", report.kind, report.status),
            Severity::Error | Severity::Critical => {
                log::error!(
                    "Grid health report ({:?}): {:?} {:?}",
                    report.severity,
                    report.kind,
                    report.status
                )
            }
        }
    }
}

/// Periodic grid audit with throttling and escalation.
pub struct HealthMonitor {
    config: HealthConfig,
    status: GridHealthStatus,
    reporter: Box<dyn HealthReporter>,
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl HealthMonitor {
    pub fn new(config: HealthConfig, reporter: Box<dyn HealthReporter>) -> Self {
        Self {
            config,
            status: GridHealthStatus::default(),
            reporter,
        }
    }

    pub fn status(&self) -> &GridHealthStatus {
        &self.status
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    fn is_throttled(&self, now: Instant) -> bool {
        self.status
            .last_check_timestamp
            .is_some_and(|last| now.saturating_duration_since(last) < self.config.check_interval())
    }

    /// Audit the grid objects in `scene`.
    ///
    /// Returns `None` without touching the status if the previous check was
    /// less than `check_interval` ago.
    pub fn check_grid_health(&mut self, scene: &impl Scene, now: Instant) -> Option<&GridHealthStatus> {
        if self.is_throttled(now) {
            return None;
        }

        let (total, visible) = scene
            .grid_objects()
            .fold((0, 0), |(total, visible), o| (total + 1, visible + usize::from(o.visible)));

        self.status.grid_object_count = total;
        self.status.visible_grid_object_count = visible;
        self.status.grid_exists = total > 0;
        self.status.grid_visible = visible > 0;
        self.status.last_check_timestamp = Some(now);

        if self.status.is_healthy() {
            if self.status.consecutive_failures > 0 {
                log::info!(
                    "Grid healthy again after {} failed checks",
                    self.status.consecutive_failures
                );
            }
            self.status.consecutive_failures = 0;
        } else {
            self.status.consecutive_failures += 1;
            self.escalate_failure();
        }

        Some(&self.status)
    }

    fn escalate_failure(&mut self) {
        let failures = self.status.consecutive_failures;
        if failures == self.config.report_after {
            log::error!(
                "Grid unhealthy for {} consecutive checks ({} of {} grid objects visible)",
                failures,
                self.status.visible_grid_object_count,
                self.status.grid_object_count
            );
            self.send(HealthReportKind::GridUnhealthy, Severity::Error);
        } else if failures == self.config.warn_after {
            log::warn!(
                "Grid health check failed: exists={}, visible={}",
                self.status.grid_exists,
                self.status.grid_visible
            );
        } else {
            log::debug!("Grid health check failed ({} in a row)", failures);
        }
    }

    /// Count a recovery attempt driven by a failed check. Returns the new count.
    pub fn register_grid_recovery_attempt(&mut self) -> u32 {
        self.status.recovery_attempts += 1;
        let attempts = self.status.recovery_attempts;
        if attempts == self.config.recovery_critical_at {
            self.send(HealthReportKind::RecoveryAttempts, Severity::Critical);
        } else if attempts == self.config.recovery_warn_at {
            self.send(HealthReportKind::RecoveryAttempts, Severity::Warning);
        }
        attempts
    }

    /// Clear all counters, e.g. after a user-triggered retry.
    pub fn reset(&mut self) {
        self.status = GridHealthStatus::default();
    }

    fn send(&mut self, kind: HealthReportKind, severity: Severity) {
        let report = HealthReport {
            kind,
            severity,
            status: self.status.clone(),
        };
        self.reporter.report(&report);
    }
}
