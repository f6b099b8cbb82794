//! Internal events for metrics emission.
//!
//! Wait metrics carry an `action` label (`snapshot`, `restore`, ...) and
//! predicate metrics a `check` label, so poll counts and durations can be
//! split per operation.

use std::time::Duration;

use metrics::{counter, histogram};
use tracing::trace;

use crate::wait::WaitAction;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted after each evaluation of a completion predicate.
pub struct PredicateEvaluated {
    /// Predicate kind (`health`, `snapshot`, ...).
    pub check: &'static str,
    pub complete: bool,
}

impl InternalEvent for PredicateEvaluated {
    fn emit(self) {
        trace!(check = self.check, complete = self.complete, "Predicate evaluated");
        counter!(
            "hourglass_predicate_evaluations_total",
            "check" => self.check,
            "complete" => if self.complete { "true" } else { "false" }
        )
        .increment(1);
    }
}

/// Outcome label for a finished wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Completed,
    TimedOut,
    Failed,
}

impl WaitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitStatus::Completed => "completed",
            WaitStatus::TimedOut => "timed_out",
            WaitStatus::Failed => "failed",
        }
    }
}

/// Event emitted when a wait ends, for any reason.
pub struct WaitFinished {
    pub action: WaitAction,
    pub status: WaitStatus,
    pub duration: Duration,
}

impl InternalEvent for WaitFinished {
    fn emit(self) {
        trace!(
            action = %self.action,
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Wait finished"
        );
        counter!(
            "hourglass_waits_total",
            "action" => self.action.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
        histogram!("hourglass_wait_duration_seconds", "action" => self.action.as_str())
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when a date-math probe returns.
pub struct DateMathResolved {
    pub success: bool,
}

impl InternalEvent for DateMathResolved {
    fn emit(self) {
        trace!(success = self.success, "Date math resolved");
        counter!(
            "hourglass_datemath_resolutions_total",
            "status" => if self.success { "success" } else { "failure" }
        )
        .increment(1);
    }
}
