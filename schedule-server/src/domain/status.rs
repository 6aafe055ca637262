//! Schedule status state machine.
//!
//! ```text
//! scheduled ──► running ──► delayed
//!                  │  ▲        │
//!                  │  └────────┤
//!                  ▼           ▼
//!        completed / cancelled (terminal)
//! ```
//!
//! Status is driven by the caller; the recurrence evaluator never computes it.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::schedule::Schedule;

/// Operational status of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    #[default]
    Scheduled,
    Running,
    Delayed,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    /// Returns the wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Running => "running",
            ScheduleStatus::Delayed => "delayed",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduleStatus::Completed | ScheduleStatus::Cancelled)
    }

    /// Whether `next` is reachable from this status in one step.
    ///
    /// Staying in the current status is always allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use schedule_server::domain::ScheduleStatus::*;
    ///
    /// assert!(Scheduled.can_transition_to(Running));
    /// assert!(Delayed.can_transition_to(Running));
    /// assert!(!Completed.can_transition_to(Running));
    /// assert!(Completed.can_transition_to(Completed));
    /// ```
    pub fn can_transition_to(&self, next: ScheduleStatus) -> bool {
        use ScheduleStatus::*;

        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match self {
            Scheduled => next == Running,
            Running => matches!(next, Delayed | Completed | Cancelled),
            Delayed => matches!(next, Running | Completed | Cancelled),
            Completed | Cancelled => false,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an attach operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

/// Error returned when a status change is not reachable from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: ScheduleStatus,
    pub to: ScheduleStatus,
}

/// Apply a status change, returning the updated schedule.
///
/// Entering `running` records the actual departure and entering `completed`
/// records the actual arrival, each only if not already set. Entering
/// `cancelled` sets the cancellation flag. The input schedule is never
/// modified; on error the caller must not persist anything.
pub fn apply_status_transition(
    schedule: &Schedule,
    new_status: ScheduleStatus,
    now: NaiveDateTime,
) -> Result<Schedule, InvalidTransition> {
    if !schedule.status.can_transition_to(new_status) {
        return Err(InvalidTransition {
            from: schedule.status,
            to: new_status,
        });
    }

    let mut updated = schedule.clone();
    updated.status = new_status;

    match new_status {
        ScheduleStatus::Running => {
            updated.actual_departure.get_or_insert(now);
        }
        ScheduleStatus::Completed => {
            updated.actual_arrival.get_or_insert(now);
        }
        ScheduleStatus::Cancelled => {
            updated.is_cancelled = true;
        }
        ScheduleStatus::Scheduled | ScheduleStatus::Delayed => {}
    }

    Ok(updated)
}
