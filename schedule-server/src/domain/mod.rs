//! Domain types and rules for railway schedules.
//!
//! Everything in this module is pure and synchronous: it receives plain
//! records and returns verdicts, never touching storage or transport.
//! Validation failures a user can correct are returned as data
//! ([`ValidationResult`]); only contract breaches become errors.

mod error;
mod ids;
mod location;
mod recurrence;
mod running_days;
mod schedule;
mod status;
mod train;
mod validate;

pub use error::DomainError;
pub use ids::{LocationId, ScheduleId, TrainId};
pub use location::{InvalidLocationCode, Location, LocationCode};
pub use recurrence::{active_dates, day_of_week, is_active_on};
pub use running_days::{InvalidRunningDays, RunningDays};
pub use schedule::{AttachOperation, DetachOperation, ImportantStation, Schedule, ScheduleCandidate};
pub use status::{AttachStatus, InvalidTransition, ScheduleStatus, apply_status_transition};
pub use train::{InvalidTrainType, Train, TrainType};
pub use validate::{ExistenceFlags, ValidationResult, Violation, validate_against, validate_schedule};
