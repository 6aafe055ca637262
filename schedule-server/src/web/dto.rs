//! Data transfer objects for web requests and responses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{ScheduleCandidate, ScheduleId, ScheduleStatus};

/// Query for listing schedules.
#[derive(Debug, Deserialize)]
pub struct ScheduleListQuery {
    /// Only return schedules active on this date (YYYY-MM-DD)
    pub date: Option<String>,
}

/// Query for a single-day activity check.
#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    /// Date to check (YYYY-MM-DD, defaults to today)
    pub date: Option<String>,
}

/// Query for a calendar window.
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: String,
    pub to: String,
}

/// Full edit of a schedule.
///
/// The candidate fields sit at the top level next to the optional version
/// guard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    /// Reject the edit unless the stored version matches
    #[serde(default)]
    pub expected_version: Option<u64>,

    #[serde(flatten)]
    pub candidate: ScheduleCandidate,
}

/// Request to move a schedule to a new status.
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: ScheduleStatus,
}

/// Whether a schedule runs on a date.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveResponse {
    pub schedule_id: ScheduleId,
    pub date: NaiveDate,

    /// Monday = 0 ... Sunday = 6
    pub day_of_week: usize,
    pub active: bool,
}

/// Dates on which a schedule runs within a window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub schedule_id: ScheduleId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub dates: Vec<NaiveDate>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
