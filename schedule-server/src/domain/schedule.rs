//! Schedule records and candidates.
//!
//! A [`ScheduleCandidate`] is what a client submits when creating or editing a
//! schedule: raw identifiers, possibly inconsistent. A [`Schedule`] is a
//! persisted record built from a candidate that passed
//! [`validate_schedule`](super::validate_schedule).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::ids::{LocationId, ScheduleId, TrainId};
use super::running_days::RunningDays;
use super::status::{AttachStatus, ScheduleStatus};

/// An intermediate waypoint on a schedule.
///
/// Waypoints are informational; their times are not checked against the
/// departure/arrival window or against each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportantStation {
    pub location_id: LocationId,
    #[serde(default)]
    pub arrival_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub departure_time: Option<NaiveDateTime>,
}

/// A mid-journey attach operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachOperation {
    pub location_id: LocationId,
    pub train_number: String,
    pub time: NaiveDateTime,
    pub status: AttachStatus,
}

/// A mid-journey detach operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachOperation {
    pub location_id: LocationId,
    pub time: NaiveDateTime,
}

/// A persisted, internally consistent schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: ScheduleId,
    pub train_id: TrainId,
    pub departure_location_id: LocationId,
    pub arrival_location_id: LocationId,
    pub scheduled_departure: NaiveDateTime,
    pub scheduled_arrival: NaiveDateTime,
    #[serde(default)]
    pub actual_departure: Option<NaiveDateTime>,
    #[serde(default)]
    pub actual_arrival: Option<NaiveDateTime>,
    pub status: ScheduleStatus,
    /// Independent of `status`; a cancelled schedule never runs.
    pub is_cancelled: bool,
    pub running_days: RunningDays,
    pub effective_start_date: NaiveDate,
    #[serde(default)]
    pub effective_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub attach: Option<AttachOperation>,
    #[serde(default)]
    pub detach: Option<DetachOperation>,
    #[serde(default)]
    pub important_stations: Vec<ImportantStation>,
    /// Incremented by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl Schedule {
    /// Replace every client-editable field with the candidate's values.
    ///
    /// Identity, status, recorded actual times and version are preserved.
    /// Cancellation is one-way: an edit can set `is_cancelled` but never
    /// clear it. The candidate must already have passed validation.
    pub fn apply_edit(&self, candidate: ScheduleCandidate) -> Result<Schedule, DomainError> {
        let mut edited = candidate.into_schedule(self.id)?;
        edited.is_cancelled |= self.is_cancelled;
        edited.status = self.status;
        edited.actual_departure = self.actual_departure;
        edited.actual_arrival = self.actual_arrival;
        edited.version = self.version;
        Ok(edited)
    }

    /// Convert back into a candidate, e.g. to re-validate after a reference changed.
    pub fn to_candidate(&self) -> ScheduleCandidate {
        ScheduleCandidate {
            train_id: Some(self.train_id.value()),
            departure_location_id: Some(self.departure_location_id.value()),
            arrival_location_id: Some(self.arrival_location_id.value()),
            scheduled_departure: self.scheduled_departure,
            scheduled_arrival: self.scheduled_arrival,
            is_cancelled: self.is_cancelled,
            running_days: self.running_days.as_array().to_vec(),
            effective_start_date: Some(self.effective_start_date),
            effective_end_date: self.effective_end_date,
            attach_location_id: self.attach.as_ref().map(|a| a.location_id.value()),
            attach_train_number: self.attach.as_ref().map(|a| a.train_number.clone()),
            attach_time: self.attach.as_ref().map(|a| a.time),
            attach_status: self
                .attach
                .as_ref()
                .map(|a| a.status)
                .unwrap_or_default(),
            detach_location_id: self.detach.as_ref().map(|d| d.location_id.value()),
            detach_time: self.detach.as_ref().map(|d| d.time),
            important_stations: self.important_stations.clone(),
        }
    }
}

/// A client-submitted schedule, not yet validated.
///
/// Reference IDs are raw integers so that missing or non-positive values can
/// be reported as violations rather than rejected during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCandidate {
    #[serde(default)]
    pub train_id: Option<i64>,
    #[serde(default)]
    pub departure_location_id: Option<i64>,
    #[serde(default)]
    pub arrival_location_id: Option<i64>,
    pub scheduled_departure: NaiveDateTime,
    pub scheduled_arrival: NaiveDateTime,
    #[serde(default)]
    pub is_cancelled: bool,
    /// Kept as a plain list so a wrong length is a violation, not a decode error.
    #[serde(default = "every_day")]
    pub running_days: Vec<bool>,
    /// Defaults to the departure date when absent.
    #[serde(default)]
    pub effective_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub effective_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub attach_location_id: Option<i64>,
    #[serde(default)]
    pub attach_train_number: Option<String>,
    #[serde(default)]
    pub attach_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub attach_status: AttachStatus,
    #[serde(default)]
    pub detach_location_id: Option<i64>,
    #[serde(default)]
    pub detach_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub important_stations: Vec<ImportantStation>,
}

fn every_day() -> Vec<bool> {
    vec![true; 7]
}

impl ScheduleCandidate {
    /// Decode a candidate from a JSON body.
    ///
    /// A body of the wrong shape is a caller bug, reported as
    /// [`DomainError::MalformedInput`].
    pub fn from_json(bytes: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(bytes).map_err(|e| DomainError::MalformedInput(e.to_string()))
    }

    /// The attach train number, with blank strings treated as absent.
    pub fn attach_train_number(&self) -> Option<&str> {
        self.attach_train_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The effective start date, defaulting to the departure date.
    pub fn effective_start(&self) -> NaiveDate {
        self.effective_start_date
            .unwrap_or_else(|| self.scheduled_departure.date())
    }

    /// Build a persisted schedule from a validated candidate.
    ///
    /// New schedules start out `scheduled` at version 0.
    pub fn into_schedule(self, id: ScheduleId) -> Result<Schedule, DomainError> {
        let train_id =
            TrainId::from_raw(self.train_id).ok_or(DomainError::NotValidated("trainId"))?;
        let departure_location_id = LocationId::from_raw(self.departure_location_id)
            .ok_or(DomainError::NotValidated("departureLocationId"))?;
        let arrival_location_id = LocationId::from_raw(self.arrival_location_id)
            .ok_or(DomainError::NotValidated("arrivalLocationId"))?;
        let running_days = RunningDays::try_from(self.running_days.as_slice())
            .map_err(|_| DomainError::NotValidated("runningDays"))?;

        let attach = match (
            LocationId::from_raw(self.attach_location_id),
            self.attach_train_number(),
            self.attach_time,
        ) {
            (Some(location_id), Some(number), Some(time)) => Some(AttachOperation {
                location_id,
                train_number: number.to_string(),
                time,
                status: self.attach_status,
            }),
            (None, None, None) => None,
            _ => return Err(DomainError::NotValidated("attach fields incomplete")),
        };

        let detach = match (LocationId::from_raw(self.detach_location_id), self.detach_time) {
            (Some(location_id), Some(time)) => Some(DetachOperation { location_id, time }),
            (None, None) => None,
            _ => return Err(DomainError::NotValidated("detach fields incomplete")),
        };

        let effective_start_date = self.effective_start();

        Ok(Schedule {
            id,
            train_id,
            departure_location_id,
            arrival_location_id,
            scheduled_departure: self.scheduled_departure,
            scheduled_arrival: self.scheduled_arrival,
            actual_departure: None,
            actual_arrival: None,
            status: ScheduleStatus::Scheduled,
            is_cancelled: self.is_cancelled,
            running_days,
            effective_start_date,
            effective_end_date: self.effective_end_date,
            attach,
            detach,
            important_stations: self.important_stations,
            version: 0,
        })
    }
}
