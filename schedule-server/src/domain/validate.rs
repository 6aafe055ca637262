//! Schedule candidate validation.
//!
//! Validation never short-circuits: every violated rule is reported, in a
//! fixed order, so a client can show all problems at once. Existence of
//! referenced rows is resolved by the caller and passed in as
//! [`ExistenceFlags`], which keeps this module free of I/O.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::running_days::RunningDays;
use super::schedule::ScheduleCandidate;
use super::train::TrainType;

const MSG_ARRIVAL_AFTER_DEPARTURE: &str = "arrival must be after departure";
const MSG_ATTACH_DETACH_TYPE: &str = "attach/detach only available for SALOON and FTR trains";
const MSG_ATTACH_INCOMPLETE: &str =
    "when specifying attach operations, location, train number, and time are all required";
const MSG_DETACH_INCOMPLETE: &str =
    "when specifying detach operations, location and time are both required";

/// Caller-resolved existence of the locations a candidate references.
///
/// Flags for references the candidate does not carry are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistenceFlags {
    pub departure: bool,
    pub arrival: bool,
    pub attach: bool,
    pub detach: bool,
}

impl ExistenceFlags {
    /// Every referenced location exists.
    pub fn all() -> Self {
        Self {
            departure: true,
            arrival: true,
            attach: true,
            detach: true,
        }
    }
}

/// A single rule violation, keyed by the wire name of the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    /// Build a result from collected violations.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    /// Whether any violation concerns `field`.
    pub fn has_violation_on(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

/// Validate a candidate against the schedule invariants.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use schedule_server::domain::{ExistenceFlags, ScheduleCandidate, TrainType, validate_schedule};
///
/// let candidate = ScheduleCandidate::from_json(br#"{
///     "trainId": 1,
///     "departureLocationId": 10,
///     "arrivalLocationId": 20,
///     "scheduledDeparture": "2024-03-04T14:00:00",
///     "scheduledArrival": "2024-03-04T08:00:00"
/// }"#).unwrap();
///
/// let result = validate_schedule(&candidate, TrainType::Express, ExistenceFlags::all());
/// assert!(!result.valid);
/// assert_eq!(result.violations[0].field, "scheduledArrival");
/// assert_eq!(result.violations[0].message, "arrival must be after departure");
/// ```
pub fn validate_schedule(
    candidate: &ScheduleCandidate,
    train_type: TrainType,
    existence: ExistenceFlags,
) -> ValidationResult {
    validate_against(candidate, Some(train_type), existence)
}

/// Validate a candidate whose train may not have been resolved.
///
/// `None` means the referenced train does not exist: that is reported on
/// `trainId`, and the train-type rules are skipped since there is no type to
/// check against.
pub fn validate_against(
    candidate: &ScheduleCandidate,
    train_type: Option<TrainType>,
    existence: ExistenceFlags,
) -> ValidationResult {
    let mut v = Vec::new();

    check_references(candidate, train_type.is_some(), existence, &mut v);

    if candidate.scheduled_arrival <= candidate.scheduled_departure {
        v.push(Violation::new("scheduledArrival", MSG_ARRIVAL_AFTER_DEPARTURE));
    }

    if let Err(e) = RunningDays::try_from(candidate.running_days.as_slice()) {
        v.push(Violation::new("runningDays", e.to_string()));
    }

    if let Some(end) = candidate.effective_end_date
        && end <= candidate.effective_start()
    {
        v.push(Violation::new(
            "effectiveEndDate",
            "effective end date must be after effective start date",
        ));
    }

    match train_type {
        Some(t) if !t.allows_attach_detach() => check_type_gate(candidate, &mut v),
        Some(_) => check_completeness(candidate, &mut v),
        None => {}
    }

    check_within_journey("attachTime", candidate.attach_time, candidate, &mut v);
    check_within_journey("detachTime", candidate.detach_time, candidate, &mut v);

    check_optional_location(
        "attachLocationId",
        candidate.attach_location_id,
        existence.attach,
        &mut v,
    );
    check_optional_location(
        "detachLocationId",
        candidate.detach_location_id,
        existence.detach,
        &mut v,
    );

    ValidationResult::from_violations(v)
}

fn check_references(
    c: &ScheduleCandidate,
    train_exists: bool,
    existence: ExistenceFlags,
    v: &mut Vec<Violation>,
) {
    match c.train_id {
        Some(id) if id > 0 => {
            if !train_exists {
                v.push(Violation::new("trainId", "train not found"));
            }
        }
        _ => v.push(Violation::new("trainId", "train is required")),
    }

    let departure = required_location(
        "departureLocationId",
        c.departure_location_id,
        existence.departure,
        v,
    );
    let arrival = required_location(
        "arrivalLocationId",
        c.arrival_location_id,
        existence.arrival,
        v,
    );

    if let (Some(d), Some(a)) = (departure, arrival)
        && d == a
    {
        v.push(Violation::new(
            "arrivalLocationId",
            "arrival location must differ from departure location",
        ));
    }
}

/// Check a required location reference, returning it when well-formed.
fn required_location(
    field: &str,
    raw: Option<i64>,
    exists: bool,
    v: &mut Vec<Violation>,
) -> Option<i64> {
    match raw {
        Some(id) if id > 0 => {
            if !exists {
                v.push(Violation::new(field, "location not found"));
            }
            Some(id)
        }
        _ => {
            v.push(Violation::new(field, "location is required"));
            None
        }
    }
}

fn check_optional_location(field: &str, raw: Option<i64>, exists: bool, v: &mut Vec<Violation>) {
    match raw {
        Some(id) if id <= 0 => v.push(Violation::new(field, "must be a positive integer")),
        Some(_) if !exists => v.push(Violation::new(field, "location not found")),
        _ => {}
    }
}

/// Trains other than SALOON/FTR may not carry any attach/detach field.
fn check_type_gate(c: &ScheduleCandidate, v: &mut Vec<Violation>) {
    let populated = [
        ("attachLocationId", c.attach_location_id.is_some()),
        ("attachTrainNumber", c.attach_train_number().is_some()),
        ("attachTime", c.attach_time.is_some()),
        ("detachLocationId", c.detach_location_id.is_some()),
        ("detachTime", c.detach_time.is_some()),
    ];
    for (field, present) in populated {
        if present {
            v.push(Violation::new(field, MSG_ATTACH_DETACH_TYPE));
        }
    }
}

/// Attach fields are all-or-nothing, as are detach fields.
fn check_completeness(c: &ScheduleCandidate, v: &mut Vec<Violation>) {
    let attach = [
        ("attachLocationId", c.attach_location_id.is_some()),
        ("attachTrainNumber", c.attach_train_number().is_some()),
        ("attachTime", c.attach_time.is_some()),
    ];
    report_missing(&attach, MSG_ATTACH_INCOMPLETE, v);

    let detach = [
        ("detachLocationId", c.detach_location_id.is_some()),
        ("detachTime", c.detach_time.is_some()),
    ];
    report_missing(&detach, MSG_DETACH_INCOMPLETE, v);
}

fn report_missing(group: &[(&str, bool)], message: &str, v: &mut Vec<Violation>) {
    if group.iter().any(|(_, present)| *present) {
        for (field, present) in group {
            if !present {
                v.push(Violation::new(*field, message));
            }
        }
    }
}

fn check_within_journey(
    field: &str,
    time: Option<NaiveDateTime>,
    c: &ScheduleCandidate,
    v: &mut Vec<Violation>,
) {
    let Some(t) = time else {
        return;
    };
    if t < c.scheduled_departure || t > c.scheduled_arrival {
        v.push(Violation::new(
            field,
            format!(
                "must be between scheduled departure ({}) and scheduled arrival ({})",
                c.scheduled_departure, c.scheduled_arrival
            ),
        ));
    }
}
