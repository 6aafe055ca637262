//! Recurrence evaluation: does a schedule run on a given calendar day?

use chrono::{Datelike, NaiveDate};

use super::running_days::RunningDays;
use super::schedule::Schedule;

/// Day of the week for `date`, with Monday = 0 and Sunday = 6.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use schedule_server::domain::day_of_week;
///
/// // 2024-03-04 was a Monday
/// assert_eq!(day_of_week(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()), 0);
/// assert_eq!(day_of_week(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()), 6);
/// ```
pub fn day_of_week(date: NaiveDate) -> usize {
    RunningDays::index_of(date.weekday())
}

/// Whether `schedule` runs on `date`.
///
/// A schedule is active when the date lies inside its effective window
/// (inclusive at both ends), its running days include the weekday, and it
/// is not cancelled. Cancellation overrides everything else.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use schedule_server::domain::{ScheduleCandidate, ScheduleId, is_active_on};
///
/// let schedule = ScheduleCandidate::from_json(br#"{
///     "trainId": 1,
///     "departureLocationId": 1,
///     "arrivalLocationId": 2,
///     "scheduledDeparture": "2024-03-04T08:00:00",
///     "scheduledArrival": "2024-03-04T14:00:00",
///     "runningDays": [true, false, false, false, false, false, false],
///     "effectiveStartDate": "2024-03-01"
/// }"#).unwrap().into_schedule(ScheduleId(1)).unwrap();
///
/// assert!(is_active_on(&schedule, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()));
/// assert!(!is_active_on(&schedule, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));
/// ```
pub fn is_active_on(schedule: &Schedule, date: NaiveDate) -> bool {
    if date < schedule.effective_start_date {
        return false;
    }
    if schedule.effective_end_date.is_some_and(|end| date > end) {
        return false;
    }
    if !schedule.running_days.runs_on_index(day_of_week(date)) {
        return false;
    }
    !schedule.is_cancelled
}

/// Every date in `from..=to` on which `schedule` is active.
///
/// An inverted window yields no dates.
pub fn active_dates(schedule: &Schedule, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| is_active_on(schedule, *d))
        .collect()
}
