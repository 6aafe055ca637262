//! Weekly running-day pattern.
//!
//! Running days are indexed Monday = 0 through Sunday = 6. chrono's
//! [`Weekday`] is the only other week convention this crate touches, and
//! [`RunningDays::index_of`] is the single place that converts between them.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Error returned when a running-day pattern does not have 7 entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("running days must have exactly 7 entries, got {0}")]
pub struct InvalidRunningDays(pub usize);

/// Which days of the week a schedule runs on.
///
/// # Examples
///
/// ```
/// use chrono::Weekday;
/// use schedule_server::domain::RunningDays;
///
/// let days = RunningDays::try_from(&[true, false, false, false, false, false, true][..]).unwrap();
/// assert!(days.runs_on_index(RunningDays::index_of(Weekday::Mon)));
/// assert!(days.runs_on_index(RunningDays::index_of(Weekday::Sun)));
/// assert!(!days.runs_on_index(RunningDays::index_of(Weekday::Wed)));
/// assert_eq!(days.to_string(), "M-----S");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunningDays([bool; 7]);

impl RunningDays {
    /// A pattern running on every day of the week.
    pub fn every_day() -> Self {
        RunningDays([true; 7])
    }

    /// Create from an array indexed Monday = 0.
    pub fn new(days: [bool; 7]) -> Self {
        RunningDays(days)
    }

    /// Index of `weekday` in the Monday = 0 convention.
    pub fn index_of(weekday: Weekday) -> usize {
        weekday.num_days_from_monday() as usize
    }

    /// Whether the pattern includes the day at `index` (Monday = 0).
    ///
    /// Out-of-range indices never run.
    pub fn runs_on_index(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// Returns the underlying array.
    pub fn as_array(&self) -> [bool; 7] {
        self.0
    }
}

impl Default for RunningDays {
    fn default() -> Self {
        Self::every_day()
    }
}

impl TryFrom<&[bool]> for RunningDays {
    type Error = InvalidRunningDays;

    fn try_from(days: &[bool]) -> Result<Self, Self::Error> {
        let array: [bool; 7] = days
            .try_into()
            .map_err(|_| InvalidRunningDays(days.len()))?;
        Ok(RunningDays(array))
    }
}

impl fmt::Display for RunningDays {
    /// Compact form such as "MTWTF--".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LETTERS: [char; 7] = ['M', 'T', 'W', 'T', 'F', 'S', 'S'];
        for (letter, runs) in LETTERS.iter().zip(self.0) {
            write!(f, "{}", if runs { *letter } else { '-' })?;
        }
        Ok(())
    }
}
