//! Location code and record types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::LocationId;

/// Error returned when parsing an invalid location code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid location code: {reason}")]
pub struct InvalidLocationCode {
    reason: &'static str,
}

/// Maximum length of a location code.
const MAX_CODE_LEN: usize = 10;

/// A normalized location code (e.g. "NDLS", "BCT").
///
/// Codes are trimmed and uppercased on parse, and must be 1 to 10 ASCII
/// alphanumeric characters.
///
/// # Examples
///
/// ```
/// use schedule_server::domain::LocationCode;
///
/// let code = LocationCode::parse(" ndls ").unwrap();
/// assert_eq!(code.as_str(), "NDLS");
///
/// assert!(LocationCode::parse("").is_err());
/// assert!(LocationCode::parse("N-DLS").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationCode(String);

impl LocationCode {
    /// Parse and normalize a location code.
    pub fn parse(s: &str) -> Result<Self, InvalidLocationCode> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(InvalidLocationCode {
                reason: "must not be empty",
            });
        }
        if trimmed.len() > MAX_CODE_LEN {
            return Err(InvalidLocationCode {
                reason: "must be at most 10 characters",
            });
        }
        if !trimmed.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(InvalidLocationCode {
                reason: "must be ASCII letters or digits",
            });
        }

        Ok(LocationCode(trimmed.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LocationCode {
    type Error = InvalidLocationCode;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        LocationCode::parse(&s)
    }
}

impl From<LocationCode> for String {
    fn from(code: LocationCode) -> Self {
        code.0
    }
}

impl fmt::Debug for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocationCode({})", self.0)
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named place schedules depart from, arrive at, or attach/detach at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// Unique across all locations.
    pub code: LocationCode,
}
