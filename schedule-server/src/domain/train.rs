//! Train types and records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TrainId;

/// Error returned when parsing an unknown train type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown train type: {0}")]
pub struct InvalidTrainType(String);

/// The operational category of a train.
///
/// Only [`TrainType::Saloon`] and [`TrainType::Ftr`] trains may carry
/// mid-journey attach/detach operations.
///
/// Parsing, including deserialization, ignores case and surrounding
/// whitespace; serialization always writes the lowercase wire name.
///
/// # Examples
///
/// ```
/// use schedule_server::domain::TrainType;
///
/// let t: TrainType = "SALOON".parse().unwrap();
/// assert_eq!(t, TrainType::Saloon);
/// assert!(t.allows_attach_detach());
///
/// assert!(!"express".parse::<TrainType>().unwrap().allows_attach_detach());
/// assert!("monorail".parse::<TrainType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TrainType {
    Express,
    Local,
    Freight,
    Spic,
    Ftr,
    Saloon,
    Trc,
    Passenger,
    MailExpress,
    Superfast,
    Premium,
    Suburban,
    Memu,
    Demu,
}

impl TrainType {
    /// Every train type, in declaration order.
    pub const ALL: [TrainType; 14] = [
        TrainType::Express,
        TrainType::Local,
        TrainType::Freight,
        TrainType::Spic,
        TrainType::Ftr,
        TrainType::Saloon,
        TrainType::Trc,
        TrainType::Passenger,
        TrainType::MailExpress,
        TrainType::Superfast,
        TrainType::Premium,
        TrainType::Suburban,
        TrainType::Memu,
        TrainType::Demu,
    ];

    /// Returns the wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainType::Express => "express",
            TrainType::Local => "local",
            TrainType::Freight => "freight",
            TrainType::Spic => "spic",
            TrainType::Ftr => "ftr",
            TrainType::Saloon => "saloon",
            TrainType::Trc => "trc",
            TrainType::Passenger => "passenger",
            TrainType::MailExpress => "mail_express",
            TrainType::Superfast => "superfast",
            TrainType::Premium => "premium",
            TrainType::Suburban => "suburban",
            TrainType::Memu => "memu",
            TrainType::Demu => "demu",
        }
    }

    /// Whether schedules for this type may specify attach/detach operations.
    pub fn allows_attach_detach(&self) -> bool {
        matches!(self, TrainType::Saloon | TrainType::Ftr)
    }
}

impl FromStr for TrainType {
    type Err = InvalidTrainType;

    /// Case-insensitive parse of the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        TrainType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| InvalidTrainType(s.to_string()))
    }
}

impl TryFrom<String> for TrainType {
    type Error = InvalidTrainType;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for TrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A train that schedules can reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    pub id: TrainId,

    /// Unique across all trains.
    pub train_number: String,

    #[serde(rename = "type")]
    pub train_type: TrainType,

    #[serde(default)]
    pub description: Option<String>,

    /// Maximum speed in km/h.
    #[serde(default)]
    pub speed: Option<u32>,

    /// Passenger or load capacity.
    #[serde(default)]
    pub capacity: Option<u32>,

    #[serde(default)]
    pub priority: Option<u8>,

    #[serde(default)]
    pub features: Vec<String>,
}

impl Train {
    /// Whether `other` differs from this train only in descriptive fields.
    ///
    /// Identity fields (number and type) are frozen once a schedule
    /// references the train.
    pub fn same_identity(&self, other: &Train) -> bool {
        self.train_number == other.train_number && self.train_type == other.train_type
    }
}
