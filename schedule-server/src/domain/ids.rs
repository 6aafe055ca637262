//! Record identifier types.
//!
//! Identifiers are assigned by the store and are always positive. Raw
//! identifiers arriving from clients are kept as `i64` on the candidate and
//! only become typed IDs once they have been checked.

use std::fmt;

macro_rules! define_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Accept a raw identifier if it is defined and positive.
            pub fn from_raw(raw: Option<i64>) -> Option<Self> {
                raw.filter(|v| *v > 0).map($name)
            }

            /// Returns the raw integer value.
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id_type!(
    /// Identifier of a persisted schedule.
    ScheduleId
);
define_id_type!(
    /// Identifier of a train.
    TrainId
);
define_id_type!(
    /// Identifier of a location (station, yard, junction).
    LocationId
);
