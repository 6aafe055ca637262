//! Persistence adapter.
//!
//! Holds trains, locations and schedules in memory, optionally persisted to
//! a JSON snapshot file between runs. Schedule writes go through the domain
//! validator while holding the write lock.

mod error;
mod memory;
mod snapshot;

pub use error::StoreError;
pub use memory::{NewLocation, NewTrain, Store};
pub use snapshot::{Snapshot, SnapshotFile};
