//! In-memory repository of trains, locations and schedules.
//!
//! All tables live behind a single `RwLock`, so every write (including the
//! validation it performs) is serialized. Trains and locations are never
//! deleted, which keeps references resolved during validation stable for the
//! duration of a write.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{
    ExistenceFlags, Location, LocationCode, LocationId, Schedule, ScheduleCandidate, ScheduleId,
    ScheduleStatus, Train, TrainId, TrainType, ValidationResult, apply_status_transition,
    validate_against,
};

use super::error::StoreError;
use super::snapshot::{Snapshot, SnapshotFile};

/// A train to be created, or the full replacement of an existing train.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrain {
    pub train_number: String,
    #[serde(rename = "type")]
    pub train_type: TrainType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub speed: Option<u32>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl NewTrain {
    fn into_train(self, id: TrainId) -> Result<Train, StoreError> {
        let train_number = self.train_number.trim().to_string();
        if train_number.is_empty() {
            return Err(StoreError::InvalidInput(
                "train number must not be empty".to_string(),
            ));
        }
        Ok(Train {
            id,
            train_number,
            train_type: self.train_type,
            description: self.description,
            speed: self.speed,
            capacity: self.capacity,
            priority: self.priority,
            features: self.features,
        })
    }
}

/// A location to be created.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub code: LocationCode,
}

#[derive(Debug, Default)]
struct Tables {
    trains: BTreeMap<TrainId, Train>,
    locations: BTreeMap<LocationId, Location>,
    schedules: BTreeMap<ScheduleId, Schedule>,
    next_train: i64,
    next_location: i64,
    next_schedule: i64,
}

impl Tables {
    fn empty() -> Self {
        Self {
            next_train: 1,
            next_location: 1,
            next_schedule: 1,
            ..Default::default()
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let mut tables = Self::empty();

        for train in snapshot.trains {
            if tables.train_by_number(&train.train_number).is_some() {
                return Err(StoreError::SnapshotCorrupt {
                    message: format!("duplicate train number {}", train.train_number),
                });
            }
            tables.next_train = tables.next_train.max(id_after("train", train.id.value())?);
            tables.trains.insert(train.id, train);
        }
        for location in snapshot.locations {
            if tables.location_by_code(&location.code).is_some() {
                return Err(StoreError::SnapshotCorrupt {
                    message: format!("duplicate location code {}", location.code),
                });
            }
            tables.next_location = tables
                .next_location
                .max(id_after("location", location.id.value())?);
            tables.locations.insert(location.id, location);
        }
        for schedule in snapshot.schedules {
            tables.check_references(&schedule)?;
            tables.next_schedule = tables
                .next_schedule
                .max(id_after("schedule", schedule.id.value())?);
            tables.schedules.insert(schedule.id, schedule);
        }

        Ok(tables)
    }

    /// Every train and location a loaded schedule points at must exist.
    fn check_references(&self, schedule: &Schedule) -> Result<(), StoreError> {
        if !self.trains.contains_key(&schedule.train_id) {
            return Err(StoreError::SnapshotCorrupt {
                message: format!(
                    "schedule {} references missing train {}",
                    schedule.id, schedule.train_id
                ),
            });
        }

        let locations = [schedule.departure_location_id, schedule.arrival_location_id]
            .into_iter()
            .chain(schedule.attach.as_ref().map(|a| a.location_id))
            .chain(schedule.detach.as_ref().map(|d| d.location_id))
            .chain(schedule.important_stations.iter().map(|s| s.location_id));
        for location in locations {
            if !self.locations.contains_key(&location) {
                return Err(StoreError::SnapshotCorrupt {
                    message: format!(
                        "schedule {} references missing location {}",
                        schedule.id, location
                    ),
                });
            }
        }
        Ok(())
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            trains: self.trains.values().cloned().collect(),
            locations: self.locations.values().cloned().collect(),
            schedules: self.schedules.values().cloned().collect(),
        }
    }

    fn train_by_number(&self, number: &str) -> Option<&Train> {
        self.trains.values().find(|t| t.train_number == number)
    }

    fn location_by_code(&self, code: &LocationCode) -> Option<&Location> {
        self.locations.values().find(|l| &l.code == code)
    }

    fn location_exists(&self, raw: Option<i64>) -> bool {
        LocationId::from_raw(raw).is_some_and(|id| self.locations.contains_key(&id))
    }

    /// Resolve a candidate's references and run the domain validator.
    fn validate(&self, candidate: &ScheduleCandidate) -> ValidationResult {
        let train_type = TrainId::from_raw(candidate.train_id)
            .and_then(|id| self.trains.get(&id))
            .map(|t| t.train_type);

        let existence = ExistenceFlags {
            departure: self.location_exists(candidate.departure_location_id),
            arrival: self.location_exists(candidate.arrival_location_id),
            attach: self.location_exists(candidate.attach_location_id),
            detach: self.location_exists(candidate.detach_location_id),
        };

        validate_against(candidate, train_type, existence)
    }

    fn schedule_mut(&mut self, id: ScheduleId) -> Result<&mut Schedule, StoreError> {
        self.schedules.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "schedule",
            id: id.value(),
        })
    }
}

/// The persistence adapter.
///
/// Constructed once with [`Store::open`] and shared by reference; call
/// [`Store::close`] on shutdown to write the final snapshot.
pub struct Store {
    tables: RwLock<Tables>,
    snapshot: Option<SnapshotFile>,
}

impl Store {
    /// Create an empty store with no snapshot file.
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::empty()),
            snapshot: None,
        }
    }

    /// Open a store, loading the snapshot file if one is configured and present.
    ///
    /// I/O failures are retried up to `attempts` times, `retry_delay` apart.
    /// A corrupt snapshot fails immediately.
    pub async fn open(
        snapshot: Option<SnapshotFile>,
        attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self, StoreError> {
        let Some(file) = snapshot else {
            info!("no snapshot configured, starting with an empty store");
            return Ok(Self::in_memory());
        };

        let attempts = attempts.max(1);
        let mut attempt = 1;
        let loaded = loop {
            match file.load() {
                Ok(loaded) => break loaded,
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(attempt, error = %e, "failed to load snapshot, retrying");
                    attempt += 1;
                    tokio::time::sleep(retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        let tables = match loaded {
            Some(data) => {
                let tables = Tables::from_snapshot(data)?;
                info!(
                    path = %file.path().display(),
                    trains = tables.trains.len(),
                    locations = tables.locations.len(),
                    schedules = tables.schedules.len(),
                    "loaded snapshot"
                );
                tables
            }
            None => {
                info!(path = %file.path().display(), "snapshot not found, starting empty");
                Tables::empty()
            }
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(file),
        })
    }

    /// Write the current contents to the snapshot file, if configured.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let Some(file) = self.snapshot.clone() else {
            return Ok(());
        };
        let data = self.snapshot_data().await;
        let count = data.schedules.len();

        tokio::task::spawn_blocking(move || file.save(&data))
            .await
            .map_err(|e| StoreError::SnapshotIo {
                message: format!("snapshot task failed: {}", e),
            })??;

        debug!(schedules = count, "snapshot written");
        Ok(())
    }

    /// Flush and release the store.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.flush().await?;
        info!("store closed");
        Ok(())
    }

    /// Copy of the full data set.
    pub async fn snapshot_data(&self) -> Snapshot {
        self.tables.read().await.to_snapshot()
    }

    // Trains

    pub async fn list_trains(&self) -> Vec<Train> {
        self.tables.read().await.trains.values().cloned().collect()
    }

    pub async fn get_train(&self, id: TrainId) -> Result<Train, StoreError> {
        self.tables
            .read()
            .await
            .trains
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "train",
                id: id.value(),
            })
    }

    pub async fn find_train_by_number(&self, number: &str) -> Option<Train> {
        self.tables.read().await.train_by_number(number.trim()).cloned()
    }

    /// Create a train with a unique train number.
    pub async fn create_train(&self, new: NewTrain) -> Result<Train, StoreError> {
        let mut tables = self.tables.write().await;
        let id = TrainId(tables.next_train);
        let train = new.into_train(id)?;

        if tables.train_by_number(&train.train_number).is_some() {
            return Err(StoreError::Duplicate {
                entity: "train",
                field: "number",
                value: train.train_number,
            });
        }

        tables.next_train += 1;
        tables.trains.insert(id, train.clone());
        info!(train_id = %id, number = %train.train_number, "train created");
        Ok(train)
    }

    /// Replace a train.
    ///
    /// Once any schedule references the train, only descriptive fields may
    /// change.
    pub async fn update_train(&self, id: TrainId, new: NewTrain) -> Result<Train, StoreError> {
        let mut tables = self.tables.write().await;
        let current = tables.trains.get(&id).ok_or(StoreError::NotFound {
            entity: "train",
            id: id.value(),
        })?;
        let updated = new.into_train(id)?;

        if updated.train_number != current.train_number
            && tables.train_by_number(&updated.train_number).is_some()
        {
            return Err(StoreError::Duplicate {
                entity: "train",
                field: "number",
                value: updated.train_number,
            });
        }

        let referenced = tables.schedules.values().any(|s| s.train_id == id);
        if referenced && !current.same_identity(&updated) {
            return Err(StoreError::Conflict(format!(
                "train {} is referenced by schedules; only descriptive fields may change",
                id
            )));
        }

        tables.trains.insert(id, updated.clone());
        debug!(train_id = %id, "train updated");
        Ok(updated)
    }

    // Locations

    pub async fn list_locations(&self) -> Vec<Location> {
        self.tables.read().await.locations.values().cloned().collect()
    }

    pub async fn get_location(&self, id: LocationId) -> Result<Location, StoreError> {
        self.tables
            .read()
            .await
            .locations
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "location",
                id: id.value(),
            })
    }

    pub async fn find_location_by_code(&self, code: &LocationCode) -> Option<Location> {
        self.tables.read().await.location_by_code(code).cloned()
    }

    /// Create a location with a unique code.
    pub async fn create_location(&self, new: NewLocation) -> Result<Location, StoreError> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::InvalidInput(
                "location name must not be empty".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        if tables.location_by_code(&new.code).is_some() {
            return Err(StoreError::Duplicate {
                entity: "location",
                field: "code",
                value: new.code.to_string(),
            });
        }

        let id = LocationId(tables.next_location);
        tables.next_location += 1;
        let location = Location {
            id,
            name,
            code: new.code,
        };
        tables.locations.insert(id, location.clone());
        info!(location_id = %id, code = %location.code, "location created");
        Ok(location)
    }

    // Schedules

    pub async fn list_schedules(&self) -> Vec<Schedule> {
        self.tables.read().await.schedules.values().cloned().collect()
    }

    pub async fn get_schedule(&self, id: ScheduleId) -> Result<Schedule, StoreError> {
        self.tables
            .read()
            .await
            .schedules
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "schedule",
                id: id.value(),
            })
    }

    /// Validate a candidate against the current data without writing.
    pub async fn validate(&self, candidate: &ScheduleCandidate) -> ValidationResult {
        self.tables.read().await.validate(candidate)
    }

    /// Validate and insert a new schedule.
    pub async fn create_schedule(
        &self,
        candidate: ScheduleCandidate,
    ) -> Result<Schedule, StoreError> {
        self.insert_schedule(candidate, None).await
    }

    /// Validate and insert a schedule carried over from another store.
    ///
    /// Unlike [`Store::create_schedule`], the source's status and recorded
    /// actual times are kept.
    pub async fn restore_schedule(
        &self,
        candidate: ScheduleCandidate,
        source: &Schedule,
    ) -> Result<Schedule, StoreError> {
        self.insert_schedule(candidate, Some(source)).await
    }

    async fn insert_schedule(
        &self,
        candidate: ScheduleCandidate,
        source: Option<&Schedule>,
    ) -> Result<Schedule, StoreError> {
        let mut tables = self.tables.write().await;

        let result = tables.validate(&candidate);
        if !result.valid {
            return Err(StoreError::Invalid(result));
        }

        let id = ScheduleId(tables.next_schedule);
        let mut schedule = candidate.into_schedule(id)?;
        schedule.version = 1;
        if let Some(source) = source {
            schedule.status = source.status;
            schedule.actual_departure = source.actual_departure;
            schedule.actual_arrival = source.actual_arrival;
            schedule.is_cancelled |= source.status == ScheduleStatus::Cancelled;
        }

        tables.next_schedule += 1;
        tables.schedules.insert(id, schedule.clone());
        info!(
            schedule_id = %id,
            train_id = %schedule.train_id,
            days = %schedule.running_days,
            "schedule created"
        );
        Ok(schedule)
    }

    /// Validate and apply a full edit.
    ///
    /// When `expected_version` is given it must match the stored version.
    pub async fn replace_schedule(
        &self,
        id: ScheduleId,
        candidate: ScheduleCandidate,
        expected_version: Option<u64>,
    ) -> Result<Schedule, StoreError> {
        let mut tables = self.tables.write().await;

        let result = tables.validate(&candidate);
        let current = tables.schedule_mut(id)?;
        check_version(current, expected_version)?;
        if !result.valid {
            return Err(StoreError::Invalid(result));
        }

        let mut edited = current.apply_edit(candidate)?;
        edited.version = current.version + 1;
        *current = edited.clone();

        info!(schedule_id = %id, version = edited.version, "schedule replaced");
        Ok(edited)
    }

    /// Apply a status transition.
    pub async fn transition_schedule(
        &self,
        id: ScheduleId,
        status: ScheduleStatus,
        now: NaiveDateTime,
    ) -> Result<Schedule, StoreError> {
        let mut tables = self.tables.write().await;
        let current = tables.schedule_mut(id)?;

        let mut updated = apply_status_transition(current, status, now)?;
        if updated != *current {
            updated.version = current.version + 1;
            *current = updated.clone();
        }

        info!(schedule_id = %id, status = %updated.status, "schedule status changed");
        Ok(updated)
    }

    /// Mark a schedule as cancelled without touching its status.
    pub async fn cancel_schedule(&self, id: ScheduleId) -> Result<Schedule, StoreError> {
        let mut tables = self.tables.write().await;
        let current = tables.schedule_mut(id)?;

        if !current.is_cancelled {
            current.is_cancelled = true;
            current.version += 1;
            info!(schedule_id = %id, "schedule cancelled");
        }
        Ok(current.clone())
    }

    /// Permanently remove a schedule.
    pub async fn delete_schedule(&self, id: ScheduleId) -> Result<Schedule, StoreError> {
        let removed = self
            .tables
            .write()
            .await
            .schedules
            .remove(&id)
            .ok_or(StoreError::NotFound {
                entity: "schedule",
                id: id.value(),
            })?;
        warn!(schedule_id = %id, "schedule purged");
        Ok(removed)
    }
}

/// The next free ID after `id`, for resuming allocation from a snapshot.
fn id_after(entity: &str, id: i64) -> Result<i64, StoreError> {
    id.checked_add(1).ok_or_else(|| StoreError::SnapshotCorrupt {
        message: format!("{entity} id {id} is out of range"),
    })
}

fn check_version(current: &Schedule, expected: Option<u64>) -> Result<(), StoreError> {
    match expected {
        Some(expected) if expected != current.version => Err(StoreError::VersionConflict {
            expected,
            actual: current.version,
        }),
        _ => Ok(()),
    }
}
