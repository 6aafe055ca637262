//! Import and export of the whole data set.
//!
//! An export document carries trains, locations and schedules with the IDs
//! they had in the exporting store. On import, trains are matched by train
//! number and locations by code, schedule references are remapped to the
//! importing store's IDs, and every schedule goes through the validator.
//! Schedules that fail are reported, not imported; the rest are kept with
//! their status and recorded actual times. Versions restart at 1.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{LocationId, Schedule, ScheduleCandidate, ScheduleId, TrainId, Violation};
use crate::store::{NewLocation, NewTrain, Snapshot, Store, StoreError};

/// Current export document format.
pub const FORMAT_VERSION: u32 = 1;

/// Errors reading an import document.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("import document is not valid JSON: {0}")]
    Malformed(String),

    #[error("unsupported format version {0} (expected {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
}

/// A portable copy of the data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub format_version: u32,
    pub exported_at: NaiveDateTime,
    #[serde(flatten)]
    pub data: Snapshot,
}

impl ExportDocument {
    /// Parse and version-check an import document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, TransferError> {
        let doc: ExportDocument =
            serde_json::from_slice(bytes).map_err(|e| TransferError::Malformed(e.to_string()))?;
        if doc.format_version != FORMAT_VERSION {
            return Err(TransferError::UnsupportedVersion(doc.format_version));
        }
        Ok(doc)
    }
}

/// Export the store's current contents.
pub async fn export(store: &Store, now: NaiveDateTime) -> ExportDocument {
    let data = store.snapshot_data().await;
    info!(
        trains = data.trains.len(),
        locations = data.locations.len(),
        schedules = data.schedules.len(),
        "data exported"
    );
    ExportDocument {
        format_version: FORMAT_VERSION,
        exported_at: now,
        data,
    }
}

/// A schedule that was imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedSchedule {
    pub source_id: ScheduleId,
    pub id: ScheduleId,
}

/// A schedule that was rejected, with the reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedSchedule {
    pub source_id: ScheduleId,
    pub violations: Vec<Violation>,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub trains_created: usize,
    pub trains_matched: usize,
    pub locations_created: usize,
    pub locations_matched: usize,
    pub imported: Vec<ImportedSchedule>,
    pub rejected: Vec<RejectedSchedule>,
}

/// Import a document into the store.
///
/// Only store failures unrelated to the document's content abort the
/// import; trains and locations created before such a failure are kept.
pub async fn import(store: &Store, doc: ExportDocument) -> Result<ImportReport, StoreError> {
    let mut report = ImportReport::default();
    let mut trains: HashMap<i64, TrainId> = HashMap::new();
    let mut locations: HashMap<i64, LocationId> = HashMap::new();

    for train in doc.data.trains {
        let existing = store.find_train_by_number(&train.train_number).await;
        let target = match existing {
            Some(existing) => {
                if existing.train_type != train.train_type {
                    warn!(
                        number = %train.train_number,
                        existing = %existing.train_type,
                        imported = %train.train_type,
                        "imported train type differs, keeping existing train"
                    );
                }
                report.trains_matched += 1;
                existing.id
            }
            None => {
                let created = store
                    .create_train(NewTrain {
                        train_number: train.train_number,
                        train_type: train.train_type,
                        description: train.description,
                        speed: train.speed,
                        capacity: train.capacity,
                        priority: train.priority,
                        features: train.features,
                    })
                    .await?;
                report.trains_created += 1;
                created.id
            }
        };
        trains.insert(train.id.value(), target);
    }

    for location in doc.data.locations {
        let existing = store.find_location_by_code(&location.code).await;
        let target = match existing {
            Some(existing) => {
                report.locations_matched += 1;
                existing.id
            }
            None => {
                let created = store
                    .create_location(NewLocation {
                        name: location.name,
                        code: location.code,
                    })
                    .await?;
                report.locations_created += 1;
                created.id
            }
        };
        locations.insert(location.id.value(), target);
    }

    let remap = Remap {
        trains: &trains,
        locations: &locations,
    };

    for schedule in doc.data.schedules {
        let source_id = schedule.id;
        let candidate = match remap.candidate(&schedule) {
            Ok(c) => c,
            Err(violations) => {
                report.rejected.push(RejectedSchedule {
                    source_id,
                    violations,
                });
                continue;
            }
        };

        match store.restore_schedule(candidate, &schedule).await {
            Ok(created) => report.imported.push(ImportedSchedule {
                source_id,
                id: created.id,
            }),
            Err(StoreError::Invalid(result)) => report.rejected.push(RejectedSchedule {
                source_id,
                violations: result.violations,
            }),
            Err(e) => return Err(e),
        }
    }

    info!(
        imported = report.imported.len(),
        rejected = report.rejected.len(),
        "import finished"
    );
    Ok(report)
}

/// Source-to-target ID mapping built during an import.
struct Remap<'a> {
    trains: &'a HashMap<i64, TrainId>,
    locations: &'a HashMap<i64, LocationId>,
}

impl Remap<'_> {
    /// Rewrite a source schedule's references into the target store's IDs.
    fn candidate(&self, schedule: &Schedule) -> Result<ScheduleCandidate, Vec<Violation>> {
        let mut missing = Vec::new();
        let mut candidate = schedule.to_candidate();

        candidate.train_id = self.train(candidate.train_id, "trainId", &mut missing);
        candidate.departure_location_id = self.location(
            candidate.departure_location_id,
            "departureLocationId",
            &mut missing,
        );
        candidate.arrival_location_id = self.location(
            candidate.arrival_location_id,
            "arrivalLocationId",
            &mut missing,
        );
        candidate.attach_location_id =
            self.location(candidate.attach_location_id, "attachLocationId", &mut missing);
        candidate.detach_location_id =
            self.location(candidate.detach_location_id, "detachLocationId", &mut missing);

        for station in &mut candidate.important_stations {
            match self.locations.get(&station.location_id.value()) {
                Some(id) => station.location_id = *id,
                None => missing.push(not_in_document(
                    "importantStations",
                    station.location_id.value(),
                )),
            }
        }

        if missing.is_empty() {
            Ok(candidate)
        } else {
            Err(missing)
        }
    }

    fn train(&self, raw: Option<i64>, field: &str, missing: &mut Vec<Violation>) -> Option<i64> {
        let raw = raw?;
        match self.trains.get(&raw) {
            Some(id) => Some(id.value()),
            None => {
                missing.push(not_in_document(field, raw));
                None
            }
        }
    }

    fn location(
        &self,
        raw: Option<i64>,
        field: &str,
        missing: &mut Vec<Violation>,
    ) -> Option<i64> {
        let raw = raw?;
        match self.locations.get(&raw) {
            Some(id) => Some(id.value()),
            None => {
                missing.push(not_in_document(field, raw));
                None
            }
        }
    }
}

fn not_in_document(field: &str, id: i64) -> Violation {
    Violation::new(field, format!("references id {} not present in import document", id))
}
