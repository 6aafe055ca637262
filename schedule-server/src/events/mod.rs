//! Update events and broadcast fan-out.
//!
//! Handlers publish an [`UpdateEvent`] after a store write succeeds. Every
//! subscriber receives every event published after it subscribed; a
//! subscriber that falls more than the channel capacity behind skips the
//! events it missed instead of holding publishers back.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::{Location, Schedule, ScheduleId, Train};

/// A change that has been applied to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UpdateEvent {
    ScheduleCreated { schedule: Schedule },
    ScheduleUpdated { schedule: Schedule },
    StatusChanged { schedule: Schedule },
    ScheduleCancelled { schedule: Schedule },
    ScheduleDeleted { schedule_id: ScheduleId },
    TrainSaved { train: Train },
    LocationCreated { location: Location },
    Imported { trains: usize, locations: usize, schedules: usize },
}

impl UpdateEvent {
    /// Event name, as used for the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            UpdateEvent::ScheduleCreated { .. } => "scheduleCreated",
            UpdateEvent::ScheduleUpdated { .. } => "scheduleUpdated",
            UpdateEvent::StatusChanged { .. } => "statusChanged",
            UpdateEvent::ScheduleCancelled { .. } => "scheduleCancelled",
            UpdateEvent::ScheduleDeleted { .. } => "scheduleDeleted",
            UpdateEvent::TrainSaved { .. } => "trainSaved",
            UpdateEvent::LocationCreated { .. } => "locationCreated",
            UpdateEvent::Imported { .. } => "imported",
        }
    }
}

/// Fan-out of update events to any number of subscribers.
#[derive(Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<Arc<UpdateEvent>>,
}

impl Broadcaster {
    /// Create a broadcaster buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event, returning how many subscribers will receive it.
    pub fn publish(&self, event: UpdateEvent) -> usize {
        let name = event.name();
        match self.sender.send(Arc::new(event)) {
            Ok(receivers) => {
                debug!(event = name, receivers, "event published");
                receivers
            }
            Err(_) => {
                debug!(event = name, "event dropped, no subscribers");
                0
            }
        }
    }

    /// Start receiving events published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A single subscriber's view of the event stream.
pub struct Subscription {
    receiver: broadcast::Receiver<Arc<UpdateEvent>>,
}

impl Subscription {
    /// Wait for the next event.
    ///
    /// Returns `None` once every broadcaster handle has been dropped.
    pub async fn next(&mut self) -> Option<Arc<UpdateEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
