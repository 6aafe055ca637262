//! Application state for the web layer.

use std::sync::Arc;

use crate::events::Broadcaster;
use crate::store::Store;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Schedule, train and location repository
    pub store: Arc<Store>,

    /// Fan-out of applied updates to event stream subscribers
    pub events: Broadcaster,
}

impl AppState {
    /// Create a new app state.
    pub fn new(store: Arc<Store>, events: Broadcaster) -> Self {
        Self { store, events }
    }
}
