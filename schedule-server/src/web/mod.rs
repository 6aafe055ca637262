//! Web layer for the schedule server.
//!
//! JSON endpoints for trains, locations and schedules, dry-run validation,
//! recurrence queries, import/export, and a Server-Sent Events stream of
//! applied updates.

mod dto;
mod error;
mod extract;
mod routes;
mod state;

pub use dto::*;
pub use error::AppError;
pub use routes::{MAX_CALENDAR_DAYS, create_router};
pub use state::AppState;
