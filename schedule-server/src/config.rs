//! Server configuration.
//!
//! Values come from environment variables, falling back to defaults:
//!
//! | Variable | Default |
//! |---|---|
//! | `SCHEDULE_SERVER_ADDR` | `127.0.0.1:3000` |
//! | `SCHEDULE_SNAPSHOT_PATH` | unset (no persistence) |
//! | `SCHEDULE_SNAPSHOT_INTERVAL_SECS` | `60` |
//! | `SCHEDULE_EVENT_CAPACITY` | `256` |
//! | `SCHEDULE_OPEN_ATTEMPTS` | `3` |
//! | `SCHEDULE_OPEN_RETRY_MS` | `500` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::store::SnapshotFile;

/// Error returned when an environment variable has an unusable value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Configuration for the schedule server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub addr: SocketAddr,

    /// Snapshot file; `None` keeps everything in memory only.
    pub snapshot_path: Option<PathBuf>,

    /// How often the store is flushed to the snapshot file (seconds).
    pub snapshot_interval_secs: u64,

    /// Events buffered per subscriber before a slow subscriber starts
    /// skipping.
    pub event_capacity: usize,

    /// Attempts at loading the snapshot on startup.
    pub open_attempts: u32,

    /// Delay between snapshot load attempts (milliseconds).
    pub open_retry_ms: u64,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            addr: parse_or(&lookup, "SCHEDULE_SERVER_ADDR", defaults.addr)?,
            snapshot_path: lookup("SCHEDULE_SNAPSHOT_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            snapshot_interval_secs: parse_or(
                &lookup,
                "SCHEDULE_SNAPSHOT_INTERVAL_SECS",
                defaults.snapshot_interval_secs,
            )?,
            event_capacity: parse_or(&lookup, "SCHEDULE_EVENT_CAPACITY", defaults.event_capacity)?,
            open_attempts: parse_or(&lookup, "SCHEDULE_OPEN_ATTEMPTS", defaults.open_attempts)?,
            open_retry_ms: parse_or(&lookup, "SCHEDULE_OPEN_RETRY_MS", defaults.open_retry_ms)?,
        })
    }

    /// Returns the snapshot interval as a Duration.
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs.max(1))
    }

    /// Returns the snapshot load retry delay as a Duration.
    pub fn open_retry_delay(&self) -> Duration {
        Duration::from_millis(self.open_retry_ms)
    }

    /// The configured snapshot file, if any.
    pub fn snapshot_file(&self) -> Option<SnapshotFile> {
        self.snapshot_path.as_ref().map(SnapshotFile::new)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            snapshot_path: None,
            snapshot_interval_secs: 60,
            event_capacity: 256,
            open_attempts: 3,
            open_retry_ms: 500,
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { key, value }),
    }
}
