//! JSON snapshot source.
//!
//! Reads appointments exported by the calendar host into a JSON file:
//!
//! ```json
//! { "appointments": [ { "uid": "...", "subject": "...", ... } ] }
//! ```
//!
//! The file is re-read on every fetch so a long-running scheduler picks up
//! new snapshots.

use std::io;
use std::path::{Path, PathBuf};

use icsbridge_core::AppointmentRecord;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{SourceError, SourceResult};
use crate::source::{BoxFuture, CalendarSource, FetchOptions, FetchResult, select_for_window};

const NAME: &str = "snapshot";

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    appointments: Vec<AppointmentRecord>,
}

/// A [`CalendarSource`] backed by a JSON snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses snapshot JSON into appointments, in file order.
    pub fn parse(json: &str) -> SourceResult<Vec<AppointmentRecord>> {
        let snapshot: Snapshot = serde_json::from_str(json).map_err(|e| {
            SourceError::invalid_data(format!("malformed snapshot: {}", e))
                .with_source_name(NAME)
                .with_source(e)
        })?;
        Ok(snapshot.appointments)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> SourceResult<Vec<AppointmentRecord>> {
        let json = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            let message = format!("cannot read {}: {}", self.path.display(), e);
            let err = if e.kind() == io::ErrorKind::NotFound {
                SourceError::not_found(message)
            } else {
                SourceError::io(message)
            };
            err.with_source_name(NAME).with_source(e)
        })?;

        let appointments = Self::parse(&json)?;
        debug!(count = appointments.len(), "loaded snapshot");
        Ok(appointments)
    }
}

impl CalendarSource for SnapshotSource {
    fn name(&self) -> &str {
        NAME
    }

    fn fetch(&self, options: FetchOptions) -> BoxFuture<'_, SourceResult<FetchResult>> {
        Box::pin(async move {
            let appointments = self.load().await?;
            let selected = select_for_window(appointments, &options.time_window);
            Ok(FetchResult::with_appointments(selected))
        })
    }
}
