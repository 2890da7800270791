//! Export error types.

use std::io;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that can occur while rendering or writing a calendar document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The destination could not be written or replaced.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A single occurrence of a series could not be rendered.
    #[error("occurrence {original_start} of {uid} skipped: {reason}")]
    Occurrence {
        uid: String,
        original_start: NaiveDateTime,
        reason: String,
    },

    /// No canonical name is known for a zone identifier.
    #[error("unknown time zone `{zone_id}` (region {region})")]
    UnknownZone { zone_id: String, region: String },

    /// A record violates the model invariants.
    #[error("invalid appointment {uid}: {reason}")]
    InvalidRecord { uid: String, reason: String },
}

impl ExportError {
    /// Creates an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a per-occurrence error.
    pub fn occurrence(
        uid: impl Into<String>,
        original_start: NaiveDateTime,
        reason: impl Into<String>,
    ) -> Self {
        Self::Occurrence {
            uid: uid.into(),
            original_start,
            reason: reason.into(),
        }
    }

    /// Creates an unknown zone error.
    pub fn unknown_zone(zone_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self::UnknownZone {
            zone_id: zone_id.into(),
            region: region.into(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record(uid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            uid: uid.into(),
            reason: reason.into(),
        }
    }
}
