//! Export job error types.

use std::path::PathBuf;

use icsbridge_core::ExportError;
use icsbridge_providers::SourceError;
use thiserror::Error;

/// Result type for export jobs.
pub type JobResult<T> = Result<T, JobError>;

/// Errors that can end an export run.
#[derive(Debug, Error)]
pub enum JobError {
    /// The appointment source failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Rendering or writing the document failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// The destination directory does not accept new files.
    #[error("Destination not writable: {}", path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: ExportError,
    },

    /// The blocking write task panicked or was cancelled.
    #[error("Export task failed: {message}")]
    Task { message: String },
}

impl JobError {
    /// Creates a not-writable error.
    pub fn not_writable(path: impl Into<PathBuf>, source: ExportError) -> Self {
        Self::NotWritable {
            path: path.into(),
            source,
        }
    }

    /// Creates a task error.
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    /// Returns true if the next scheduled run may succeed on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source(err) => err.is_retryable(),
            Self::Export(ExportError::Io { .. }) | Self::NotWritable { .. } | Self::Task { .. } => {
                true
            }
            Self::Export(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_zone_is_not_retryable() {
        let err = JobError::from(ExportError::unknown_zone("Mars Standard Time", "NL"));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Mars Standard Time"));
    }

    #[test]
    fn not_writable_names_path() {
        let cause = ExportError::io(
            "/nope/calendar.ics",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let err = JobError::not_writable("/nope/calendar.ics", cause);
        assert_eq!(err.to_string(), "Destination not writable: /nope/calendar.ics");
        assert!(err.is_retryable());
    }
}
