//! CalendarSource trait and appointment sources.
//!
//! - [`CalendarSource`] - The trait every appointment source implements
//! - [`select_for_window`] - The selection rule shared by all sources
//! - [`SnapshotSource`] - Appointments from a JSON snapshot file
//! - [`StaticSource`] / [`ErrorSource`] - Fixed lists and failing stand-ins
//! - [`SourceError`] - Error types for source operations
//!
//! ```ignore
//! use icsbridge_providers::{CalendarSource, FetchOptions, SnapshotSource};
//!
//! let source = SnapshotSource::new("/var/lib/icsbridge/snapshot.json");
//! let result = source.fetch(FetchOptions::new(window)).await?;
//! ```

pub mod error;
pub mod snapshot;
pub mod source;

pub use error::{SourceError, SourceErrorCode, SourceResult};
pub use snapshot::SnapshotSource;
pub use source::{
    BoxFuture, CalendarSource, ErrorSource, FetchOptions, FetchResult, StaticSource,
    select_for_window,
};
