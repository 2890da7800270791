//! Export runner: one-shot jobs and the periodic scheduler.
//!
//! This crate wires an appointment source to the document writer:
//! - [`ExportJob`] runs one fetch, write pre-check, render and replace
//! - [`Scheduler`] repeats exports on an interval with backoff on failure
//! - [`ChangeNotifier`] shows a desktop notification after each run
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use icsbridge_core::WindowsZoneTable;
//! use icsbridge_providers::SnapshotSource;
//! use icsbridge_server::{ExportJob, destination_path};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = ExportJob::new(
//!         Arc::new(SnapshotSource::new("/var/lib/icsbridge/snapshot.json")),
//!         Arc::new(WindowsZoneTable::new()),
//!         destination_path("/srv/calendars".as_ref(), "work"),
//!     );
//!     let report = job.run_once().await?;
//!     println!("{} events", report.event_blocks);
//!     Ok(())
//! }
//! ```

mod error;
mod job;
mod notify;
mod scheduler;

pub use error::{JobError, JobResult};
pub use job::{ExportJob, ExportWindow, destination_path};
pub use notify::{ChangeNotifier, Notice, NotifyConfig};
pub use scheduler::{
    Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState,
    SharedSchedulerState,
};
