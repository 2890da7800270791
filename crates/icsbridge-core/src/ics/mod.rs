//! iCalendar export.
//!
//! Leaf-first:
//! - [`rrule`]: recurrence pattern to `RRULE` value
//! - [`timezone`]: zone name resolution and `VTIMEZONE` blocks
//! - [`text`]: escaping, folding, line endings
//! - [`event`]: one appointment (and its exceptions) to `VEVENT` blocks
//! - [`document`]: the whole `VCALENDAR` document
//! - [`output`]: atomic replacement of the destination file

pub mod document;
pub mod event;
pub mod output;
pub mod rrule;
pub mod text;
pub mod timezone;


pub use document::{
    DEFAULT_PRODUCT_ID, DEFAULT_REGION, DocumentOptions, DocumentWriter, ExportReport,
    RenderedDocument,
};
pub use event::{EventSerializer, SerializedEvent, SkipPhase, SkippedOccurrence, UidStrategy};
pub use output::{DestinationGuard, check_writable, destination_lock, write_atomic};
pub use rrule::encode as encode_rrule;
pub use text::{CRLF, escape_text, fold_line};
pub use timezone::{TimezoneDefinition, WindowsZoneTable, ZoneResolver};
