//! Core types and the iCalendar export engine: appointments, recurrence
//! rules, folding, atomic output

pub mod appointment;
pub mod error;
pub mod ics;
pub mod time;
pub mod tracing;

pub use appointment::{
    AppointmentRecord, Attendee, AttendeeRole, DaySet, Frequency, Importance, Organizer,
    RecurrenceEnd, RecurrenceException, RecurrencePattern, ResponseStatus, Sensitivity,
};
pub use error::{ExportError, ExportResult};
pub use ics::{
    DocumentOptions, DocumentWriter, EventSerializer, ExportReport, SkippedOccurrence,
    TimezoneDefinition, UidStrategy, WindowsZoneTable, ZoneResolver,
};
pub use time::{TimeWindow, ZonedTime};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
