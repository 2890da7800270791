//! The `CalendarSource` trait and window selection.
//!
//! A source hands one export run the appointments it should render. The
//! selection rule is the same for every source and lives in
//! [`select_for_window`]:
//! - single appointments whose start lies strictly inside the window
//! - recurring masters whose series overlaps the window, each once

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use icsbridge_core::{AppointmentRecord, TimeWindow};
use tracing::debug;

use crate::error::{SourceError, SourceResult};

/// A boxed future for async trait methods.
///
/// Keeps [`CalendarSource`] object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Options for one fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Range of appointments to return.
    pub time_window: TimeWindow,
}

impl FetchOptions {
    pub fn new(time_window: TimeWindow) -> Self {
        Self { time_window }
    }
}

/// The appointments returned by a fetch, in source order.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub appointments: Vec<AppointmentRecord>,
}

impl FetchResult {
    pub fn with_appointments(appointments: Vec<AppointmentRecord>) -> Self {
        Self { appointments }
    }
}

/// Supplies appointments to export runs.
///
/// Implementations must be `Send + Sync`; the scheduler holds them behind an
/// `Arc` and fetches from a Tokio task.
pub trait CalendarSource: Send + Sync {
    /// Short name used in logs and errors (e.g. "snapshot").
    fn name(&self) -> &str;

    /// Fetches the appointments selected for `options.time_window`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when the calendar host cannot be read.
    fn fetch(&self, options: FetchOptions) -> BoxFuture<'_, SourceResult<FetchResult>>;
}

/// Applies the window selection rule to a list of appointments.
///
/// Non-recurring appointments are kept when their start lies strictly
/// between the window bounds. A recurring master is kept when its pattern
/// starts before the window end and either has no end date or ends after the
/// window start; a master listed twice is kept once.
pub fn select_for_window(
    appointments: impl IntoIterator<Item = AppointmentRecord>,
    window: &TimeWindow,
) -> Vec<AppointmentRecord> {
    let mut seen_masters = HashSet::new();
    let mut selected = Vec::new();

    for record in appointments {
        let keep = match record.recurrence {
            None => window.contains_strictly(record.start.utc),
            Some(ref pattern) => {
                let starts_in_time = window.date_precedes_end(pattern.start_date);
                let still_running = pattern
                    .effective_end_date()
                    .is_none_or(|end| window.date_follows_start(end));
                starts_in_time && still_running && seen_masters.insert(record.uid.clone())
            }
        };

        if keep {
            selected.push(record);
        } else {
            debug!(uid = %record.uid, "appointment outside window");
        }
    }

    selected
}

/// A source serving a fixed list of appointments.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    appointments: Vec<AppointmentRecord>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, appointments: Vec<AppointmentRecord>) -> Self {
        Self {
            name: name.into(),
            appointments,
        }
    }
}

impl CalendarSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, options: FetchOptions) -> BoxFuture<'_, SourceResult<FetchResult>> {
        let appointments = select_for_window(self.appointments.iter().cloned(), &options.time_window);
        Box::pin(async move { Ok(FetchResult::with_appointments(appointments)) })
    }
}

/// A source that always fails.
///
/// Stands in for a source that could not be set up.
#[derive(Debug)]
pub struct ErrorSource {
    name: String,
    error: SourceError,
}

impl ErrorSource {
    pub fn new(name: impl Into<String>, error: SourceError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

impl CalendarSource for ErrorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, _options: FetchOptions) -> BoxFuture<'_, SourceResult<FetchResult>> {
        let error =
            SourceError::new(self.error.code(), self.error.message()).with_source_name(&self.name);
        Box::pin(async move { Err(error) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorCode;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use icsbridge_core::{Frequency, Organizer, RecurrenceEnd, RecurrencePattern, ZonedTime};

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn single(uid: &str, start: DateTime<Utc>) -> AppointmentRecord {
        AppointmentRecord::new(
            uid,
            uid,
            Organizer::new("Ada", "ada@example.com"),
            ZonedTime::from_utc(start),
            ZonedTime::from_utc(start + chrono::Duration::hours(1)),
        )
    }

    fn series(uid: &str, start: NaiveDate, end: Option<NaiveDate>) -> AppointmentRecord {
        let end_condition = match end {
            Some(_) => RecurrenceEnd::Count(10),
            None => RecurrenceEnd::NoEnd,
        };
        single(uid, start.and_hms_opt(9, 0, 0).unwrap().and_utc()).with_recurrence(
            RecurrencePattern::new(Frequency::Weekly, start).with_end(end_condition, end),
        )
    }

    /// [2025-01-06, 2025-05-06)
    fn window() -> TimeWindow {
        TimeWindow::new(utc(2025, 1, 6, 0), utc(2025, 5, 6, 0))
    }

    fn uids(records: &[AppointmentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.uid.as_str()).collect()
    }

    #[test]
    fn singles_must_start_strictly_inside() {
        let selected = select_for_window(
            vec![
                single("at-start", utc(2025, 1, 6, 0)),
                single("inside", utc(2025, 2, 5, 10)),
                single("before", utc(2024, 12, 31, 10)),
                single("at-end", utc(2025, 5, 6, 0)),
            ],
            &window(),
        );
        assert_eq!(uids(&selected), vec!["inside"]);
    }

    #[test]
    fn series_overlapping_window_is_kept_once() {
        let selected = select_for_window(
            vec![
                series("open-ended", date(2020, 1, 6), None),
                series("ended-early", date(2024, 1, 1), Some(date(2024, 6, 1))),
                series("starts-later", date(2025, 6, 1), None),
                series("ends-inside", date(2024, 11, 4), Some(date(2025, 2, 3))),
                series("open-ended", date(2020, 1, 6), None),
            ],
            &window(),
        );
        assert_eq!(uids(&selected), vec!["open-ended", "ends-inside"]);
    }

    #[test]
    fn no_end_ignores_stale_end_date() {
        let mut record = series("stale", date(2024, 1, 1), None);
        if let Some(ref mut pattern) = record.recurrence {
            pattern.end_date = Some(date(2024, 2, 1));
        }
        let selected = select_for_window(vec![record], &window());
        assert_eq!(uids(&selected), vec!["stale"]);
    }

    #[tokio::test]
    async fn static_source_applies_window() {
        let source = StaticSource::new(
            "static",
            vec![
                single("inside", utc(2025, 2, 5, 10)),
                single("outside", utc(2026, 1, 1, 10)),
            ],
        );
        assert_eq!(source.name(), "static");

        let result = source.fetch(FetchOptions::new(window())).await.unwrap();
        assert_eq!(uids(&result.appointments), vec!["inside"]);
    }

    #[tokio::test]
    async fn error_source_returns_error() {
        let source = ErrorSource::new("host", SourceError::unavailable("calendar host not running"));
        let err = source.fetch(FetchOptions::new(window())).await.unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::Unavailable);
        assert_eq!(err.source_name(), Some("host"));
    }
}
