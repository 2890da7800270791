//! One export run: fetch, pre-check, render and replace.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use icsbridge_core::ics::{DestinationGuard, check_writable};
use icsbridge_core::{DocumentOptions, DocumentWriter, ExportReport, TimeWindow, ZoneResolver};
use icsbridge_providers::{CalendarSource, FetchOptions};
use tracing::{debug, info, instrument};

use crate::error::{JobError, JobResult};

/// Days before and after today covered by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportWindow {
    pub lookbehind_days: u32,
    pub lookahead_days: u32,
}

impl Default for ExportWindow {
    fn default() -> Self {
        Self {
            lookbehind_days: 30,
            lookahead_days: 90,
        }
    }
}

impl ExportWindow {
    /// The window around `today`, from local midnight to local midnight.
    pub fn around(&self, today: NaiveDate) -> TimeWindow {
        TimeWindow::around_date(today, &Local, self.lookbehind_days, self.lookahead_days)
    }
}

/// Path of the calendar file `<directory>/<name>.ics`.
pub fn destination_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{}.ics", name))
}

/// Everything needed to export one calendar file.
pub struct ExportJob {
    source: Arc<dyn CalendarSource>,
    resolver: Arc<dyn ZoneResolver>,
    options: DocumentOptions,
    destination: PathBuf,
    calendar_name: String,
    window: ExportWindow,
}

impl ExportJob {
    pub fn new(
        source: Arc<dyn CalendarSource>,
        resolver: Arc<dyn ZoneResolver>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            resolver,
            options: DocumentOptions::default(),
            destination: destination.into(),
            calendar_name: "Calendar".to_string(),
            window: ExportWindow::default(),
        }
    }

    /// Builder method to set the document options.
    #[must_use]
    pub fn with_options(mut self, options: DocumentOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder method to set the `X-WR-CALNAME` value.
    #[must_use]
    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self
    }

    /// Builder method to set the window.
    #[must_use]
    pub fn with_window(mut self, window: ExportWindow) -> Self {
        self.window = window;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Checks that the destination directory accepts new files.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotWritable`] otherwise.
    pub fn check_destination(&self) -> JobResult<()> {
        check_writable(&self.destination)
            .map_err(|source| JobError::not_writable(&self.destination, source))
    }

    /// Runs one export for the window around today.
    pub async fn run_once(&self) -> JobResult<ExportReport> {
        self.run_for(Local::now().date_naive()).await
    }

    /// Runs one export for the window around `today`.
    ///
    /// The destination stays locked from the pre-check until the file is
    /// replaced, so overlapping runs on one path finish in the order they
    /// started.
    ///
    /// # Errors
    ///
    /// Fails before touching the destination when it is not writable, the
    /// source fails, or a top-level appointment cannot be rendered.
    #[instrument(skip(self), fields(source = self.source.name(), path = %self.destination.display()))]
    pub async fn run_for(&self, today: NaiveDate) -> JobResult<ExportReport> {
        let destination = DestinationGuard::acquire(&self.destination).await;
        self.check_destination()?;

        let window = self.window.around(today);
        debug!(start = %window.start, end = %window.end, "fetching appointments");
        let fetched = self.source.fetch(FetchOptions::new(window)).await?;

        let resolver = Arc::clone(&self.resolver);
        let options = self.options.clone();
        let calendar_name = self.calendar_name.clone();
        let appointments = fetched.appointments;

        let report = tokio::task::spawn_blocking(move || {
            DocumentWriter::new(resolver.as_ref(), options).write(
                &appointments,
                &calendar_name,
                &destination,
                Utc::now(),
            )
        })
        .await
        .map_err(|e| JobError::task(e.to_string()))??;

        info!(
            appointments = report.appointments,
            event_blocks = report.event_blocks,
            skipped = report.skipped.len(),
            "export finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use icsbridge_core::{
        AppointmentRecord, ExportError, Frequency, Organizer, RecurrenceException,
        RecurrencePattern, WindowsZoneTable, ZonedTime,
    };
    use icsbridge_providers::{
        BoxFuture, ErrorSource, FetchResult, SourceError, SourceResult, StaticSource,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 5).unwrap()
    }

    fn appointment(uid: &str, zone: &str) -> AppointmentRecord {
        let start = Utc.from_utc_datetime(&today().and_hms_opt(10, 0, 0).unwrap());
        let end = start + chrono::Duration::hours(1);
        AppointmentRecord::new(
            uid,
            "Review",
            Organizer::new("Ada", "ada@example.com"),
            ZonedTime::new(start, start.naive_utc(), zone),
            ZonedTime::new(end, end.naive_utc(), zone),
        )
    }

    fn job(source: Arc<dyn CalendarSource>, destination: PathBuf) -> ExportJob {
        ExportJob::new(source, Arc::new(WindowsZoneTable::new()), destination)
            .with_calendar_name("Work")
    }

    #[test]
    fn destination_is_name_dot_ics() {
        assert_eq!(
            destination_path(Path::new("/srv/calendars"), "work"),
            PathBuf::from("/srv/calendars/work.ics")
        );
    }

    #[test]
    fn default_window_is_thirty_back_ninety_ahead() {
        let window = ExportWindow::default().around(today());
        let local_date = |dt: chrono::DateTime<Utc>| dt.with_timezone(&Local).date_naive();
        assert_eq!(local_date(window.start), NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        assert_eq!(local_date(window.end), NaiveDate::from_ymd_opt(2025, 5, 6).unwrap());
    }

    #[tokio::test]
    async fn run_writes_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let path = destination_path(dir.path(), "work");

        let series = appointment("series", "UTC")
            .with_recurrence(RecurrencePattern::new(Frequency::Daily, today()))
            .with_exception(RecurrenceException::deleted(
                today().and_hms_opt(10, 0, 0).unwrap(),
            ));
        let source = Arc::new(StaticSource::new(
            "static",
            vec![appointment("single", "W. Europe Standard Time"), series],
        ));

        let report = job(source, path.clone()).run_for(today()).await.unwrap();

        assert_eq!(report.appointments, 2);
        assert_eq!(report.event_blocks, 2);
        assert_eq!(report.skipped.len(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("X-WR-CALNAME:Work\r\n"));
        assert!(text.contains("UID:single\r\n"));
    }

    #[tokio::test]
    async fn source_failure_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = destination_path(dir.path(), "work");
        std::fs::write(&path, "previous").unwrap();

        let source = Arc::new(ErrorSource::new("host", SourceError::unavailable("offline")));
        let err = job(source, path.clone()).run_for(today()).await.unwrap_err();

        assert!(matches!(err, JobError::Source(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
    }

    #[tokio::test]
    async fn unknown_zone_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = destination_path(dir.path(), "work");
        std::fs::write(&path, "previous").unwrap();

        let source = Arc::new(StaticSource::new(
            "static",
            vec![appointment("lost", "Mars Standard Time")],
        ));
        let err = job(source, path.clone()).run_for(today()).await.unwrap_err();

        assert!(matches!(err, JobError::Export(ExportError::UnknownZone { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
    }

    /// Serves `older` slowly on the first fetch and `newer` at once after.
    struct SlowFirstFetch {
        calls: AtomicU32,
    }

    impl CalendarSource for SlowFirstFetch {
        fn name(&self) -> &str {
            "slow-first"
        }

        fn fetch(&self, _options: FetchOptions) -> BoxFuture<'_, SourceResult<FetchResult>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                let uid = if call == 0 {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    "older"
                } else {
                    "newer"
                };
                Ok(FetchResult::with_appointments(vec![appointment(uid, "UTC")]))
            })
        }
    }

    #[tokio::test]
    async fn overlapping_runs_keep_start_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = destination_path(dir.path(), "work");
        let source = Arc::new(SlowFirstFetch {
            calls: AtomicU32::new(0),
        });
        let job = job(source, path.clone());

        let first = job.run_for(today());
        let second = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            job.run_for(today()).await
        };
        let (first, second) = tokio::join!(first, second);
        first.unwrap();
        second.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("UID:newer\r\n"));
        assert!(!text.contains("UID:older"));
    }

    #[tokio::test]
    async fn missing_directory_fails_pre_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = destination_path(&dir.path().join("missing"), "work");

        let source = Arc::new(StaticSource::new("static", Vec::new()));
        let err = job(source, path).run_for(today()).await.unwrap_err();
        assert!(matches!(err, JobError::NotWritable { .. }));
    }
}
