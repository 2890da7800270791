//! Whole-document rendering and writing.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::appointment::AppointmentRecord;
use crate::error::ExportResult;
use crate::ics::event::{EventSerializer, SkippedOccurrence, UidStrategy};
use crate::ics::output::{self, DestinationGuard};
use crate::ics::text::{CRLF, push_line};
use crate::ics::timezone::{TimezoneDefinition, ZoneResolver};

/// Product identifier written when none is configured.
pub const DEFAULT_PRODUCT_ID: &str = "-//Microsoft Corporation//Outlook 16.0 MIMEDIR//EN";

/// Region hint used when none is configured.
pub const DEFAULT_REGION: &str = "NL";

/// Document-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// `PRODID` value.
    pub product_id: String,
    /// `VTIMEZONE` blocks, in order. The first one names `X-WR-TIMEZONE`.
    pub declared_zones: Vec<TimezoneDefinition>,
    pub uid_strategy: UidStrategy,
    /// Region hint passed to the zone resolver.
    pub region: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            declared_zones: vec![TimezoneDefinition::europe_amsterdam()],
            uid_strategy: UidStrategy::SharedMaster,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl DocumentOptions {
    /// Builder method to set the product identifier.
    #[must_use]
    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = product_id.into();
        self
    }

    /// Builder method to replace the declared zones.
    #[must_use]
    pub fn with_declared_zones(mut self, zones: Vec<TimezoneDefinition>) -> Self {
        self.declared_zones = zones;
        self
    }

    /// Builder method to set the override identifier strategy.
    #[must_use]
    pub fn with_uid_strategy(mut self, strategy: UidStrategy) -> Self {
        self.uid_strategy = strategy;
        self
    }

    /// Builder method to set the region hint.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

/// Summary of one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Destination, when the document was written to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Size of the document in bytes.
    pub bytes: usize,
    /// Number of top-level appointments.
    pub appointments: usize,
    /// Number of `VEVENT` blocks, overrides included.
    pub event_blocks: usize,
    /// Exceptions left out of the document.
    pub skipped: Vec<SkippedOccurrence>,
}

/// A rendered document and its report.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub text: String,
    pub report: ExportReport,
}

/// Assembles `VCALENDAR` documents.
pub struct DocumentWriter<'a> {
    resolver: &'a dyn ZoneResolver,
    options: DocumentOptions,
}

impl<'a> DocumentWriter<'a> {
    pub fn new(resolver: &'a dyn ZoneResolver, options: DocumentOptions) -> Self {
        Self { resolver, options }
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    /// Renders the document for `appointments`, in the given order.
    ///
    /// `created` stamps every event block of the run.
    ///
    /// # Errors
    ///
    /// Fails when any top-level appointment is invalid or has an unknown
    /// zone; nothing is rendered in that case.
    pub fn render(
        &self,
        appointments: &[AppointmentRecord],
        calendar_name: &str,
        created: DateTime<Utc>,
    ) -> ExportResult<RenderedDocument> {
        let serializer = EventSerializer::new(self.resolver, self.options.region.clone())
            .with_uid_strategy(self.options.uid_strategy);

        let mut text = String::new();
        push_line(&mut text, "BEGIN:VCALENDAR");
        push_line(&mut text, "VERSION:2.0");
        push_line(&mut text, &format!("PRODID:{}", self.options.product_id));
        push_line(&mut text, "METHOD:PUBLISH");
        push_line(&mut text, &format!("X-WR-CALNAME:{}", calendar_name));
        if let Some(zone) = self.options.declared_zones.first() {
            push_line(&mut text, &format!("X-WR-TIMEZONE:{}", zone.tzid));
        }
        for zone in &self.options.declared_zones {
            for line in zone.lines() {
                push_line(&mut text, &line);
            }
        }

        let mut report = ExportReport {
            appointments: appointments.len(),
            ..ExportReport::default()
        };

        for record in appointments {
            let event = serializer.serialize(record, created, false, true)?;
            for line in &event.lines {
                // Already folded by the serializer.
                text.push_str(line);
                text.push_str(CRLF);
            }
            report.event_blocks += event.blocks;
            report.skipped.extend(event.skipped);
        }

        push_line(&mut text, "END:VCALENDAR");
        report.bytes = text.len();

        debug!(
            appointments = report.appointments,
            event_blocks = report.event_blocks,
            skipped = report.skipped.len(),
            "rendered calendar"
        );
        Ok(RenderedDocument { text, report })
    }

    /// Renders and atomically replaces the file owned by `destination`.
    ///
    /// Taking the guard keeps concurrent runs against the same path in this
    /// process from interleaving. On failure the previous file is left as it
    /// was.
    ///
    /// # Errors
    ///
    /// Returns the render error, or [`ExportError::Io`](crate::ExportError::Io)
    /// when the destination cannot be written.
    #[instrument(skip_all, fields(path = %destination.path().display(), count = appointments.len()))]
    pub fn write(
        &self,
        appointments: &[AppointmentRecord],
        calendar_name: &str,
        destination: &DestinationGuard,
        created: DateTime<Utc>,
    ) -> ExportResult<ExportReport> {
        let path = destination.path();
        let rendered = self.render(appointments, calendar_name, created)?;
        output::write_atomic(path, rendered.text.as_bytes())?;

        let mut report = rendered.report;
        report.path = Some(path.to_path_buf());
        info!(
            bytes = report.bytes,
            event_blocks = report.event_blocks,
            skipped = report.skipped.len(),
            "calendar written"
        );
        Ok(report)
    }
}
