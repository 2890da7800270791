//! `VEVENT` serialization.
//!
//! [`EventSerializer`] renders one appointment as a block of content lines in
//! a fixed field order. A recurring master is followed by one override block
//! per exception; exceptions that cannot be rendered are reported as
//! [`SkippedOccurrence`] values instead of failing the master.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::appointment::{
    AppointmentRecord, Attendee, AttendeeRole, Importance, RecurrenceException, ResponseStatus,
    Sensitivity,
};
use crate::error::{ExportError, ExportResult};
use crate::ics::rrule::{self, UTC_STAMP_FORMAT};
use crate::ics::text::{escape_text, fold_line};
use crate::ics::timezone::ZoneResolver;
use crate::time::ZonedTime;

const LOCAL_STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";
const DATE_FORMAT: &str = "%Y%m%d";

/// How override blocks are identified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UidStrategy {
    /// Overrides reuse the master's identifier verbatim.
    #[default]
    SharedMaster,
    /// Overrides get `<master uid>-<original start>`.
    DistinctOccurrence,
}

/// Where a skipped occurrence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPhase {
    /// The host could not supply the occurrence.
    Materialize,
    /// The occurrence violates the model invariants.
    Validate,
    /// A field of the occurrence could not be rendered.
    Serialize,
}

impl SkipPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Materialize => "materialize",
            Self::Validate => "validate",
            Self::Serialize => "serialize",
        }
    }
}

impl fmt::Display for SkipPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic for an exception left out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedOccurrence {
    pub master_uid: String,
    pub original_start: NaiveDateTime,
    pub phase: SkipPhase,
    pub reason: String,
}

impl fmt::Display for SkippedOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({}): {}",
            self.master_uid, self.original_start, self.phase, self.reason
        )
    }
}

/// The rendered blocks of one top-level appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedEvent {
    /// Folded content lines, without terminators.
    pub lines: Vec<String>,
    /// Number of `VEVENT` blocks in `lines`.
    pub blocks: usize,
    pub skipped: Vec<SkippedOccurrence>,
}

/// Renders appointments as `VEVENT` blocks.
pub struct EventSerializer<'a> {
    resolver: &'a dyn ZoneResolver,
    region: String,
    uid_strategy: UidStrategy,
}

impl<'a> EventSerializer<'a> {
    /// Creates a serializer resolving zones through `resolver` with the given
    /// region hint.
    pub fn new(resolver: &'a dyn ZoneResolver, region: impl Into<String>) -> Self {
        Self {
            resolver,
            region: region.into(),
            uid_strategy: UidStrategy::SharedMaster,
        }
    }

    /// Builder method to set the override identifier strategy.
    #[must_use]
    pub fn with_uid_strategy(mut self, strategy: UidStrategy) -> Self {
        self.uid_strategy = strategy;
        self
    }

    /// Serializes one appointment.
    ///
    /// With `expand_recurrence`, a recurring record gets its `RRULE` line and
    /// is followed by its exceptions, each serialized with `is_override` and
    /// without expansion. `created` is shared by every block of the run.
    ///
    /// # Errors
    ///
    /// Fails when the record itself is invalid or its zone cannot be
    /// resolved. Failing exceptions never fail the call.
    pub fn serialize(
        &self,
        record: &AppointmentRecord,
        created: DateTime<Utc>,
        is_override: bool,
        expand_recurrence: bool,
    ) -> ExportResult<SerializedEvent> {
        let mut event = SerializedEvent::default();
        self.emit(record, &record.uid, created, is_override, expand_recurrence, &mut event)?;
        Ok(event)
    }

    fn emit(
        &self,
        record: &AppointmentRecord,
        uid: &str,
        created: DateTime<Utc>,
        is_override: bool,
        expand_recurrence: bool,
        out: &mut SerializedEvent,
    ) -> ExportResult<()> {
        record.validate()?;

        let block = self.block(record, uid, created, is_override, expand_recurrence)?;
        out.lines.extend(block);
        out.blocks += 1;
        debug!(uid = %uid, is_override, "serialized event");

        if expand_recurrence && record.is_recurring() {
            for exception in &record.exceptions {
                self.emit_override(record, exception, created, out);
            }
        }
        Ok(())
    }

    fn emit_override(
        &self,
        master: &AppointmentRecord,
        exception: &RecurrenceException,
        created: DateTime<Utc>,
        out: &mut SerializedEvent,
    ) {
        let uid = self.override_uid(&master.uid, exception.original_start);
        let result = exception.resolve(&master.uid).and_then(|occurrence| {
            let mut scratch = SerializedEvent::default();
            self.emit(occurrence, &uid, created, true, false, &mut scratch)
                .map(|()| scratch)
        });

        match result {
            Ok(scratch) => {
                out.lines.extend(scratch.lines);
                out.blocks += scratch.blocks;
            }
            Err(err) => {
                let skipped = SkippedOccurrence {
                    master_uid: master.uid.clone(),
                    original_start: exception.original_start,
                    phase: skip_phase(&err),
                    reason: err.to_string(),
                };
                warn!(
                    uid = %skipped.master_uid,
                    original_start = %skipped.original_start,
                    phase = %skipped.phase,
                    error = %err,
                    "skipping occurrence"
                );
                out.skipped.push(skipped);
            }
        }
    }

    fn override_uid(&self, master_uid: &str, original_start: NaiveDateTime) -> String {
        match self.uid_strategy {
            UidStrategy::SharedMaster => master_uid.to_string(),
            UidStrategy::DistinctOccurrence => {
                format!("{}-{}", master_uid, original_start.format(LOCAL_STAMP_FORMAT))
            }
        }
    }

    fn block(
        &self,
        record: &AppointmentRecord,
        uid: &str,
        created: DateTime<Utc>,
        is_override: bool,
        expand_recurrence: bool,
    ) -> ExportResult<Vec<String>> {
        let mut fields = Vec::with_capacity(16 + record.attendees.len());

        fields.push("BEGIN:VEVENT".to_string());
        fields.push(format!("CREATED:{}", created.format(UTC_STAMP_FORMAT)));
        fields.push(
            if is_override {
                "TRANSP:TRANSPARENT"
            } else {
                "TRANSP:OPAQUE"
            }
            .to_string(),
        );
        fields.push(format!("DESCRIPTION:{}\\n", escape_text(&record.body)));
        fields.push(format!("SUMMARY:{}", escape_text(&record.subject)));
        fields.push(format!("UID:{}", uid));
        fields.push(format!(
            "ORGANIZER;CN=\"{}\":mailto:{}",
            record.organizer.name, record.organizer.address
        ));

        if record.attendees.len() > 1 {
            for attendee in &record.attendees {
                fields.push(attendee_line(attendee, record.response_requested));
            }
        }

        if !record.location.is_empty() {
            fields.push(format!("LOCATION:{}", escape_text(&record.location)));
        }

        fields.push(format!("PRIORITY:{}", priority(record.importance)));
        fields.push(format!("CLASS:{}", class(record.sensitivity)));

        if record.all_day {
            fields.push(format!("DTSTART;VALUE=DATE:{}", record.start.date().format(DATE_FORMAT)));
            fields.push(format!("DTEND;VALUE=DATE:{}", record.end.date().format(DATE_FORMAT)));
        } else {
            fields.push(format!("DTSTART;{}", self.zoned(&record.start)?));
            fields.push(format!("DTEND;{}", self.zoned(&record.end)?));
        }

        fields.push(format!(
            "LAST-MODIFIED:{}",
            record.last_modified.format(UTC_STAMP_FORMAT)
        ));
        fields.push(format!("DTSTAMP:{}", record.created.format(UTC_STAMP_FORMAT)));

        match record.recurrence {
            Some(ref pattern) if expand_recurrence => {
                fields.push(format!("RRULE:{}", rrule::encode(pattern)));
            }
            _ => {}
        }

        fields.push("END:VEVENT".to_string());

        Ok(fields.iter().map(|line| fold_line(line)).collect())
    }

    fn zoned(&self, time: &ZonedTime) -> ExportResult<String> {
        let zone = self.resolver.resolve(&time.zone_id, &self.region)?;
        Ok(format!("TZID={}:{}", zone, time.local.format(LOCAL_STAMP_FORMAT)))
    }
}

fn skip_phase(err: &ExportError) -> SkipPhase {
    match err {
        ExportError::Occurrence { .. } => SkipPhase::Materialize,
        ExportError::InvalidRecord { .. } => SkipPhase::Validate,
        ExportError::UnknownZone { .. } | ExportError::Io { .. } => SkipPhase::Serialize,
    }
}

fn attendee_line(attendee: &Attendee, response_requested: bool) -> String {
    let mut line = format!("ATTENDEE;CN=\"{}\"", attendee.name);
    if let Some(role) = attendee.role {
        line.push_str(";ROLE=");
        line.push_str(role_token(role));
    }
    if response_requested {
        line.push_str(";RSVP=TRUE");
    }
    if let Some(status) = partstat(attendee.status) {
        line.push_str(";PARTSTAT=");
        line.push_str(status);
    }
    line.push_str(":mailto:");
    line.push_str(&attendee.address);
    line
}

fn role_token(role: AttendeeRole) -> &'static str {
    match role {
        AttendeeRole::Optional => "OPT-PARTICIPANT",
        AttendeeRole::Required => "REQ-PARTICIPANT",
        AttendeeRole::Organizer => "CHAIR",
        AttendeeRole::Resource => "NON-PARTICIPANT",
    }
}

fn partstat(status: ResponseStatus) -> Option<&'static str> {
    match status {
        ResponseStatus::None => None,
        ResponseStatus::Accepted | ResponseStatus::Organized => Some("ACCEPTED"),
        ResponseStatus::Declined => Some("DECLINED"),
        ResponseStatus::NotResponded => Some("NEEDS-ACTION"),
        ResponseStatus::Tentative => Some("TENTATIVE"),
    }
}

fn priority(importance: Importance) -> u8 {
    match importance {
        Importance::High => 1,
        Importance::Normal => 5,
        Importance::Low => 6,
    }
}

fn class(sensitivity: Sensitivity) -> &'static str {
    match sensitivity {
        Sensitivity::Normal => "PUBLIC",
        Sensitivity::Confidential => "CONFIDENTIAL",
        Sensitivity::Private | Sensitivity::Personal => "PRIVATE",
    }
}
