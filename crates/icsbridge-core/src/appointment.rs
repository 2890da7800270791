//! Appointment types supplied by the calendar host.
//!
//! This module provides the read-only inputs of an export run:
//! - [`AppointmentRecord`]: one appointment or one recurring series master
//! - [`RecurrencePattern`]: the host's description of how a series repeats
//! - [`RecurrenceException`]: one modified or cancelled occurrence of a series
//!
//! The types carry no rendering behavior; see [`crate::ics`] for that.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use crate::time::ZonedTime;

/// Importance of an appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    #[default]
    Normal,
    High,
}

/// Sensitivity of an appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    #[default]
    Normal,
    Confidential,
    Private,
    Personal,
}

/// The role of a meeting recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeRole {
    Optional,
    Required,
    Organizer,
    Resource,
}

/// A recipient's answer to a meeting request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// No response information is available.
    #[default]
    None,
    Accepted,
    Declined,
    NotResponded,
    /// The recipient organized the meeting.
    Organized,
    Tentative,
}

/// The organizer of an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    /// Display name.
    pub name: String,
    /// SMTP address.
    pub address: String,
}

impl Organizer {
    /// Creates an organizer.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// A recipient of an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Display name.
    pub name: String,
    /// SMTP address.
    pub address: String,
    /// Recipient role; `None` when the host reports none.
    #[serde(default)]
    pub role: Option<AttendeeRole>,
    /// The recipient's response.
    #[serde(default)]
    pub status: ResponseStatus,
}

impl Attendee {
    /// Creates an attendee with no role and no response.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            role: None,
            status: ResponseStatus::None,
        }
    }

    /// Builder method to set the role.
    pub fn with_role(mut self, role: AttendeeRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Builder method to set the response status.
    pub fn with_status(mut self, status: ResponseStatus) -> Self {
        self.status = status;
        self
    }
}

/// How often a series repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    /// The n-th weekday of every month.
    MonthlyNth,
    Yearly,
    /// The n-th weekday of a month every year. Not representable in the
    /// exported rule.
    YearlyNth,
}

/// When a series stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RecurrenceEnd {
    #[default]
    NoEnd,
    Until(DateTime<Utc>),
    Count(u32),
}

/// The host's recurrence descriptor for a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    /// Repeat every `interval` periods; always at least 1.
    pub interval: u32,
    /// Days of the week the series falls on.
    #[serde(default)]
    pub days: DaySet,
    #[serde(default)]
    pub end: RecurrenceEnd,
    /// Date of the first occurrence.
    pub start_date: NaiveDate,
    /// Date of the last occurrence; only meaningful when `end` is not
    /// [`RecurrenceEnd::NoEnd`].
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl RecurrencePattern {
    /// Creates an open-ended pattern repeating every period.
    pub fn new(frequency: Frequency, start_date: NaiveDate) -> Self {
        Self {
            frequency,
            interval: 1,
            days: DaySet::EMPTY,
            end: RecurrenceEnd::NoEnd,
            start_date,
            end_date: None,
        }
    }

    /// Builder method to set the interval.
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    /// Builder method to set the days of the week.
    pub fn with_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days = days.into_iter().collect();
        self
    }

    /// Builder method to set the end condition and the last occurrence date.
    pub fn with_end(mut self, end: RecurrenceEnd, end_date: Option<NaiveDate>) -> Self {
        self.end = end;
        self.end_date = end_date;
        self
    }

    /// The end date that bounds the series, if it has one.
    pub fn effective_end_date(&self) -> Option<NaiveDate> {
        match self.end {
            RecurrenceEnd::NoEnd => None,
            RecurrenceEnd::Until(_) | RecurrenceEnd::Count(_) => self.end_date,
        }
    }
}

/// One modified or cancelled occurrence of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceException {
    /// Start of the occurrence as the series originally scheduled it.
    pub original_start: NaiveDateTime,
    /// Whether the occurrence was deleted from the series.
    #[serde(default)]
    pub deleted: bool,
    /// The overriding appointment, when the host could materialize it.
    #[serde(default)]
    pub occurrence: Option<Box<AppointmentRecord>>,
}

impl RecurrenceException {
    /// Creates an exception carrying a materialized override.
    pub fn modified(original_start: NaiveDateTime, occurrence: AppointmentRecord) -> Self {
        Self {
            original_start,
            deleted: false,
            occurrence: Some(Box::new(occurrence)),
        }
    }

    /// Creates an exception for a deleted occurrence with nothing to render.
    pub fn deleted(original_start: NaiveDateTime) -> Self {
        Self {
            original_start,
            deleted: true,
            occurrence: None,
        }
    }

    /// Returns the overriding appointment, or a per-occurrence error when the
    /// host did not materialize one.
    pub fn resolve(&self, master_uid: &str) -> ExportResult<&AppointmentRecord> {
        match self.occurrence.as_deref() {
            Some(record) => Ok(record),
            None if self.deleted => Err(ExportError::occurrence(
                master_uid,
                self.original_start,
                "occurrence was deleted and cannot be materialized",
            )),
            None => Err(ExportError::occurrence(
                master_uid,
                self.original_start,
                "occurrence could not be materialized",
            )),
        }
    }
}

/// One appointment, or the master of a recurring series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    /// Identifier shared by every occurrence of a series.
    pub uid: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub location: String,
    pub organizer: Organizer,
    /// Recipients in host order, including the organizer.
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    /// Whether the organizer asked recipients to respond.
    #[serde(default)]
    pub response_requested: bool,
    pub start: ZonedTime,
    pub end: ZonedTime,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub sensitivity: Sensitivity,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Option<RecurrencePattern>,
    #[serde(default)]
    pub exceptions: Vec<RecurrenceException>,
}

impl AppointmentRecord {
    /// Creates a single appointment with defaults for everything optional.
    ///
    /// Timestamps default to the start instant.
    pub fn new(
        uid: impl Into<String>,
        subject: impl Into<String>,
        organizer: Organizer,
        start: ZonedTime,
        end: ZonedTime,
    ) -> Self {
        let stamp = start.utc;
        Self {
            uid: uid.into(),
            subject: subject.into(),
            body: String::new(),
            location: String::new(),
            organizer,
            attendees: Vec::new(),
            response_requested: false,
            start,
            end,
            all_day: false,
            importance: Importance::Normal,
            sensitivity: Sensitivity::Normal,
            created: stamp,
            last_modified: stamp,
            recurrence: None,
            exceptions: Vec::new(),
        }
    }

    /// Builder method to set the body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method to set the attendee list.
    pub fn with_attendees(mut self, attendees: Vec<Attendee>) -> Self {
        self.attendees = attendees;
        self
    }

    /// Builder method to request responses from attendees.
    pub fn with_response_requested(mut self, requested: bool) -> Self {
        self.response_requested = requested;
        self
    }

    /// Builder method to mark as an all-day appointment.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// Builder method to set the importance.
    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Builder method to set the sensitivity.
    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Builder method to set the creation and modification timestamps.
    pub fn with_timestamps(mut self, created: DateTime<Utc>, last_modified: DateTime<Utc>) -> Self {
        self.created = created;
        self.last_modified = last_modified;
        self
    }

    /// Builder method to make this appointment a series master.
    pub fn with_recurrence(mut self, pattern: RecurrencePattern) -> Self {
        self.recurrence = Some(pattern);
        self
    }

    /// Builder method to add an exception to the series.
    pub fn with_exception(mut self, exception: RecurrenceException) -> Self {
        self.exceptions.push(exception);
        self
    }

    /// Returns true if this appointment is the master of a series.
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Checks the model invariants.
    ///
    /// Timed appointments must start strictly before they end; all-day
    /// appointments must not end on a date before they start; a recurrence
    /// interval must be at least 1.
    pub fn validate(&self) -> ExportResult<()> {
        if self.all_day {
            if self.end.date() < self.start.date() {
                return Err(ExportError::invalid_record(
                    &self.uid,
                    "all-day appointment ends before it starts",
                ));
            }
        } else if self.start.utc >= self.end.utc {
            return Err(ExportError::invalid_record(
                &self.uid,
                "appointment start does not precede its end",
            ));
        }

        if self.recurrence.as_ref().is_some_and(|p| p.interval == 0) {
            return Err(ExportError::invalid_record(
                &self.uid,
                "recurrence interval must be at least 1",
            ));
        }

        Ok(())
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A set of weekdays, stored as a bit per day starting at Monday.
///
/// Serialized as a list of English day names (`"Mon"`, `"Tuesday"`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DaySet(u8);

impl DaySet {
    /// The empty set.
    pub const EMPTY: DaySet = DaySet(0);

    /// Adds a day to the set.
    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    /// Returns true if the day is in the set.
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates the days in Monday-to-Sunday order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.into_iter().filter(|day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for DaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = DaySet::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl Serialize for DaySet {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_seq(self.iter().map(|d| d.to_string()))
    }
}

impl<'de> Deserialize<'de> for DaySet {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let names = Vec::<String>::deserialize(de)?;
        names
            .iter()
            .map(|name| {
                name.parse::<Weekday>()
                    .map_err(|_| D::Error::custom(format!("unknown weekday `{}`", name)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn record(start: DateTime<Utc>, end: DateTime<Utc>) -> AppointmentRecord {
        AppointmentRecord::new(
            "uid-1",
            "Planning",
            Organizer::new("Ada", "ada@example.com"),
            ZonedTime::from_utc(start),
            ZonedTime::from_utc(end),
        )
    }

    #[test]
    fn validate_accepts_well_formed_record() {
        assert!(record(utc(2025, 3, 1, 9), utc(2025, 3, 1, 10)).validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_times() {
        let err = record(utc(2025, 3, 1, 10), utc(2025, 3, 1, 10))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidRecord { ref uid, .. } if uid == "uid-1"));
    }

    #[test]
    fn validate_allows_same_day_all_day() {
        let rec = record(utc(2025, 3, 1, 0), utc(2025, 3, 1, 0)).with_all_day(true);
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let pattern = RecurrencePattern::new(
            Frequency::Daily,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        )
        .with_interval(0);
        let rec = record(utc(2025, 3, 1, 9), utc(2025, 3, 1, 10)).with_recurrence(pattern);
        assert!(rec.validate().is_err());
    }

    #[test]
    fn effective_end_date_ignores_no_end() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let open = RecurrencePattern::new(Frequency::Weekly, date)
            .with_end(RecurrenceEnd::NoEnd, Some(date));
        assert_eq!(open.effective_end_date(), None);

        let counted = RecurrencePattern::new(Frequency::Weekly, date)
            .with_end(RecurrenceEnd::Count(4), Some(date));
        assert_eq!(counted.effective_end_date(), Some(date));
    }

    #[test]
    fn unresolved_exception_reports_occurrence_error() {
        let original = utc(2025, 3, 8, 9).naive_utc();
        let exception = RecurrenceException::deleted(original);
        let err = exception.resolve("series-1").unwrap_err();
        assert!(matches!(err, ExportError::Occurrence { .. }));
        assert!(err.to_string().contains("series-1"));
    }

    #[test]
    fn day_set_iterates_monday_first() {
        let days: DaySet = [Weekday::Sun, Weekday::Mon, Weekday::Thu].into_iter().collect();
        let ordered: Vec<Weekday> = days.iter().collect();
        assert_eq!(ordered, vec![Weekday::Mon, Weekday::Thu, Weekday::Sun]);
        assert!(DaySet::EMPTY.is_empty());
    }

    #[test]
    fn pattern_deserializes_weekday_names() {
        let json = r#"{
            "frequency": "weekly",
            "interval": 2,
            "days": ["Mon", "Wed"],
            "end": { "kind": "count", "value": 10 },
            "start_date": "2025-01-06"
        }"#;
        let pattern: RecurrencePattern = serde_json::from_str(json).unwrap();
        assert_eq!(pattern.frequency, Frequency::Weekly);
        assert_eq!(pattern.interval, 2);
        assert!(pattern.days.contains(Weekday::Mon));
        assert!(pattern.days.contains(Weekday::Wed));
        assert!(!pattern.days.contains(Weekday::Tue));
        assert_eq!(pattern.end, RecurrenceEnd::Count(10));
        assert_eq!(pattern.end_date, None);
    }
}
