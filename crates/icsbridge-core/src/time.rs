//! Time types for appointments.
//!
//! This module provides [`ZonedTime`] for appointment start/end times as the
//! calendar host reports them (an instant, the wall clock in the event's own
//! zone, and the host's zone identifier), and [`TimeWindow`] for the export
//! range.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A point in time paired with the zone it was scheduled in.
///
/// The calendar host already knows the wall-clock reading of every event in
/// its own zone, so both readings are carried and no zone database is needed
/// to render `DTSTART;TZID=...` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonedTime {
    /// The instant, in UTC.
    pub utc: DateTime<Utc>,
    /// The wall-clock reading in `zone_id`.
    pub local: NaiveDateTime,
    /// The host's zone identifier (e.g. a Windows zone id).
    pub zone_id: String,
}

impl ZonedTime {
    /// Creates a zoned time from all three readings.
    pub fn new(utc: DateTime<Utc>, local: NaiveDateTime, zone_id: impl Into<String>) -> Self {
        Self {
            utc,
            local,
            zone_id: zone_id.into(),
        }
    }

    /// Creates a zoned time for a UTC instant in the `UTC` zone.
    pub fn from_utc(utc: DateTime<Utc>) -> Self {
        Self::new(utc, utc.naive_utc(), "UTC")
    }

    /// Creates a zoned time from a wall-clock reading and the zone's offset at
    /// that moment.
    pub fn from_local(local: NaiveDateTime, offset: FixedOffset, zone_id: impl Into<String>) -> Self {
        let utc = offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&(local - offset_duration(offset))));
        Self::new(utc, local, zone_id)
    }

    /// Returns the date portion of the wall-clock reading.
    pub fn date(&self) -> NaiveDate {
        self.local.date()
    }
}

fn offset_duration(offset: FixedOffset) -> Duration {
    Duration::seconds(i64::from(offset.local_minus_utc()))
}

impl PartialOrd for ZonedTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ZonedTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.utc
            .cmp(&other.utc)
            .then_with(|| self.local.cmp(&other.local))
            .then_with(|| self.zone_id.cmp(&other.zone_id))
    }
}

/// The range of appointments selected for one export run.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates the window spanning `lookbehind_days` before and
    /// `lookahead_days` after midnight of `today` in the given timezone.
    pub fn around_date<Tz: TimeZone>(
        today: NaiveDate,
        tz: &Tz,
        lookbehind_days: u32,
        lookahead_days: u32,
    ) -> Self {
        let start = midnight(today - Duration::days(i64::from(lookbehind_days)), tz);
        let end = midnight(today + Duration::days(i64::from(lookahead_days)), tz);
        Self::new(start, end.max(start))
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks if a datetime lies strictly inside the window, excluding both
    /// bounds.
    pub fn contains_strictly(&self, dt: DateTime<Utc>) -> bool {
        self.start < dt && dt < self.end
    }

    /// Checks if a date, taken at midnight UTC, is before the window end.
    pub fn date_precedes_end(&self, date: NaiveDate) -> bool {
        date_to_utc(date) < self.end
    }

    /// Checks if a date, taken at midnight UTC, is after the window start.
    pub fn date_follows_start(&self, date: NaiveDate) -> bool {
        date_to_utc(date) > self.start
    }
}

fn date_to_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod zoned_time {
        use super::*;

        #[test]
        fn from_local_applies_offset() {
            let local = date(2025, 3, 20).and_hms_opt(15, 0, 0).unwrap();
            let offset = FixedOffset::east_opt(3600).unwrap();
            let zt = ZonedTime::from_local(local, offset, "W. Europe Standard Time");

            assert_eq!(zt.utc, utc(2025, 3, 20, 14, 0, 0));
            assert_eq!(zt.local, local);
            assert_eq!(zt.zone_id, "W. Europe Standard Time");
            assert_eq!(zt.date(), date(2025, 3, 20));
        }

        #[test]
        fn from_utc_uses_utc_zone() {
            let zt = ZonedTime::from_utc(utc(2025, 2, 5, 10, 30, 0));
            assert_eq!(zt.zone_id, "UTC");
            assert_eq!(zt.local, utc(2025, 2, 5, 10, 30, 0).naive_utc());
        }

        #[test]
        fn ordering_follows_instant() {
            let early = ZonedTime::from_utc(utc(2025, 2, 5, 10, 0, 0));
            let late = ZonedTime::from_utc(utc(2025, 2, 5, 11, 0, 0));
            assert!(early < late);
        }

        #[test]
        fn serde_roundtrip() {
            let zt = ZonedTime::from_utc(utc(2025, 2, 5, 10, 30, 0));
            let json = serde_json::to_string(&zt).unwrap();
            let parsed: ZonedTime = serde_json::from_str(&json).unwrap();
            assert_eq!(zt, parsed);
        }
    }

    mod time_window {
        use super::*;

        #[test]
        #[should_panic(expected = "start must be <= end")]
        fn invalid_window() {
            TimeWindow::new(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 9, 0, 0));
        }

        #[test]
        fn around_date_spans_lookbehind_and_lookahead() {
            let window = TimeWindow::around_date(date(2025, 2, 5), &Utc, 30, 90);
            assert_eq!(window.start, utc(2025, 1, 6, 0, 0, 0));
            assert_eq!(window.end, utc(2025, 5, 6, 0, 0, 0));
            assert_eq!(window.duration(), Duration::days(120));
        }

        #[test]
        fn strict_containment_excludes_bounds() {
            let window = TimeWindow::new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 17, 0, 0));

            assert!(window.contains(utc(2025, 2, 5, 9, 0, 0)));
            assert!(!window.contains_strictly(utc(2025, 2, 5, 9, 0, 0)));
            assert!(!window.contains_strictly(utc(2025, 2, 5, 17, 0, 0)));
            assert!(window.contains_strictly(utc(2025, 2, 5, 9, 0, 1)));
        }

        #[test]
        fn date_comparisons_use_midnight_utc() {
            let window = TimeWindow::new(utc(2025, 2, 5, 0, 0, 0), utc(2025, 2, 10, 0, 0, 0));

            assert!(window.date_precedes_end(date(2025, 2, 9)));
            assert!(!window.date_precedes_end(date(2025, 2, 10)));
            assert!(window.date_follows_start(date(2025, 2, 6)));
            assert!(!window.date_follows_start(date(2025, 2, 5)));
        }
    }
}
