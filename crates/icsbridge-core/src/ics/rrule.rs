//! Recurrence rule encoding.
//!
//! Turns a [`RecurrencePattern`] into the value of an `RRULE` line. Parts are
//! emitted in a fixed order so repeated exports of the same calendar are
//! byte-identical:
//!
//! `FREQ`, then `UNTIL` or `COUNT`, then `INTERVAL` (only above 1), then
//! `BYDAY` (always, possibly empty), then `BYSETPOS=1` for monthly-nth rules.
//!
//! Yearly-nth patterns have no representable frequency; the rule then starts
//! directly with the next part.

use chrono::Weekday;

use crate::appointment::{Frequency, RecurrenceEnd, RecurrencePattern};

/// UTC timestamp layout used by `UNTIL` and the document timestamps.
pub const UTC_STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Returns the `FREQ` token for a frequency, or `None` when it has none.
pub fn frequency_token(frequency: Frequency) -> Option<&'static str> {
    match frequency {
        Frequency::Daily => Some("DAILY"),
        Frequency::Weekly => Some("WEEKLY"),
        Frequency::Monthly | Frequency::MonthlyNth => Some("MONTHLY"),
        Frequency::Yearly => Some("YEARLY"),
        Frequency::YearlyNth => None,
    }
}

/// Two-letter weekday code.
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Encodes a pattern as an `RRULE` value.
pub fn encode(pattern: &RecurrencePattern) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(5);

    if let Some(token) = frequency_token(pattern.frequency) {
        parts.push(format!("FREQ={}", token));
    }

    match pattern.end {
        RecurrenceEnd::NoEnd => {}
        RecurrenceEnd::Until(until) => {
            parts.push(format!("UNTIL={}", until.format(UTC_STAMP_FORMAT)));
        }
        RecurrenceEnd::Count(count) => parts.push(format!("COUNT={}", count)),
    }

    if pattern.interval > 1 {
        parts.push(format!("INTERVAL={}", pattern.interval));
    }

    let days: Vec<&str> = pattern.days.iter().map(weekday_code).collect();
    parts.push(format!("BYDAY={}", days.join(",")));

    if pattern.frequency == Frequency::MonthlyNth {
        parts.push("BYSETPOS=1".to_string());
    }

    parts.join(";")
}
