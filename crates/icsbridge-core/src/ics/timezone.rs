//! Zone name resolution and the `VTIMEZONE` blocks declared by a document.
//!
//! Calendar hosts on Windows report zones by their Windows identifier
//! (`"W. Europe Standard Time"`), while calendar consumers expect IANA names.
//! [`ZoneResolver`] is the seam between the two; [`WindowsZoneTable`] is the
//! built-in lookup.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{ExportError, ExportResult};

/// Territory code of the world-wide default mapping.
pub const WORLD_REGION: &str = "001";

/// Maps a host zone identifier to a canonical zone name.
pub trait ZoneResolver: Send + Sync {
    /// Resolves `zone_id` for the given region hint.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::UnknownZone`] when no mapping exists.
    fn resolve(&self, zone_id: &str, region: &str) -> ExportResult<String>;
}

/// (Windows id, territory, IANA name).
///
/// Territory-specific rows precede the `001` row of the same zone.
const WINDOWS_ZONES: &[(&str, &str, &str)] = &[
    ("UTC", WORLD_REGION, "Etc/UTC"),
    ("GMT Standard Time", "GB", "Europe/London"),
    ("GMT Standard Time", "IE", "Europe/Dublin"),
    ("GMT Standard Time", "PT", "Europe/Lisbon"),
    ("GMT Standard Time", WORLD_REGION, "Europe/London"),
    ("W. Europe Standard Time", "NL", "Europe/Amsterdam"),
    ("W. Europe Standard Time", "DE", "Europe/Berlin"),
    ("W. Europe Standard Time", "AT", "Europe/Vienna"),
    ("W. Europe Standard Time", "CH", "Europe/Zurich"),
    ("W. Europe Standard Time", "IT", "Europe/Rome"),
    ("W. Europe Standard Time", "LU", "Europe/Luxembourg"),
    ("W. Europe Standard Time", "SE", "Europe/Stockholm"),
    ("W. Europe Standard Time", "NO", "Europe/Oslo"),
    ("W. Europe Standard Time", WORLD_REGION, "Europe/Berlin"),
    ("Romance Standard Time", "BE", "Europe/Brussels"),
    ("Romance Standard Time", "DK", "Europe/Copenhagen"),
    ("Romance Standard Time", "ES", "Europe/Madrid"),
    ("Romance Standard Time", WORLD_REGION, "Europe/Paris"),
    ("Central Europe Standard Time", "CZ", "Europe/Prague"),
    ("Central Europe Standard Time", "HU", "Europe/Budapest"),
    ("Central Europe Standard Time", WORLD_REGION, "Europe/Budapest"),
    ("Central European Standard Time", "PL", "Europe/Warsaw"),
    ("Central European Standard Time", WORLD_REGION, "Europe/Warsaw"),
    ("FLE Standard Time", "FI", "Europe/Helsinki"),
    ("FLE Standard Time", WORLD_REGION, "Europe/Kiev"),
    ("GTB Standard Time", WORLD_REGION, "Europe/Bucharest"),
    ("E. Europe Standard Time", WORLD_REGION, "Europe/Chisinau"),
    ("Russian Standard Time", WORLD_REGION, "Europe/Moscow"),
    ("Turkey Standard Time", WORLD_REGION, "Europe/Istanbul"),
    ("Israel Standard Time", WORLD_REGION, "Asia/Jerusalem"),
    ("South Africa Standard Time", WORLD_REGION, "Africa/Johannesburg"),
    ("Arabian Standard Time", WORLD_REGION, "Asia/Dubai"),
    ("India Standard Time", WORLD_REGION, "Asia/Calcutta"),
    ("China Standard Time", WORLD_REGION, "Asia/Shanghai"),
    ("Singapore Standard Time", WORLD_REGION, "Asia/Singapore"),
    ("Tokyo Standard Time", WORLD_REGION, "Asia/Tokyo"),
    ("AUS Eastern Standard Time", WORLD_REGION, "Australia/Sydney"),
    ("New Zealand Standard Time", WORLD_REGION, "Pacific/Auckland"),
    ("Eastern Standard Time", "CA", "America/Toronto"),
    ("Eastern Standard Time", WORLD_REGION, "America/New_York"),
    ("Central Standard Time", "CA", "America/Winnipeg"),
    ("Central Standard Time", WORLD_REGION, "America/Chicago"),
    ("Mountain Standard Time", "CA", "America/Edmonton"),
    ("Mountain Standard Time", WORLD_REGION, "America/Denver"),
    ("Pacific Standard Time", "CA", "America/Vancouver"),
    ("Pacific Standard Time", WORLD_REGION, "America/Los_Angeles"),
    ("E. South America Standard Time", WORLD_REGION, "America/Sao_Paulo"),
];

/// Built-in Windows-to-IANA lookup.
///
/// Resolution order: the row for `(zone_id, region)`, then the world row for
/// `zone_id`. Identifiers that already are canonical names in the table, and
/// `UTC`, resolve to themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsZoneTable;

impl WindowsZoneTable {
    pub fn new() -> Self {
        Self
    }

    fn lookup(zone_id: &str, region: &str) -> Option<&'static str> {
        WINDOWS_ZONES
            .iter()
            .find(|(id, territory, _)| *id == zone_id && territory.eq_ignore_ascii_case(region))
            .map(|(_, _, iana)| *iana)
    }

    fn is_canonical(zone_id: &str) -> bool {
        zone_id == "UTC" || WINDOWS_ZONES.iter().any(|(_, _, iana)| *iana == zone_id)
    }
}

impl ZoneResolver for WindowsZoneTable {
    fn resolve(&self, zone_id: &str, region: &str) -> ExportResult<String> {
        if Self::is_canonical(zone_id) {
            return Ok(zone_id.to_string());
        }

        Self::lookup(zone_id, region)
            .or_else(|| Self::lookup(zone_id, WORLD_REGION))
            .map(str::to_string)
            .ok_or_else(|| ExportError::unknown_zone(zone_id, region))
    }
}

/// Whether an observance describes standard or daylight time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservanceKind {
    Standard,
    Daylight,
}

impl ObservanceKind {
    fn component(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
        }
    }
}

/// One `STANDARD` or `DAYLIGHT` sub-block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observance {
    pub kind: ObservanceKind,
    /// Offset before the onset, in minutes east of UTC.
    pub offset_from: i32,
    /// Offset after the onset, in minutes east of UTC.
    pub offset_to: i32,
    pub name: String,
    /// First onset, in local time before the transition.
    pub onset: NaiveDateTime,
    /// `RRULE` value repeating the onset.
    pub rule: String,
}

/// A `VTIMEZONE` block declared once per document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneDefinition {
    pub tzid: String,
    pub observances: Vec<Observance>,
}

impl TimezoneDefinition {
    /// Central European time as observed in the Netherlands: CET (+0100) and
    /// CEST (+0200), switching on the last Sunday of October and March.
    pub fn europe_amsterdam() -> Self {
        let (cet, cest) = (60, 120);
        Self {
            tzid: "Europe/Amsterdam".to_string(),
            observances: vec![
                Observance {
                    kind: ObservanceKind::Standard,
                    offset_from: cest,
                    offset_to: cet,
                    name: "CET".to_string(),
                    onset: onset(1970, 10, 25, 3),
                    rule: "FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU".to_string(),
                },
                Observance {
                    kind: ObservanceKind::Daylight,
                    offset_from: cet,
                    offset_to: cest,
                    name: "CEST".to_string(),
                    onset: onset(1970, 3, 29, 2),
                    rule: "FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU".to_string(),
                },
            ],
        }
    }

    /// Renders the block as unfolded content lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(2 + self.observances.len() * 7);
        lines.push("BEGIN:VTIMEZONE".to_string());
        lines.push(format!("TZID:{}", self.tzid));
        for observance in &self.observances {
            let component = observance.kind.component();
            lines.push(format!("BEGIN:{}", component));
            lines.push(format!("TZOFFSETFROM:{}", format_offset(observance.offset_from)));
            lines.push(format!("TZOFFSETTO:{}", format_offset(observance.offset_to)));
            lines.push(format!("TZNAME:{}", observance.name));
            lines.push(format!("DTSTART:{}", observance.onset.format("%Y%m%dT%H%M%S")));
            lines.push(format!("RRULE:{}", observance.rule));
            lines.push(format!("END:{}", component));
        }
        lines.push("END:VTIMEZONE".to_string());
        lines
    }
}

fn onset(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap_or_default()
}

/// Formats an offset in minutes as `+HHMM` / `-HHMM`.
pub fn format_offset(offset_minutes: i32) -> String {
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let minutes = offset_minutes.unsigned_abs();
    format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_specific_mapping() {
        let table = WindowsZoneTable::new();
        assert_eq!(
            table.resolve("W. Europe Standard Time", "NL").unwrap(),
            "Europe/Amsterdam"
        );
        assert_eq!(
            table.resolve("Romance Standard Time", "be").unwrap(),
            "Europe/Brussels"
        );
    }

    #[test]
    fn falls_back_to_world_mapping() {
        let table = WindowsZoneTable::new();
        assert_eq!(
            table.resolve("Eastern Standard Time", "NL").unwrap(),
            "America/New_York"
        );
    }

    #[test]
    fn canonical_names_pass_through() {
        let table = WindowsZoneTable::new();
        assert_eq!(table.resolve("Europe/Amsterdam", "NL").unwrap(), "Europe/Amsterdam");
        assert_eq!(table.resolve("UTC", "NL").unwrap(), "UTC");
    }

    #[test]
    fn unknown_zone_is_an_error() {
        let err = WindowsZoneTable::new()
            .resolve("Mars Standard Time", "NL")
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::UnknownZone { ref zone_id, ref region }
                if zone_id == "Mars Standard Time" && region == "NL"
        ));
    }

    #[test]
    fn offsets_render_as_hhmm() {
        assert_eq!(format_offset(60), "+0100");
        assert_eq!(format_offset(-270), "-0430");
        assert_eq!(format_offset(0), "+0000");
    }

    #[test]
    fn amsterdam_block_lines() {
        let lines = TimezoneDefinition::europe_amsterdam().lines();
        assert_eq!(
            lines,
            vec![
                "BEGIN:VTIMEZONE",
                "TZID:Europe/Amsterdam",
                "BEGIN:STANDARD",
                "TZOFFSETFROM:+0200",
                "TZOFFSETTO:+0100",
                "TZNAME:CET",
                "DTSTART:19701025T030000",
                "RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU",
                "END:STANDARD",
                "BEGIN:DAYLIGHT",
                "TZOFFSETFROM:+0100",
                "TZOFFSETTO:+0200",
                "TZNAME:CEST",
                "DTSTART:19700329T020000",
                "RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU",
                "END:DAYLIGHT",
                "END:VTIMEZONE",
            ]
        );
    }
}
