// src/gps/nmea.rs
//! NMEA sentence parsing
//!
//! Only two sentence kinds are understood: GGA position fixes and VTG
//! course/velocity reports. VTG values are not part of a fix on their own;
//! they are kept in a [`ParserState`] and merged into every later GGA fix.

use super::fix::Fix;
use chrono::{Datelike, NaiveDate, TimeDelta, Utc};
use tracing::trace;

/// Field count of a GGA sentence, checksum field included
pub const POSITION_FIELD_COUNT: usize = 15;
/// Field count of a VTG sentence with the mode indicator
pub const COURSE_FIELD_COUNT: usize = 10;

/// Calendar day substituted for the receiver's date when stamping fixes.
///
/// GGA carries no date. The capture timestamp is pinned to September 27 of
/// the current year instead of the real UTC date; this is a known defect
/// kept until the intended date source is settled.
const CAPTURE_MONTH: u32 = 9;
const CAPTURE_DAY: u32 = 27;

/// Fields extracted from a GGA sentence
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFields {
    pub utc_time: String,
    pub latitude: f64,  // decimal degrees
    pub longitude: f64, // decimal degrees
    pub gps_status: i32,
    pub height: f64,
}

/// Fields extracted from a VTG sentence
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CourseFields {
    pub velocity: f64,
    pub true_angle: f64,
    pub magnetic_angle: f64,
}

/// A structurally valid sentence of a recognized kind
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Position(PositionFields),
    Course(CourseFields),
}

/// Recognize a sentence line without touching any state.
///
/// Returns `None` when the first field is empty, has no `$` marker, names an
/// unknown formatter, or the field count is wrong for its kind. Numeric
/// fields that fail to parse read as zero.
pub fn classify(line: &str) -> Option<Sentence> {
    let parts: Vec<&str> = line.split(',').collect();

    let identifier = parts[0];
    if identifier.is_empty() {
        return None;
    }
    let marker = identifier.find('$')?;
    let formatter = &identifier[marker + 1..];

    if formatter.ends_with("GGA") && parts.len() == POSITION_FIELD_COUNT {
        Some(Sentence::Position(parse_gga(&parts)))
    } else if formatter.ends_with("VTG") && parts.len() == COURSE_FIELD_COUNT {
        Some(Sentence::Course(parse_vtg(&parts)))
    } else {
        None
    }
}

/// Parse GGA (Global Positioning System Fix Data) fields
fn parse_gga(parts: &[&str]) -> PositionFields {
    PositionFields {
        utc_time: parts[1].to_string(),
        latitude: degrees_from_nmea(parse_f64(parts[2])),
        longitude: degrees_from_nmea(parse_f64(parts[4])),
        gps_status: parts[6].parse::<i32>().unwrap_or(0),
        height: parse_f64(parts[9]),
    }
}

/// Parse VTG (Track Made Good and Ground Speed) fields
fn parse_vtg(parts: &[&str]) -> CourseFields {
    CourseFields {
        true_angle: parse_f64(parts[1]),
        magnetic_angle: parse_f64(parts[3]),
        velocity: parse_f64(parts[7]),
    }
}

fn parse_f64(field: &str) -> f64 {
    field.parse::<f64>().unwrap_or(0.0)
}

/// Convert `dddmm.mmmm` to decimal degrees
pub fn degrees_from_nmea(raw: f64) -> f64 {
    let degrees = (raw / 100.0).trunc();
    degrees + (raw - degrees * 100.0) / 60.0
}

/// Milliseconds since the epoch for an `hhmmss.sss` time on the capture day.
///
/// Missing or unparsable pieces count as zero and out-of-range pieces roll
/// over into the next unit, so `250000` lands on the following day.
pub fn capture_timestamp_ms(utc_time: &str, year: i32) -> Option<i64> {
    let hours = utc_time
        .get(0..2)
        .and_then(|h| h.parse::<i64>().ok())
        .unwrap_or(0);
    let minutes = utc_time
        .get(2..4)
        .and_then(|m| m.parse::<i64>().ok())
        .unwrap_or(0);
    let seconds = utc_time
        .get(4..)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let whole_seconds = seconds.trunc();
    let nanos = ((seconds - whole_seconds) * 1_000_000_000.0) as i64;

    let offset = TimeDelta::try_hours(hours)?
        .checked_add(&TimeDelta::try_minutes(minutes)?)?
        .checked_add(&TimeDelta::try_seconds(whole_seconds as i64)?)?
        .checked_add(&TimeDelta::nanoseconds(nanos))?;

    let midnight = NaiveDate::from_ymd_opt(year, CAPTURE_MONTH, CAPTURE_DAY)?.and_hms_opt(0, 0, 0)?;
    let captured = midnight.checked_add_signed(offset)?;
    Some(captured.and_utc().timestamp_millis())
}

/// Course values carried across sentence boundaries.
///
/// Starts at zero, is overwritten by every VTG sentence and never reset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParserState {
    pub velocity: f64,
    pub true_angle: f64,
    pub magnetic_angle: f64,
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the carried values with those of a course sentence
    pub fn apply(&mut self, course: &CourseFields) {
        self.velocity = course.velocity;
        self.true_angle = course.true_angle;
        self.magnetic_angle = course.magnetic_angle;
    }

    /// Overwrite the carried fields of a fix with the current values
    pub fn merge_into(&self, fix: &mut Fix) {
        fix.velocity = self.velocity;
        fix.true_angle = self.true_angle;
        fix.magnetic_angle = self.magnetic_angle;
    }
}

/// Stateful sentence parser.
///
/// Each pipeline consumer owns one. Every consumer sees the same ordered
/// stream, so every copy of the state evolves identically.
#[derive(Debug, Clone)]
pub struct NmeaParser {
    state: ParserState,
    reference_year: Option<i32>,
}

impl Default for NmeaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NmeaParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::new(),
            reference_year: None,
        }
    }

    /// Stamp fixes with a fixed year instead of the current one
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Parse one sentence line.
    ///
    /// Returns a fix for a well-formed GGA sentence. A VTG sentence only
    /// updates the carried course values and yields `None`, as does anything
    /// malformed or unrecognized.
    pub fn parse(&mut self, line: &str) -> Option<Fix> {
        match classify(line) {
            Some(Sentence::Position(position)) => Some(self.build_fix(position)),
            Some(Sentence::Course(course)) => {
                self.state.apply(&course);
                trace!(velocity = course.velocity, true_angle = course.true_angle, "course updated");
                None
            }
            None => {
                trace!(line, "sentence discarded");
                None
            }
        }
    }

    fn build_fix(&self, position: PositionFields) -> Fix {
        let year = self.reference_year.unwrap_or_else(|| Utc::now().year());
        let mut fix = Fix {
            timestamp_ms: capture_timestamp_ms(&position.utc_time, year).unwrap_or(0),
            utc_time: position.utc_time,
            latitude: position.latitude,
            longitude: position.longitude,
            gps_status: position.gps_status,
            height: position.height,
            ..Fix::default()
        };
        self.state.merge_into(&mut fix);
        fix
    }
}
