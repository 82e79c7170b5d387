// src/record.rs
//! Delimited log record formatting
//!
//! Coordinates are written with up to 10 significant digits, switching to
//! exponent notation only for very large or very small magnitudes. Velocity,
//! height and angles are written with six fixed decimals.

use crate::gps::Fix;

/// Significant digits kept for latitude and longitude
pub const COORDINATE_DIGITS: usize = 10;

/// Record layouts for the sentence-driven logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// `latitude,longitude,velocity`
    Trace,
    /// `timestampMs,utcTime,latitude,longitude,velocity,gpsStatus,height,trueAngle,magAngle`
    Full,
}

impl RecordKind {
    pub fn format(&self, fix: &Fix) -> String {
        match self {
            RecordKind::Trace => trace_record(fix),
            RecordKind::Full => full_record(fix),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::Trace => "trace",
            RecordKind::Full => "full-data",
        }
    }
}

pub fn trace_record(fix: &Fix) -> String {
    [
        format_significant(fix.latitude, COORDINATE_DIGITS),
        format_significant(fix.longitude, COORDINATE_DIGITS),
        format_fixed(fix.velocity),
    ]
    .join(",")
}

pub fn full_record(fix: &Fix) -> String {
    full_fields(fix).join(",")
}

/// Full record followed by the operator's annotation text, unescaped
pub fn point_record(fix: &Fix, annotation: &str) -> String {
    let mut fields = full_fields(fix);
    fields.push(annotation.to_string());
    fields.join(",")
}

fn full_fields(fix: &Fix) -> Vec<String> {
    vec![
        fix.timestamp_ms.to_string(),
        fix.utc_time.clone(),
        format_significant(fix.latitude, COORDINATE_DIGITS),
        format_significant(fix.longitude, COORDINATE_DIGITS),
        format_fixed(fix.velocity),
        fix.gps_status.to_string(),
        format_fixed(fix.height),
        format_fixed(fix.true_angle),
        format_fixed(fix.magnetic_angle),
    ]
}

fn non_finite(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value.is_infinite() {
        Some(if value > 0.0 { "+Inf" } else { "-Inf" })
    } else {
        None
    }
}

/// Six fixed decimals
pub fn format_fixed(value: f64) -> String {
    match non_finite(value) {
        Some(text) => text.to_string(),
        None => format!("{:.6}", value),
    }
}

/// Shortest rendering with at most `digits` significant digits.
///
/// Plain notation is used while the decimal exponent lies in
/// `-4..digits`, exponent notation (`1.5e+12`, `2e-07`) otherwise.
/// Trailing zeros are dropped in both forms.
pub fn format_significant(value: f64, digits: usize) -> String {
    if let Some(text) = non_finite(value) {
        return text.to_string();
    }
    let digits = digits.max(1);
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round once in scientific form to learn the exponent after rounding
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}
