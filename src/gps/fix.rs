// src/gps/fix.rs
//! Parsed GPS fix record

/// One parsed position sample, merged with the last known course values.
///
/// Latitude and longitude are decimal degrees. `velocity`, `true_angle` and
/// `magnetic_angle` are carried forward from the most recent course sentence
/// and read zero until one has been seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fix {
    pub timestamp_ms: i64,      // capture time, ms since the Unix epoch
    pub utc_time: String,       // raw hhmmss.sss field
    pub latitude: f64,
    pub longitude: f64,
    pub velocity: f64,          // unit as sent by the receiver
    pub gps_status: i32,        // fix quality code
    pub height: f64,            // antenna height
    pub true_angle: f64,        // degrees
    pub magnetic_angle: f64,    // degrees
}

impl Fix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether this is still the zero fix the merger starts with
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Get fix status description
    pub fn status_description(&self) -> String {
        match self.gps_status {
            0 => "No fix".to_string(),
            1 => "GPS".to_string(),
            2 => "DGPS".to_string(),
            3 => "PPS".to_string(),
            4 => "RTK".to_string(),
            5 => "Float RTK".to_string(),
            6 => "Estimated".to_string(),
            7 => "Manual".to_string(),
            8 => "Simulation".to_string(),
            code => format!("Unknown ({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fix_is_empty() {
        let fix = Fix::new();
        assert!(fix.is_empty());
        assert_eq!(fix.velocity, 0.0);
        assert_eq!(fix.true_angle, 0.0);
        assert_eq!(fix.magnetic_angle, 0.0);
    }

    #[test]
    fn test_status_description() {
        let mut fix = Fix::new();
        fix.gps_status = 4;
        assert_eq!(fix.status_description(), "RTK");
        fix.gps_status = 42;
        assert_eq!(fix.status_description(), "Unknown (42)");
    }
}
