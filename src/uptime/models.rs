//! Uptime model types.

use serde::Deserialize;
use std::fmt;

/// Uptime split into calendar-style components.
///
/// Always satisfies `hours < 24`, `minutes < 60` and `seconds < 60`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FormattedUptime {
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl FormattedUptime {
    /// Whole seconds represented by this value.
    pub fn total_seconds(&self) -> u64 {
        self.days * 86_400
            + u64::from(self.hours) * 3_600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds)
    }

    /// Zero-padded `HH:MM:SS`, without the day count.
    pub fn clock_face(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

impl fmt::Display for FormattedUptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d {}", self.days, self.clock_face())
    }
}

/// Body returned by the uptime endpoint.
///
/// The endpoint answers either with a bare number or with `{"uptime": n}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UptimeBody {
    Seconds(f64),
    Wrapped { uptime: Option<f64> },
}

impl UptimeBody {
    /// Raw uptime sample in seconds, if the body carried one.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            UptimeBody::Seconds(s) => Some(*s),
            UptimeBody::Wrapped { uptime } => *uptime,
        }
    }
}
