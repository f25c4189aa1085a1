//! Seconds to days/hours/minutes/seconds conversion.

use super::FormattedUptime;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_DAY: u64 = 86_400;

/// Split a raw uptime sample into days, hours, minutes and seconds.
///
/// Each component is the floor of the real-valued quotient. For `s >= 0`,
/// `floor(s / n) == floor(floor(s) / n)`, so the input is floored once and
/// the rest is exact integer arithmetic. The caller guarantees a finite,
/// non-negative input.
pub fn format_uptime(uptime_seconds: f64) -> FormattedUptime {
    let whole = uptime_seconds.floor() as u64;

    FormattedUptime {
        days: whole / SECS_PER_DAY,
        hours: ((whole / SECS_PER_HOUR) % 24) as u8,
        minutes: ((whole / SECS_PER_MINUTE) % 60) as u8,
        seconds: (whole % SECS_PER_MINUTE) as u8,
    }
}
