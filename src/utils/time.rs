//! Wall-clock helpers shared by the logger and the zone writer.

use std::time::{SystemTime, UNIX_EPOCH};

/// Broken-down UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcTime {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub millis: u32,
}

impl UtcTime {
    /// Current UTC time. A clock set before 1970 reads as the epoch.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_unix(since_epoch.as_secs(), since_epoch.subsec_millis())
    }

    /// Builds a timestamp from seconds since the Unix epoch.
    pub fn from_unix(secs: u64, millis: u32) -> Self {
        let (year, month, day) = days_to_date(secs / 86_400);
        Self {
            year,
            month,
            day,
            hour: ((secs / 3600) % 24) as u32,
            minute: ((secs / 60) % 60) as u32,
            second: (secs % 60) as u32,
            millis,
        }
    }

    /// `YYYYMMDDHH`, the serial format used in SOA records.
    pub fn zone_serial(&self) -> String {
        format!(
            "{:04}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour
        )
    }
}

/// Converts days since Unix epoch to (year, month, day).
fn days_to_date(days: u64) -> (u32, u32, u32) {
    // Howard Hinnant's civil_from_days
    let z = days as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as u32, m, d)
}
