use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Folder name format of a recording day.
pub const DAY_FORMAT: &str = "%Y%m%d";

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parses a `YYYYMMDD` day folder name. Only names that format back to
/// exactly the same string are accepted.
pub fn parse_day(name: &str) -> Option<NaiveDate> {
    if name.len() != 8 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day = NaiveDate::parse_from_str(name, DAY_FORMAT).ok()?;
    (format_day(day) == name).then_some(day)
}

/// Accepts `HH:MM:SS` and `HH:MM`.
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Timestamp prefix used by the per-camera log files.
pub fn log_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}
