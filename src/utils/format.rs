use chrono::{DateTime, FixedOffset, NaiveTime};

use crate::prayer_times::Countdown;

/// Format a countdown as "Xh Ym Zs"
pub fn format_countdown(parts: &Countdown) -> String {
    format!("{}h {}m {}s", parts.hours, parts.minutes, parts.seconds)
}

/// Format a NaiveTime to "HH:MM"
pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Format an epoch-millisecond alarm in the given offset, "YYYY-MM-DD HH:MM:SS"
pub fn format_millis(millis: i64, tz: FixedOffset) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(utc) => utc.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{millis} ms"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_shows_all_units() {
        let parts = Countdown { hours: 0, minutes: 5, seconds: 9 };
        assert_eq!(format_countdown(&parts), "0h 5m 9s");
    }

    #[test]
    fn millis_render_in_local_offset() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(format_millis(0, tz), "1970-01-01 01:00:00");
    }
}
