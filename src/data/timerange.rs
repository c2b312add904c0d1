//! Time range presets and timestamp formatting for the detail graphs.

use chrono::DateTime;

use slowatch_types::Milliseconds;

/// Time ranges offered on the detail page, longest first.
pub const TIME_RANGE_PRESETS: [Milliseconds; 5] = [
    Milliseconds::from_weeks(4),
    Milliseconds::from_weeks(1),
    Milliseconds::from_days(1),
    Milliseconds::from_hours(12),
    Milliseconds::from_hours(1),
];

/// Time range used when none (or an invalid one) is given.
pub const DEFAULT_TIME_RANGE: Milliseconds = Milliseconds::from_hours(1);

/// Ranges at least this long label graph ticks with the date.
const MULTI_DAY: Milliseconds = Milliseconds::from_days(1);

/// Format a UNIX timestamp in seconds as UTC `HH:MM`, or `YYYY-MM-DD HH:MM`
/// when the graph spans multiple days.
///
/// Timestamps outside the representable range format as an empty string.
pub fn format_timestamp(secs: i64, multi_day: bool) -> String {
    let Some(time) = DateTime::from_timestamp(secs, 0) else {
        return String::new();
    };
    if multi_day {
        time.format("%Y-%m-%d %H:%M").to_string()
    } else {
        time.format("%H:%M").to_string()
    }
}

/// Format a UNIX timestamp in seconds as UTC `YYYY-MM-DD HH:MM`.
pub fn format_timestamp_full(secs: i64) -> String {
    format_timestamp(secs, true)
}

/// Tick formatter for a graph covering `time_range`.
pub fn date_formatter(time_range: Milliseconds) -> impl Fn(i64) -> String {
    let multi_day = time_range >= MULTI_DAY;
    move |secs| format_timestamp(secs, multi_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_format_canonically() {
        let labels: Vec<String> = TIME_RANGE_PRESETS.iter().map(|t| t.to_string()).collect();
        assert_eq!(labels, ["4w", "1w", "1d", "12h", "1h"]);
        assert_eq!(DEFAULT_TIME_RANGE.to_string(), "1h");
    }

    #[test]
    fn short_ranges_show_time_only() {
        assert_eq!(format_timestamp(0, false), "00:00");
        assert_eq!(format_timestamp(1_700_000_000, false), "22:13");
        assert_eq!(format_timestamp(3_600 * 9 + 60 * 5, false), "09:05");
    }

    #[test]
    fn multi_day_ranges_show_date() {
        assert_eq!(format_timestamp(0, true), "1970-01-01 00:00");
        assert_eq!(format_timestamp(1_700_000_000, true), "2023-11-14 22:13");
        assert_eq!(format_timestamp_full(1_700_000_000), "2023-11-14 22:13");
    }

    #[test]
    fn formatter_switches_at_one_day() {
        let hourly = date_formatter(Milliseconds::from_hours(12));
        let daily = date_formatter(Milliseconds::from_days(1));
        assert_eq!(hourly(1_700_000_000), "22:13");
        assert_eq!(daily(1_700_000_000), "2023-11-14 22:13");
    }

    #[test]
    fn out_of_range_timestamp_is_empty() {
        assert_eq!(format_timestamp(i64::MAX, true), "");
    }
}
