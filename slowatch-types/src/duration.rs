//! Durations in milliseconds and their compact text form.
//!
//! The text form is the one Prometheus uses for ranges and objective windows:
//! `<count><unit>` tokens from largest to smallest unit with no separators,
//! e.g. `1d12h`, `4w`, `1s500ms`. Zero is written `0s`.

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;
use core::time::Duration;

/// Unit suffixes and their size in milliseconds, largest first.
const UNITS: [(&str, u64); 7] = [
    ("y", 1000 * 60 * 60 * 24 * 365),
    ("w", 1000 * 60 * 60 * 24 * 7),
    ("d", 1000 * 60 * 60 * 24),
    ("h", 1000 * 60 * 60),
    ("m", 1000 * 60),
    ("s", 1000),
    ("ms", 1),
];

/// Years and weeks are only emitted when they divide the remainder exactly,
/// so 90 days reads `90d` instead of `12w6d`.
const EXACT_UNITS: usize = 2;

const MILLIS_UNIT: usize = 6;

/// A duration as a whole number of milliseconds.
///
/// Formats with [`format_duration`] through `Display` and parses with
/// [`parse_duration`] through `FromStr`. Years are always 365 days; there is
/// no calendar awareness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Milliseconds(pub u64);

impl Milliseconds {
    /// The zero duration, formatted as `0s`.
    pub const ZERO: Self = Self(0);

    /// Create from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create from seconds.
    ///
    /// The `from_*` constructors saturate at `u64::MAX` milliseconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Create from minutes.
    pub const fn from_mins(mins: u64) -> Self {
        Self(mins.saturating_mul(60 * 1000))
    }

    /// Create from hours.
    pub const fn from_hours(hours: u64) -> Self {
        Self(hours.saturating_mul(60 * 60 * 1000))
    }

    /// Create from days.
    pub const fn from_days(days: u64) -> Self {
        Self(days.saturating_mul(24 * 60 * 60 * 1000))
    }

    /// Create from weeks.
    pub const fn from_weeks(weeks: u64) -> Self {
        Self(weeks.saturating_mul(7 * 24 * 60 * 60 * 1000))
    }

    /// Get the value in milliseconds.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Get the value in seconds (truncated).
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1000
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert to a standard Duration.
    pub const fn to_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

/// Saturates at `u64::MAX` milliseconds.
impl From<Duration> for Milliseconds {
    fn from(d: Duration) -> Self {
        Self(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<Milliseconds> for Duration {
    fn from(m: Milliseconds) -> Self {
        Duration::from_millis(m.0)
    }
}

impl fmt::Display for Milliseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }

        let mut remaining = self.0;
        for (index, (suffix, size)) in UNITS.iter().enumerate() {
            if index < EXACT_UNITS && remaining % size != 0 {
                continue;
            }
            let count = remaining / size;
            if count > 0 {
                write!(f, "{count}{suffix}")?;
                remaining -= count * size;
            }
        }
        Ok(())
    }
}

impl FromStr for Milliseconds {
    type Err = InvalidDuration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s)
    }
}

/// A string that is not a valid duration.
///
/// Callers treat this as "no duration given" rather than as a user-facing
/// error; see [`parse_duration_or`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDuration {
    input: String,
}

impl InvalidDuration {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }

    /// The rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for InvalidDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.input.is_empty() {
            f.write_str("empty duration string")
        } else {
            write!(f, "invalid duration string: {:?}", self.input)
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidDuration {}

/// Format a duration, e.g. `90d`, `1d12h`, `1s500ms`, or `0s` for zero.
pub fn format_duration(d: Milliseconds) -> String {
    d.to_string()
}

/// Parse a duration such as `4w`, `1d12h` or `500ms`.
///
/// The bare string `0` is accepted as zero. Otherwise each unit may appear at
/// most once, units must go from largest to smallest, and nothing else may
/// appear in the string. The empty string is rejected so that "absent" stays
/// distinct from zero.
pub fn parse_duration(s: &str) -> Result<Milliseconds, InvalidDuration> {
    if s.is_empty() {
        return Err(InvalidDuration::new(s));
    }
    if s == "0" {
        return Ok(Milliseconds::ZERO);
    }

    let invalid = || InvalidDuration::new(s);
    let mut rest = s;
    let mut next_unit = 0;
    let mut total: u64 = 0;

    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid());
        }
        let (number, tail) = rest.split_at(digits);
        let count: u64 = number.parse().map_err(|_| invalid())?;

        let unit = unit_at(tail).ok_or_else(invalid)?;
        if unit < next_unit {
            return Err(invalid());
        }
        next_unit = unit + 1;

        let (suffix, size) = UNITS[unit];
        total = count
            .checked_mul(size)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(invalid)?;
        rest = &tail[suffix.len()..];
    }

    Ok(Milliseconds(total))
}

/// Parse a duration, falling back to `default` when the string is empty or
/// invalid.
pub fn parse_duration_or(s: &str, default: Milliseconds) -> Milliseconds {
    parse_duration(s).unwrap_or(default)
}

/// Index into `UNITS` of the suffix at the start of `tail`.
fn unit_at(tail: &str) -> Option<usize> {
    // "ms" has to win over "m".
    if tail.starts_with(UNITS[MILLIS_UNIT].0) {
        return Some(MILLIS_UNIT);
    }
    UNITS.iter().position(|(suffix, _)| tail.starts_with(suffix))
}

#[cfg(feature = "serde")]
mod serde_impl {
    use core::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{parse_duration, Milliseconds};

    impl Serialize for Milliseconds {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u64(self.0)
        }
    }

    /// Accepts a millisecond count or a duration string.
    impl<'de> Deserialize<'de> for Milliseconds {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(MillisecondsVisitor)
        }
    }

    struct MillisecondsVisitor;

    impl<'de> Visitor<'de> for MillisecondsVisitor {
        type Value = Milliseconds;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a millisecond count or a duration string such as \"4w\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Milliseconds(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map(Milliseconds)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse_duration(v).map_err(E::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DAY: u64 = 86_400_000;

    #[test]
    fn format_zero() {
        assert_eq!(format_duration(Milliseconds::ZERO), "0s");
    }

    #[test]
    fn format_keeps_days_when_weeks_do_not_divide() {
        assert_eq!(format_duration(Milliseconds(90 * DAY)), "90d");
        assert_eq!(format_duration(Milliseconds(366 * DAY)), "366d");
    }

    #[test]
    fn format_whole_weeks_and_years() {
        assert_eq!(format_duration(Milliseconds::from_weeks(4)), "4w");
        assert_eq!(format_duration(Milliseconds(365 * DAY)), "1y");
        assert_eq!(format_duration(Milliseconds(2 * 365 * DAY)), "2y");
    }

    #[test]
    fn format_mixed_units() {
        assert_eq!(format_duration(Milliseconds(DAY + 12 * 3_600_000)), "1d12h");
        assert_eq!(format_duration(Milliseconds(1500)), "1s500ms");
        assert_eq!(format_duration(Milliseconds(3_661_001)), "1h1m1s1ms");
        assert_eq!(format_duration(Milliseconds(1)), "1ms");
    }

    #[test]
    fn format_time_range_presets() {
        assert_eq!(Milliseconds::from_days(28).to_string(), "4w");
        assert_eq!(Milliseconds::from_days(7).to_string(), "1w");
        assert_eq!(Milliseconds::from_days(1).to_string(), "1d");
        assert_eq!(Milliseconds::from_hours(12).to_string(), "12h");
        assert_eq!(Milliseconds::from_hours(1).to_string(), "1h");
    }

    #[test]
    fn parse_zero_forms() {
        assert_eq!(parse_duration("0"), Ok(Milliseconds::ZERO));
        assert_eq!(parse_duration("0s"), Ok(Milliseconds::ZERO));
        assert_eq!(parse_duration("0ms"), Ok(Milliseconds::ZERO));
    }

    #[test]
    fn parse_empty_is_invalid() {
        let err = parse_duration("").unwrap_err();
        assert_eq!(err.input(), "");
        assert_eq!(err.to_string(), "empty duration string");
    }

    #[test]
    fn parse_units_in_order() {
        assert_eq!(parse_duration("1w2d"), Ok(Milliseconds(9 * DAY)));
        assert_eq!(parse_duration("1y"), Ok(Milliseconds(365 * DAY)));
        assert_eq!(parse_duration("1h30m"), Ok(Milliseconds::from_mins(90)));
        assert_eq!(parse_duration("5ms"), Ok(Milliseconds(5)));
        assert_eq!(parse_duration("1m5ms"), Ok(Milliseconds(60_005)));
        assert_eq!(
            parse_duration("1y1w1d1h1m1s1ms"),
            Ok(Milliseconds(365 * DAY + 7 * DAY + DAY + 3_600_000 + 60_000 + 1000 + 1))
        );
    }

    #[test]
    fn parse_is_not_canonical() {
        let d = parse_duration("60s").unwrap();
        assert_eq!(d, Milliseconds::from_mins(1));
        assert_eq!(d.to_string(), "1m");
    }

    #[test]
    fn parse_rejects_out_of_order_units() {
        assert!(parse_duration("2d1w").is_err());
        assert!(parse_duration("1h1d").is_err());
        assert!(parse_duration("1ms1s").is_err());
    }

    #[test]
    fn parse_rejects_repeated_units() {
        assert!(parse_duration("1h1h").is_err());
        assert!(parse_duration("1ms2ms").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        for input in ["5x", "h", "1", "00", "1h ", " 1h", "1.5h", "-1h", "+1h", "1hx", "1d-2h"] {
            assert!(parse_duration(input).is_err(), "{input:?} should be invalid");
        }
    }

    #[test]
    fn parse_rejects_overflow() {
        assert!(parse_duration("99999999999999999999ms").is_err());
        assert!(parse_duration("600000000y").is_err());
    }

    #[test]
    fn parse_or_default() {
        let fallback = Milliseconds::from_hours(1);
        assert_eq!(parse_duration_or("", fallback), fallback);
        assert_eq!(parse_duration_or("bogus", fallback), fallback);
        assert_eq!(parse_duration_or("1w", fallback), Milliseconds::from_weeks(1));
        assert_eq!(parse_duration_or("0", fallback), Milliseconds::ZERO);
    }

    #[test]
    fn from_str_matches_parse() {
        let d: Milliseconds = "12h".parse().unwrap();
        assert_eq!(d, Milliseconds::from_hours(12));
        assert!("12".parse::<Milliseconds>().is_err());
    }

    #[test]
    fn duration_conversions() {
        let d = Duration::from_millis(1500);
        let m = Milliseconds::from(d);
        assert_eq!(m.as_millis(), 1500);
        assert_eq!(m.as_secs(), 1);
        assert_eq!(Duration::from(m), d);
        assert_eq!(m.to_duration(), d);
    }

    #[test]
    fn long_durations_saturate() {
        let huge = Duration::from_secs(u64::MAX / 100);
        assert_eq!(Milliseconds::from(huge), Milliseconds(u64::MAX));
        assert_eq!(Milliseconds::from(Duration::MAX), Milliseconds(u64::MAX));

        assert_eq!(Milliseconds::from_secs(u64::MAX), Milliseconds(u64::MAX));
        assert_eq!(Milliseconds::from_mins(u64::MAX / 1000), Milliseconds(u64::MAX));
        assert_eq!(Milliseconds::from_hours(u64::MAX), Milliseconds(u64::MAX));
        assert_eq!(Milliseconds::from_days(u64::MAX), Milliseconds(u64::MAX));
        assert_eq!(Milliseconds::from_weeks(u64::MAX), Milliseconds(u64::MAX));
        assert_eq!(Milliseconds::from_weeks(4), Milliseconds::from_days(28));
    }

    #[test]
    fn invalid_duration_display() {
        let err = parse_duration("5x").unwrap_err();
        assert_eq!(err.to_string(), "invalid duration string: \"5x\"");
    }

    proptest! {
        #[test]
        fn canonical_round_trip(ms in any::<u64>()) {
            let d = Milliseconds(ms);
            prop_assert_eq!(parse_duration(&format_duration(d)), Ok(d));
        }

        #[test]
        fn parse_never_panics(s in "\\PC*") {
            let _ = parse_duration(&s);
        }
    }

    #[cfg(feature = "serde")]
    mod serde_tests {
        use super::*;

        #[test]
        fn serializes_as_integer() {
            let json = serde_json::to_string(&Milliseconds::from_days(28)).unwrap();
            assert_eq!(json, "2419200000");
        }

        #[test]
        fn deserializes_integer_or_string() {
            let a: Milliseconds = serde_json::from_str("2419200000").unwrap();
            let b: Milliseconds = serde_json::from_str("\"4w\"").unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn rejects_invalid_string() {
            assert!(serde_json::from_str::<Milliseconds>("\"2d1w\"").is_err());
            assert!(serde_json::from_str::<Milliseconds>("-5").is_err());
        }
    }
}
