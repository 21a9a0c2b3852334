//! # Calendar dates, packed MPC epochs and Julian-date arithmetic
//!
//! Catalogue exports carry dates in a handful of shapes: compact `YYYYMMDD` strings (often
//! with a fractional day appended), ISO or slash-delimited dates, five-character packed MPC
//! epochs, Modified Julian Dates and Julian Dates. This module turns all of them into a
//! single validated [`CalendarDate`] type and converts between the day counts.
//!
//! ## Overview
//! -----------------
//! * [`CalendarDate`] is a proleptic Gregorian date validated through [`hifitime::Epoch`].
//! * [`parse_date`] accepts `YYYYMMDD[...]`, `YYYY-MM-DD`, `DD/MM/YYYY` and `YYYY/MM/DD`.
//! * [`mpc_packed_to_date`] decodes packed epochs such as `K25BL` (2025-11-21).
//! * [`date_to_mjd`] / [`mjd_to_date`] convert with MJD 0 = 1858-11-17, and
//!   [`mjd_to_jd`] / [`jd_to_mjd`] apply the constant offset [`JDTOMJD`].
//! * [`parse_datetime`] / [`format_timestamp`] handle the alert timestamps.
//!
//! Every parser is total: malformed input yields `None`, never a panic.
//!
//! ## Time scale
//! -----------------
//! Calendar days are mapped to epochs at noon TAI. Civil dates have no time scale of their
//! own and anchoring at noon keeps every conversion half a day away from a day boundary,
//! so rounding in the underlying nanosecond representation can never move a date.
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use hifitime::Epoch;
use regex::Regex;

use crate::constants::{JD, JDTOMJD, MJD};

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid ISO date regex")
});

static DAY_FIRST_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid DD/MM/YYYY regex")
});

static YEAR_FIRST_SLASH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").expect("valid YYYY/MM/DD regex")
});

static DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2}):(\d{2}):(\d{2}))?$")
        .expect("valid datetime regex")
});

/// First representable calendar year
pub const MIN_YEAR: i32 = 1;

/// Last representable calendar year
pub const MAX_YEAR: i32 = 9999;

/// MJD of 0001-01-01
const MJD_FIRST_DAY: MJD = -678_575.0;

/// MJD of 10000-01-01
const MJD_PAST_LAST_DAY: MJD = 2_973_484.0;

/// A validated proleptic Gregorian calendar date.
///
/// The only way to build one is through [`CalendarDate::new`] (or one of the parsers of this
/// module), so month and day are always in range for the given year and the year is within
/// [`MIN_YEAR`]..=[`MAX_YEAR`], the range of a SQL `DATE` and of the `YYYY-MM-DD` rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate {
    year: i32,
    month: u8,
    day: u8,
}

impl CalendarDate {
    /// Build a date, returning `None` when the combination does not exist
    /// (month 13, February 30, February 29 of a common year, ...) or the year is outside
    /// [`MIN_YEAR`]..=[`MAX_YEAR`].
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return None;
        }
        Epoch::maybe_from_gregorian_tai(year, month, day, 12, 0, 0, 0).ok()?;
        Some(CalendarDate { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Today's date in UTC, `None` when the system clock cannot be read.
    pub fn today() -> Option<Self> {
        let now = Epoch::now().ok()?;
        let (year, month, day, _, _, _, _) = now.to_gregorian_utc();
        CalendarDate::new(year, month, day)
    }

    /// Compact `YYYYMMDD` rendering, the inverse of the 8-digit branch of [`parse_date`].
    pub fn to_compact(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }

    fn noon_epoch(&self) -> Epoch {
        Epoch::from_gregorian_tai(self.year, self.month, self.day, 12, 0, 0, 0)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Strict ISO `YYYY-MM-DD` parsing, the inverse of [`fmt::Display`].
impl FromStr for CalendarDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_ymd_captures(&ISO_DATE, s.trim(), (1, 2, 3))
            .ok_or_else(|| format!("invalid calendar date: {s:?}"))
    }
}

fn parse_ymd_captures(re: &Regex, text: &str, order: (usize, usize, usize)) -> Option<CalendarDate> {
    let caps = re.captures(text)?;
    let year: i32 = caps.get(order.0)?.as_str().parse().ok()?;
    let month: u8 = caps.get(order.1)?.as_str().parse().ok()?;
    let day: u8 = caps.get(order.2)?.as_str().parse().ok()?;
    CalendarDate::new(year, month, day)
}

/// Parse a calendar date from a catalogue field.
///
/// Arguments
/// -----------------
/// * `text`: raw field content. Blank input and the `NULL` token yield `None`.
///
/// Return
/// ----------
/// * `Some(CalendarDate)` when the text starts with eight digits forming a valid `YYYYMMDD`
///   date (anything after the eighth character, typically a fractional day, is ignored), or
///   when the whole text matches `YYYY-MM-DD`, `DD/MM/YYYY` or `YYYY/MM/DD`.
/// * `None` otherwise, including well-formed but nonexistent dates.
pub fn parse_date(text: &str) -> Option<CalendarDate> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        return None;
    }

    if let Some(compact) = text.get(..8) {
        if compact.bytes().all(|b| b.is_ascii_digit()) {
            let year: i32 = compact[..4].parse().ok()?;
            let month: u8 = compact[4..6].parse().ok()?;
            let day: u8 = compact[6..8].parse().ok()?;
            return CalendarDate::new(year, month, day);
        }
    }

    parse_ymd_captures(&ISO_DATE, text, (1, 2, 3))
        .or_else(|| parse_ymd_captures(&DAY_FIRST_DATE, text, (3, 2, 1)))
        .or_else(|| parse_ymd_captures(&YEAR_FIRST_SLASH_DATE, text, (1, 2, 3)))
}

/// Decode a month or day character of a packed MPC date.
///
/// `1`-`9` map to 1-9 and `A`-`Z` to 10-35. Zero and any other character are invalid.
fn packed_digit(c: char) -> Option<u8> {
    match c {
        '1'..='9' => Some(c as u8 - b'0'),
        'A'..='Z' => Some(c as u8 - b'A' + 10),
        _ => None,
    }
}

/// Decode a five-character packed MPC epoch.
///
/// Layout is `CYYMD`: a century letter (`I` = 1800, `J` = 1900, `K` = 2000), a two-digit year,
/// then one character each for month and day (see [`packed_digit`]).
///
/// Arguments
/// -----------------
/// * `packed`: the packed epoch, surrounding whitespace allowed.
///
/// Return
/// ----------
/// * The decoded date, or `None` for a wrong length, an unknown century letter, a non-digit
///   year, or a month/day character that decodes to a value outside the calendar
///   (month > 12, day past the end of the month).
///
/// See also
/// ------------
/// * [`parse_date`] for the unpacked formats.
pub fn mpc_packed_to_date(packed: &str) -> Option<CalendarDate> {
    let chars: Vec<char> = packed.trim().chars().collect();
    if chars.len() != 5 {
        return None;
    }

    let century = match chars[0] {
        'I' => 1800,
        'J' => 1900,
        'K' => 2000,
        _ => return None,
    };
    let tens = chars[1].to_digit(10)?;
    let units = chars[2].to_digit(10)?;
    let year = century + (tens * 10 + units) as i32;

    let month = packed_digit(chars[3])?;
    let day = packed_digit(chars[4])?;
    CalendarDate::new(year, month, day)
}

/// Modified Julian Date of a calendar date (MJD 0 = 1858-11-17), as a whole day count.
pub fn date_to_mjd(date: CalendarDate) -> MJD {
    (date.noon_epoch().to_mjd_tai_days() - 0.5).round()
}

/// Calendar date containing a Modified Julian Date.
///
/// The fractional day is truncated toward zero before conversion, so `-0.5` maps to
/// 1858-11-17. Non-finite input and day counts falling outside
/// [`MIN_YEAR`]..=[`MAX_YEAR`] yield `None`.
pub fn mjd_to_date(mjd: MJD) -> Option<CalendarDate> {
    if !mjd.is_finite() || !(MJD_FIRST_DAY..MJD_PAST_LAST_DAY).contains(&mjd.trunc()) {
        return None;
    }
    let (year, month, day, _, _, _, _) =
        Epoch::from_mjd_tai(mjd.trunc() + 0.5).to_gregorian_tai();
    CalendarDate::new(year, month, day)
}

/// Julian Date from a Modified Julian Date
pub fn mjd_to_jd(mjd: MJD) -> JD {
    mjd + JDTOMJD
}

/// Modified Julian Date from a Julian Date
pub fn jd_to_mjd(jd: JD) -> MJD {
    jd - JDTOMJD
}

/// Parse an alert timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and a bare `YYYY-MM-DD` (midnight).
/// The value is interpreted in UTC.
pub fn parse_datetime(text: &str) -> Option<Epoch> {
    let caps = DATETIME.captures(text.trim())?;
    let field = |idx: usize| caps.get(idx).map(|m| m.as_str());

    let year: i32 = field(1)?.parse().ok()?;
    let month: u8 = field(2)?.parse().ok()?;
    let day: u8 = field(3)?.parse().ok()?;
    let hour: u8 = field(4).map_or(Some(0), |h| h.parse().ok())?;
    let minute: u8 = field(5).map_or(Some(0), |m| m.parse().ok())?;
    let second: u8 = field(6).map_or(Some(0), |s| s.parse().ok())?;

    Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, 0).ok()
}

/// Render an epoch as `YYYY-MM-DD HH:MM:SS` (UTC), the storage format of alert timestamps.
pub fn format_timestamp(epoch: &Epoch) -> String {
    let (y, mo, d, h, mi, s, _) = epoch.to_gregorian_utc();
    format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}")
}

#[cfg(test)]
mod time_test {
    use super::*;

    fn date(y: i32, m: u8, d: u8) -> CalendarDate {
        CalendarDate::new(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_validation() {
        assert!(CalendarDate::new(2024, 2, 29).is_some());
        assert!(CalendarDate::new(2023, 2, 29).is_none());
        assert!(CalendarDate::new(2023, 13, 1).is_none());
        assert!(CalendarDate::new(2023, 4, 31).is_none());
        assert!(CalendarDate::new(2023, 0, 10).is_none());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("20240315"), Some(date(2024, 3, 15)));
        assert_eq!(parse_date("20240315.5123"), Some(date(2024, 3, 15)));
        assert_eq!(parse_date(" 2024-03-15 "), Some(date(2024, 3, 15)));
        assert_eq!(parse_date("15/03/2024"), Some(date(2024, 3, 15)));
        assert_eq!(parse_date("2024/3/5"), Some(date(2024, 3, 5)));

        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("NULL"), None);
        assert_eq!(parse_date("20231301"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("March 15"), None);
    }

    #[test]
    fn test_compact_round_trip() {
        for text in ["18581117", "19000101", "20000229", "20251121", "21991231"] {
            let parsed = parse_date(text).unwrap();
            assert_eq!(parsed.to_compact(), text);
        }
    }

    #[test]
    fn test_display_and_from_str() {
        let d = date(2025, 11, 21);
        assert_eq!(d.to_string(), "2025-11-21");
        assert_eq!("2025-11-21".parse::<CalendarDate>(), Ok(d));
        assert!("21/11/2025".parse::<CalendarDate>().is_err());
    }

    #[test]
    fn test_mpc_packed_to_date() {
        assert_eq!(mpc_packed_to_date("K25BL"), Some(date(2025, 11, 21)));
        assert_eq!(mpc_packed_to_date("J9611"), Some(date(1996, 1, 1)));
        assert_eq!(mpc_packed_to_date("I9912"), Some(date(1899, 1, 2)));
        assert_eq!(mpc_packed_to_date(" K2410 "), None);
        assert_eq!(mpc_packed_to_date("K24D1"), None);
        assert_eq!(mpc_packed_to_date("K242U"), None);
        assert_eq!(mpc_packed_to_date("L2511"), None);
        assert_eq!(mpc_packed_to_date("K25B"), None);
        assert_eq!(mpc_packed_to_date("KX5BL"), None);
    }

    #[test]
    fn test_mjd_anchor() {
        assert_eq!(date_to_mjd(date(1858, 11, 17)), 0.0);
        assert_eq!(date_to_mjd(date(2000, 1, 1)), 51544.0);
        assert_eq!(mjd_to_date(0.0), Some(date(1858, 11, 17)));
        assert_eq!(mjd_to_date(60000.75), Some(date(2023, 2, 25)));
        assert_eq!(mjd_to_date(-0.5), Some(date(1858, 11, 17)));
        assert_eq!(mjd_to_date(f64::NAN), None);
    }

    #[test]
    fn test_mjd_round_trip() {
        let samples = [
            date(1858, 11, 18),
            date(1900, 3, 1),
            date(1970, 1, 1),
            date(2000, 2, 29),
            date(2025, 11, 21),
            date(2100, 12, 31),
        ];
        for d in samples {
            assert_eq!(mjd_to_date(date_to_mjd(d)), Some(d));
        }
    }

    #[test]
    fn test_year_range_is_bounded() {
        assert!(CalendarDate::new(MIN_YEAR, 1, 1).is_some());
        assert!(CalendarDate::new(MAX_YEAR, 12, 31).is_some());
        assert!(CalendarDate::new(0, 1, 1).is_none());
        assert!(CalendarDate::new(-189_629, 4, 22).is_none());
        assert!(CalendarDate::new(10_000, 1, 1).is_none());

        assert_eq!(mjd_to_date(MJD_FIRST_DAY), Some(date(1, 1, 1)));
        assert_eq!(mjd_to_date(MJD_FIRST_DAY - 1.0), None);
        assert_eq!(mjd_to_date(MJD_PAST_LAST_DAY - 1.0), Some(date(9999, 12, 31)));
        assert_eq!(mjd_to_date(MJD_PAST_LAST_DAY), None);
        assert_eq!(mjd_to_date(-7e7), None);
        assert_eq!(mjd_to_date(1e300), None);
        assert_eq!(mjd_to_date(f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_every_date_reads_back() {
        for d in [date(1, 1, 1), date(999, 6, 15), date(9999, 12, 31)] {
            assert_eq!(d.to_string().parse::<CalendarDate>(), Ok(d));
        }
        assert_eq!(date(999, 6, 15).to_string(), "0999-06-15");
    }

    #[test]
    fn test_jd_offset() {
        assert_eq!(mjd_to_jd(51544.0), 2451544.5);
        assert_eq!(jd_to_mjd(2451544.5), 51544.0);
    }

    #[test]
    fn test_parse_datetime() {
        let epoch = parse_datetime("2025-03-04 05:06:07").unwrap();
        assert_eq!(format_timestamp(&epoch), "2025-03-04 05:06:07");

        let epoch = parse_datetime("2025-03-04T05:06:07").unwrap();
        assert_eq!(format_timestamp(&epoch), "2025-03-04 05:06:07");

        let epoch = parse_datetime("2025-03-04").unwrap();
        assert_eq!(format_timestamp(&epoch), "2025-03-04 00:00:00");

        assert!(parse_datetime("04/03/2025 05:06").is_none());
        assert!(parse_datetime("2025-02-30 00:00:00").is_none());
    }
}
