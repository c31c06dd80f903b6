//! FHIR date codec
//!
//! Parses the four FHIR temporal precisions (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`
//! and date-time/instant) into a [`ParsedDate`] that remembers the original
//! timezone designator and fractional-second precision, then formats a shifted
//! instant back into exactly the same shape.
//!
//! Parsing never fails loudly: anything that isn't a recognizable date yields
//! `None` and the caller leaves the string untouched.
//!
//! # Examples
//!
//! ```
//! use fhir_deid::deidentify::dates::shift_date;
//!
//! assert_eq!(shift_date("2024-01-01T00:00:00Z", 10, false), "2024-01-11T00:00:00Z");
//! assert_eq!(shift_date("2024-03", -45, false), "2024-01");
//! assert_eq!(shift_date("2024-01-01T08:30:00.125+02:00", 0, true), "2024");
//! assert_eq!(shift_date("not a date", 10, false), "not a date");
//! ```

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use std::sync::LazyLock;

/// FHIR `date`/`dateTime`/`instant` lexical shape.
///
/// Bare years are deliberately absent; they are only treated as dates when the
/// field name says so (see [`is_date_key`]).
static FHIR_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}(-\d{2}(T\d{2}:\d{2}(:\d{2}(?:\.\d{1,6})?)?(Z|[+-]\d{2}:\d{2})?)?)?$")
        .expect("Invalid FHIR date regex")
});

/// Field-name suffixes (lowercase) that mark a string as temporal.
const DATE_KEY_SUFFIXES: &[&str] = &["date", "datetime", "instant"];

/// Largest fractional-second precision we round-trip (microseconds).
const MAX_FRACTION_DIGITS: usize = 6;

/// A successfully parsed temporal string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDate {
    /// The local (naive) instant; lower precisions are anchored at the start
    /// of the period (January 1st, the 1st of the month, midnight)
    pub instant: NaiveDateTime,

    /// Timezone designator exactly as written (`"Z"`, `"+02:00"`) or empty
    pub tz_suffix: String,

    /// Number of digits after the decimal point in the seconds field
    pub frac_digits: usize,
}

/// Parse a FHIR temporal string.
///
/// Returns `None` for anything that isn't a valid calendar value in one of the
/// supported shapes.
pub fn parse_date(value: &str) -> Option<ParsedDate> {
    // Every valid shape is ASCII; this also keeps the byte slicing below safe.
    if !value.is_ascii() {
        return None;
    }

    let (core, tz_suffix) = split_timezone(value);

    let frac_digits = core
        .split('.')
        .nth(1)
        .map(str::len)
        .unwrap_or(0);

    let instant = match core.len() {
        4 => date_at_midnight(number(core)?, 1, 1)?,
        7 => {
            expect_byte(core, 4, b'-')?;
            date_at_midnight(number(&core[..4])?, number(&core[5..7])?, 1)?
        }
        10 => parse_calendar_date(core)?.and_hms_opt(0, 0, 0)?,
        _ => parse_date_time(core)?,
    };

    Some(ParsedDate {
        instant,
        tz_suffix: tz_suffix.to_string(),
        frac_digits,
    })
}

/// Format `shifted` with the precision of `original`.
///
/// Precision is measured on the literal length of `original` with trailing
/// `Z`s removed: 4 → year, 7 → year-month, 10 → date, anything else →
/// date-time. Date-times are rendered to whole seconds, or to `frac_digits`
/// fractional digits when that is non-zero, followed by `tz_suffix`.
pub fn format_date(
    original: &str,
    shifted: &NaiveDateTime,
    tz_suffix: &str,
    frac_digits: usize,
) -> String {
    match original.trim_end_matches('Z').len() {
        4 => format!("{:04}", shifted.year()),
        7 => format!("{:04}-{:02}", shifted.year(), shifted.month()),
        10 => format!(
            "{:04}-{:02}-{:02}",
            shifted.year(),
            shifted.month(),
            shifted.day()
        ),
        _ => {
            let mut out = shifted.format("%Y-%m-%dT%H:%M:%S").to_string();
            if frac_digits > 0 {
                let micros = format!("{:06}", shifted.nanosecond() / 1_000);
                out.push('.');
                out.push_str(&micros[..frac_digits.min(MAX_FRACTION_DIGITS)]);
            }
            out.push_str(tz_suffix);
            out
        }
    }
}

/// Shift an already-parsed date by `offset_days`, or collapse it to its year.
///
/// Returns `original` unchanged when the shift would leave the representable
/// four-digit year range.
pub fn apply_shift(
    original: &str,
    parsed: &ParsedDate,
    offset_days: i64,
    collapse_to_year: bool,
) -> String {
    if collapse_to_year {
        return format!("{:04}", parsed.instant.year());
    }

    let shifted = Duration::try_days(offset_days)
        .and_then(|delta| parsed.instant.checked_add_signed(delta))
        .filter(|dt| (1..=9999).contains(&dt.year()));

    match shifted {
        Some(dt) => format_date(original, &dt, &parsed.tz_suffix, parsed.frac_digits),
        None => {
            tracing::debug!(offset_days, "Date shift out of range, value left unchanged");
            original.to_string()
        }
    }
}

/// Shift a FHIR date string by `offset_days`.
///
/// With `collapse_to_year` no shift happens and only the 4-digit year is
/// returned. Unparseable input is returned unchanged.
pub fn shift_date(value: &str, offset_days: i64, collapse_to_year: bool) -> String {
    match parse_date(value) {
        Some(parsed) => apply_shift(value, &parsed, offset_days, collapse_to_year),
        None => value.to_string(),
    }
}

/// Whether a field name marks its value as temporal
/// (case-insensitive suffix `date`, `datetime` or `instant`).
pub fn is_date_key(field: &str) -> bool {
    let lower = field.to_lowercase();
    DATE_KEY_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Whether a string has the lexical shape of a FHIR date/dateTime/instant.
pub fn looks_like_date(value: &str) -> bool {
    FHIR_DATE_REGEX.is_match(value)
}

/// Split a trailing timezone designator off `value`.
///
/// The `+`/`-` search runs backwards from six characters before the end down
/// to index 10, so the dashes inside the date itself are never mistaken for
/// an offset.
fn split_timezone(value: &str) -> (&str, &str) {
    if let Some(core) = value.strip_suffix('Z') {
        return (core, "Z");
    }

    let bytes = value.as_bytes();
    if bytes.len() >= 16 {
        for i in (10..=bytes.len() - 6).rev() {
            if bytes[i] == b'+' || bytes[i] == b'-' {
                return (&value[..i], &value[i..]);
            }
        }
    }

    (value, "")
}

fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 10 {
        return None;
    }
    expect_byte(text, 4, b'-')?;
    expect_byte(text, 7, b'-')?;
    let year = number(&text[..4])?;
    if year == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, number(&text[5..7])?, number(&text[8..10])?)
}

/// `YYYY-MM-DD[T| ]HH[:MM[:SS[.f{1,6}]]]`
fn parse_date_time(core: &str) -> Option<NaiveDateTime> {
    if core.len() < 13 {
        return None;
    }
    let date = parse_calendar_date(&core[..10])?;
    match core.as_bytes()[10] {
        b'T' | b' ' => {}
        _ => return None,
    }

    let time = &core[11..];
    let (clock, fraction) = match time.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (time, None),
    };

    let (hour, minute, second) = match clock.len() {
        2 => (number(clock)?, 0, 0),
        5 => {
            expect_byte(clock, 2, b':')?;
            (number(&clock[..2])?, number(&clock[3..5])?, 0)
        }
        8 => {
            expect_byte(clock, 2, b':')?;
            expect_byte(clock, 5, b':')?;
            (
                number(&clock[..2])?,
                number(&clock[3..5])?,
                number(&clock[6..8])?,
            )
        }
        _ => return None,
    };

    let micros = match fraction {
        None => 0,
        Some(digits) => {
            // Fractions only make sense after whole seconds.
            if clock.len() != 8 || digits.is_empty() || digits.len() > MAX_FRACTION_DIGITS {
                return None;
            }
            number(&format!("{digits:0<6}"))?
        }
    };

    let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micros)?;
    Some(NaiveDateTime::new(date, time))
}

fn date_at_midnight(year: u32, month: u32, day: u32) -> Option<NaiveDateTime> {
    if year == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(0, 0, 0)
}

/// Parse an all-ASCII-digit string; rejects signs, whitespace and empties.
fn number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn expect_byte(text: &str, index: usize, expected: u8) -> Option<()> {
    (text.as_bytes().get(index) == Some(&expected)).then_some(())
}
