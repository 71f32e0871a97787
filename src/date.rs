//! Parses and formats PDF date strings (ISO 32000-1 §7.9.4):
//! `D:YYYYMMDDHHmmSSOHH'mm'`, where every field past the year is
//! optional and `O` is `+`, `-`, or `Z` for UTC. Built on the `time`
//! crate the way the teacher's own `date.rs` re-exports it, extended
//! here to actually parse the timezone suffix rather than assume UTC.

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{Error, Result};

/// Parses a `/CreationDate`/`/ModDate` string value (without the
/// surrounding parentheses — callers pass the decoded string bytes).
pub fn parse_pdf_date(s: &str) -> Result<OffsetDateTime> {
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits: Vec<char> = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return Err(Error::ParseError(format!("PDF date too short: {s:?}")));
    }
    let field = |range: std::ops::Range<usize>, default: i32| -> i32 {
        if range.end <= digits.len() {
            digits[range].iter().collect::<String>().parse().unwrap_or(default)
        } else {
            default
        }
    };
    let year = field(0..4, 1970);
    let month = field(4..6, 1).clamp(1, 12) as u8;
    let day = field(6..8, 1).clamp(1, 31) as u8;
    let hour = field(8..10, 0).clamp(0, 23) as u8;
    let minute = field(10..12, 0).clamp(0, 59) as u8;
    let second = field(12..14, 0).clamp(0, 59) as u8;

    let month = Month::try_from(month).map_err(|_| Error::ParseError(format!("invalid month in PDF date: {s:?}")))?;
    let date = Date::from_calendar_date(year, month, day).map_err(|_| Error::ParseError(format!("invalid calendar date: {s:?}")))?;
    let time = Time::from_hms(hour, minute, second).map_err(|_| Error::ParseError(format!("invalid time of day: {s:?}")))?;
    let naive = PrimitiveDateTime::new(date, time);

    let offset = parse_offset(&s[digits.len().min(s.len())..]);
    Ok(naive.assume_offset(offset))
}

/// The `OHH'mm'` suffix, e.g. `+05'30'`, `-08'00'`, or `Z` / empty for
/// UTC (both are common even though only `Z` is explicit in the spec).
fn parse_offset(rest: &str) -> UtcOffset {
    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('Z') {
        return UtcOffset::UTC;
    }
    let sign = match rest.chars().next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => return UtcOffset::UTC,
    };
    let body = &rest[1..];
    let mut parts = body.splitn(2, '\'');
    let hh: i8 = parts.next().unwrap_or("0").trim_end_matches('\'').parse().unwrap_or(0);
    let mm: i8 = parts
        .next()
        .map(|m| m.trim_end_matches('\''))
        .and_then(|m| m.parse().ok())
        .unwrap_or(0);
    UtcOffset::from_hms(sign * hh, sign * mm, 0).unwrap_or(UtcOffset::UTC)
}

/// Formats `dt` back into the canonical `D:YYYYMMDDHHmmSSOHH'mm'` form.
pub fn format_pdf_date(dt: OffsetDateTime) -> String {
    let offset = dt.offset();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{}{:02}'{:02}'",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        sign,
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_date_with_positive_offset() {
        let dt = parse_pdf_date("D:20230615143000+05'30'").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(u8::from(dt.month()), 6);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.offset().whole_hours(), 5);
    }

    #[test]
    fn parses_date_only_defaults_midnight_utc() {
        let dt = parse_pdf_date("D:19990101").unwrap();
        assert_eq!(dt.year(), 1999);
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.offset(), UtcOffset::UTC);
    }

    #[test]
    fn parses_z_suffix_as_utc() {
        let dt = parse_pdf_date("D:20000101120000Z").unwrap();
        assert_eq!(dt.offset(), UtcOffset::UTC);
    }

    #[test]
    fn roundtrips_through_format() {
        let dt = parse_pdf_date("D:20230615143000+05'30'").unwrap();
        let formatted = format_pdf_date(dt);
        let reparsed = parse_pdf_date(&formatted).unwrap();
        assert_eq!(dt.year(), reparsed.year());
        assert_eq!(dt.hour(), reparsed.hour());
    }

    #[test]
    fn rejects_too_short_string() {
        assert!(parse_pdf_date("D:12").is_err());
    }
}
