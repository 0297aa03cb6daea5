//! Lenient parsers for the free-text cells and values the feeds return.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Parse a decimal written with either `.` or `,` as the separator.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
  Decimal::from_str(&normalise_separator(raw)).ok()
}

/// Parse a float written with either `.` or `,` as the separator.
pub fn parse_float(raw: &str) -> Option<f64> {
  normalise_separator(raw).parse().ok()
}

fn normalise_separator(raw: &str) -> String { raw.trim().replace(',', ".") }

/// Parse a calendar date, resolving ambiguity toward day-first.
///
/// Accepts `DD.MM.YYYY`, `DD/MM/YYYY` and `DD-MM-YYYY` (two-digit years are
/// taken as 20YY), plus ISO `YYYY-MM-DD` when the first field has four
/// digits. A trailing time of day is ignored.
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
  let date_part = raw.split_whitespace().next()?;
  let fields: Vec<&str> = date_part.split(['.', '/', '-']).collect();
  if fields.len() != 3
    || fields
      .iter()
      .any(|f| f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()))
  {
    return None;
  }

  let (year, month, day) = if fields[0].len() == 4 {
    (fields[0], fields[1], fields[2])
  } else {
    (fields[2], fields[1], fields[0])
  };

  let year: i32 = match year.len() {
    4 => year.parse().ok()?,
    2 => 2000 + year.parse::<i32>().ok()?,
    _ => return None,
  };

  NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}
