//! Display formatting for record dates
//! and times.
//!
//! Two independent modes: the full form
//! used by detail panels ("Jan 1, 2024",
//! "1:00 PM") and the compact form used
//! by cards ("Jan 1", "1:00pm"). Empty or
//! unreadable input renders as "".

use chrono::{
  Datelike,
  NaiveDate,
  NaiveTime
};

use crate::datetime::{
  parse_date_lenient,
  parse_time_lenient
};

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format("%b %-d, %Y").to_string()
}

#[must_use]
pub fn format_time(
  time: NaiveTime
) -> String {
  time.format("%-I:%M %p").to_string()
}

/// Omits the year when it matches
/// `today`'s year.
#[must_use]
pub fn format_date_compact(
  date: NaiveDate,
  today: NaiveDate
) -> String {
  if date.year() == today.year() {
    date.format("%b %-d").to_string()
  } else {
    format_date(date)
  }
}

#[must_use]
pub fn format_time_compact(
  time: NaiveTime
) -> String {
  time.format("%-I:%M%P").to_string()
}

pub fn format_date_str(
  raw: &str
) -> String {
  parse_date_lenient(raw)
    .map(format_date)
    .unwrap_or_default()
}

pub fn format_time_str(
  raw: &str
) -> String {
  parse_time_lenient(raw)
    .map(format_time)
    .unwrap_or_default()
}

pub fn format_date_compact_str(
  raw: &str,
  today: NaiveDate
) -> String {
  parse_date_lenient(raw)
    .map(|date| {
      format_date_compact(date, today)
    })
    .unwrap_or_default()
}

pub fn format_time_compact_str(
  raw: &str
) -> String {
  parse_time_lenient(raw)
    .map(format_time_compact)
    .unwrap_or_default()
}
