use chrono::{
  DateTime,
  NaiveDateTime,
  NaiveTime,
  Timelike,
  Utc
};
use chrono_tz::Tz;
use tracing::trace;

use crate::datetime::project_timezone;
use crate::model::Schedule;

/// Whether `now` falls inside the item's
/// active window.
///
/// The window spans `start_date` through
/// `end_date` (or just `start_date`). A
/// single-day item with both times is
/// only active between them, inclusive,
/// at minute resolution.
#[must_use]
pub fn is_active(
  schedule: &Schedule,
  now: NaiveDateTime
) -> bool {
  let Some(start) = schedule.start_date
  else {
    return false;
  };
  let end =
    schedule.end_date.unwrap_or(start);
  let today = now.date();

  if today < start || today > end {
    return false;
  }

  if start == end
    && let (
      Some(start_time),
      Some(end_time)
    ) = (
      schedule.start_time,
      schedule.end_time
    )
  {
    let current = minute_of(now.time());
    let active = minute_of(start_time)
      <= current
      && current <= minute_of(end_time);
    trace!(
      %start,
      %start_time,
      %end_time,
      %current,
      active,
      "same-day window check"
    );
    return active;
  }

  true
}

/// [`is_active`] for an absolute
/// instant, read in the project timezone.
#[must_use]
pub fn is_active_at(
  schedule: &Schedule,
  now: DateTime<Utc>
) -> bool {
  is_active_in(
    schedule,
    now,
    project_timezone()
  )
}

/// [`is_active`] for an absolute
/// instant, read in `tz`.
#[must_use]
pub fn is_active_in(
  schedule: &Schedule,
  now: DateTime<Utc>,
  tz: &Tz
) -> bool {
  is_active(
    schedule,
    now.with_timezone(tz).naive_local()
  )
}

fn minute_of(
  time: NaiveTime
) -> NaiveTime {
  NaiveTime::from_hms_opt(
    time.hour(),
    time.minute(),
    0
  )
  .unwrap_or(time)
}
