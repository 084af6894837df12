use chrono::{
  NaiveDate,
  NaiveTime
};

use crate::format::{
  format_date,
  format_date_compact,
  format_time,
  format_time_compact
};
use crate::model::Schedule;

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 =
  60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

#[derive(Debug, Clone, Copy)]
enum RangeStyle {
  Full,
  Compact { today: NaiveDate }
}

impl RangeStyle {
  fn date(
    &self,
    date: NaiveDate
  ) -> String {
    match self {
      | Self::Full => format_date(date),
      | Self::Compact {
        today
      } => {
        format_date_compact(date, *today)
      }
    }
  }

  fn time(
    &self,
    time: NaiveTime
  ) -> String {
    match self {
      | Self::Full => format_time(time),
      | Self::Compact {
        ..
      } => format_time_compact(time)
    }
  }

  fn same_day(
    &self,
    date: String,
    times: String
  ) -> String {
    match self {
      | Self::Full => {
        format!("{date}, {times}")
      }
      | Self::Compact {
        ..
      } => format!("{date} • {times}")
    }
  }

  fn multi_day_times(
    &self,
    times: String
  ) -> String {
    match self {
      | Self::Full => {
        format!(" ({times})")
      }
      | Self::Compact {
        ..
      } => format!(" • {times}")
    }
  }

  fn at(
    &self,
    date: String,
    time: String
  ) -> String {
    match self {
      | Self::Full => {
        format!("{date} at {time}")
      }
      | Self::Compact {
        ..
      } => format!("{date} • {time}")
    }
  }
}

/// Human-readable span of an item, as
/// shown in detail panels. Empty when the
/// item carries no date at all.
#[must_use]
pub fn format_range(
  schedule: &Schedule
) -> String {
  render_range(
    schedule,
    RangeStyle::Full
  )
}

/// Card variant of [`format_range`]:
/// same precedence, compact dates and
/// times, `•` separators.
#[must_use]
pub fn format_range_compact(
  schedule: &Schedule,
  today: NaiveDate
) -> String {
  render_range(
    schedule,
    RangeStyle::Compact {
      today
    }
  )
}

fn render_range(
  schedule: &Schedule,
  style: RangeStyle
) -> String {
  let times = match (
    schedule.start_time,
    schedule.end_time
  ) {
    | (Some(st), Some(et)) => Some(
      format!(
        "{} - {}",
        style.time(st),
        style.time(et)
      )
    ),
    | _ => None
  };

  if let (Some(start), Some(end)) = (
    schedule.start_date,
    schedule.end_date
  ) {
    if start == end {
      if let Some(times) = times {
        return style.same_day(
          style.date(start),
          times
        );
      }
    } else {
      let mut out = format!(
        "{} - {}",
        style.date(start),
        style.date(end)
      );
      if let Some(times) = times {
        out.push_str(
          &style.multi_day_times(times)
        );
      }
      return out;
    }
  }

  if let Some(start) =
    schedule.start_date
  {
    return match schedule.start_time {
      | Some(time) => style.at(
        style.date(start),
        style.time(time)
      ),
      | None => {
        format!(
          "From {}",
          style.date(start)
        )
      }
    };
  }

  if let Some(due) = schedule.due_date
  {
    return format!(
      "Due {}",
      style.date(due)
    );
  }

  String::new()
}

/// Elapsed time between two endpoints.
///
/// Units step down while fewer than two
/// whole units have elapsed, so exactly
/// one day reads "24 hours" and exactly
/// one hour reads "60 minutes". The
/// displayed count is rounded up. An end
/// before the start yields a negative
/// minute count.
#[must_use]
pub fn duration(
  start_date: NaiveDate,
  end_date: Option<NaiveDate>,
  start_time: Option<NaiveTime>,
  end_time: Option<NaiveTime>
) -> String {
  let Some(end_date) = end_date else {
    return String::new();
  };

  let start = start_date.and_time(
    start_time
      .unwrap_or(NaiveTime::MIN)
  );
  let end = end_date.and_time(
    end_time.unwrap_or(NaiveTime::MIN)
  );
  let delta_ms =
    (end - start).num_milliseconds();

  if delta_ms.div_euclid(MS_PER_DAY) > 1
  {
    return format!(
      "{} days",
      ceil_div(delta_ms, MS_PER_DAY)
    );
  }

  if delta_ms.div_euclid(MS_PER_HOUR)
    > 1
  {
    return format!(
      "{} hours",
      ceil_div(delta_ms, MS_PER_HOUR)
    );
  }

  format!(
    "{} minutes",
    ceil_div(delta_ms, MS_PER_MINUTE)
  )
}

/// [`duration`] over a normalized
/// record; empty without a start date.
#[must_use]
pub fn duration_of(
  schedule: &Schedule
) -> String {
  match schedule.start_date {
    | Some(start) => duration(
      start,
      schedule.end_date,
      schedule.start_time,
      schedule.end_time
    ),
    | None => String::new()
  }
}

fn ceil_div(
  value: i64,
  divisor: i64
) -> i64 {
  -(-value).div_euclid(divisor)
}
