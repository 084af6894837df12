use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "plannr-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "PLANNR_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "PLANNR_TIME_CONFIG";

/// `plannr-time.toml`: a top-level
/// `timezone` or one in a `[time]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TimeFile {
  timezone: Option<String>,
  time:     Option<TimeTable>
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TimeTable {
  timezone: Option<String>
}

static PROJECT_TZ: OnceLock<Tz> =
  OnceLock::new();

pub fn project_timezone() -> &'static Tz
{
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

/// Pins the project timezone from the
/// `timezone` config key. Must run
/// before the first date conversion.
pub fn init_project_timezone(
  raw: &str
) -> anyhow::Result<()> {
  let tz = parse_timezone(raw, "planrc")
    .ok_or_else(|| {
      anyhow!(
        "invalid timezone setting: \
         {raw}"
      )
    })?;
  if PROJECT_TZ.set(tz).is_err() {
    tracing::warn!(
      timezone = %raw,
      current = %project_timezone(),
      "project timezone already \
       resolved; ignoring config"
    );
  }
  Ok(())
}

/// Wall-clock time in the project
/// timezone.
#[must_use]
pub fn to_project_datetime(
  dt: DateTime<Utc>
) -> NaiveDateTime {
  dt.with_timezone(project_timezone())
    .naive_local()
}

#[must_use]
pub fn to_project_date(
  dt: DateTime<Utc>
) -> NaiveDate {
  to_project_datetime(dt).date()
}

fn resolve_project_timezone() -> Tz {
  std::env::var(TIMEZONE_ENV_VAR)
    .ok()
    .and_then(|raw| {
      parse_timezone(
        &raw,
        TIMEZONE_ENV_VAR
      )
    })
    .or_else(timezone_from_file)
    .unwrap_or_else(|| {
      tracing::debug!(
        "no project timezone \
         configured; using UTC"
      );
      chrono_tz::UTC
    })
}

fn timezone_from_file() -> Option<Tz> {
  let path = std::env::var_os(
    TIMEZONE_CONFIG_ENV_VAR
  )
  .filter(|raw| !raw.is_empty())
  .map(PathBuf::from)
  .unwrap_or_else(|| {
    PathBuf::from(TIMEZONE_CONFIG_FILE)
  });
  if !path.is_file() {
    return None;
  }

  let source =
    format!("file:{}", path.display());
  let parsed = fs::read_to_string(&path)
    .context("unreadable")
    .and_then(|raw| {
      toml::from_str::<TimeFile>(&raw)
        .context("invalid toml")
    });

  match parsed {
    | Ok(file) => {
      let raw = file.timezone.or_else(
        || {
          file
            .time
            .and_then(|t| t.timezone)
        }
      )?;
      parse_timezone(&raw, &source)
    }
    | Err(err) => {
      tracing::error!(
        source = %source,
        error = ?err,
        "skipping timezone file"
      );
      None
    }
  }
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  match raw.trim().parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %tz,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = raw,
        error = %err,
        "invalid timezone id"
      );
      None
    }
  }
}

/// Reads a record date. Accepts
/// `YYYY-MM-DD` or an RFC 3339 timestamp
/// (date taken in the project timezone).
pub fn parse_date_lenient(
  raw: &str
) -> Option<NaiveDate> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Some(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(to_project_date(
      dt.with_timezone(&Utc)
    ));
  }

  // Date prefix of a longer value, e.g.
  // "2025-06-01T00:00:00".
  token.get(..10).and_then(|prefix| {
    NaiveDate::parse_from_str(
      prefix, "%Y-%m-%d"
    )
    .ok()
  })
}

/// Reads a record time of day:
/// `HH:MM`, `HH:MM:SS` or `h:mm am/pm`.
pub fn parse_time_lenient(
  raw: &str
) -> Option<NaiveTime> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(time) =
    NaiveTime::parse_from_str(
      token, "%H:%M:%S"
    )
  {
    return Some(time);
  }

  let (hour, minute) =
    parse_clock_time(token)?;
  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
}

/// Resolves a command-line date
/// expression to project-local wall
/// clock time. Relative forms count
/// from `local_now`.
#[tracing::instrument(skip(local_now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  local_now: NaiveDateTime
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let local_today = local_now.date();

  match lower.as_str() {
    | "now" => return Ok(local_now),
    | "today" => {
      return Ok(start_of_day(
        local_today
      ));
    }
    | "tomorrow" => {
      return Ok(start_of_day(
        local_today + Duration::days(1)
      ));
    }
    | "yesterday" => {
      return Ok(start_of_day(
        local_today - Duration::days(1)
      ));
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(start_of_day(
      next_weekday_date(
        local_today,
        target_weekday
      )
    ));
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => Duration::days(num),
      | "h" => Duration::hours(num),
      | "m" => Duration::minutes(num),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return Ok(
      if sign == "-" {
        local_now - duration
      } else {
        local_now + duration
      }
    );
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(to_project_datetime(
      dt.with_timezone(&Utc)
    ));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(start_of_day(date));
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/+Nh/+Nm, RFC3339, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM, \
     YYYY-MM-DD HH:MM"
  })
}

#[must_use]
pub fn start_of_day(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(NaiveTime::MIN)
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

fn clock_regex() -> Option<&'static Regex>
{
  static CLOCK_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  CLOCK_RE
    .get_or_init(|| {
      Regex::new(
        r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]\.?m\.?)?$",
      )
      .ok()
    })
    .as_ref()
}

fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let captures = clock_regex()?
    .captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .replace('.', "")
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}
