use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use serde_json::Value;
use tracing::{
  debug,
  warn
};

use crate::datetime::{
  parse_date_lenient,
  parse_time_lenient,
  to_project_datetime
};
use crate::model::{
  Item,
  ItemKind,
  Participant,
  Priority,
  Schedule,
  Status
};

/// A task or event as the data layer
/// hands it over: camelCase or
/// snake_case field names, event
/// (`date`/`time`) or task
/// (`startDate`/`startTime`) form, or
/// `start_at`/`end_at` timestamps.
#[derive(
  Debug,
  Clone,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct RawRecord {
  pub id:          Option<Value>,
  pub kind:        Option<String>,
  #[serde(alias = "name")]
  pub title:       Option<String>,
  pub description: Option<String>,
  pub location:    Option<String>,
  pub status:      Option<String>,
  pub priority:    Option<String>,
  #[serde(alias = "members")]
  pub assignees:   Option<Vec<RawParticipant>>,
  #[serde(
    alias = "isPersonal",
    alias = "is_personal"
  )]
  pub personal:    Option<bool>,
  pub progress:    Option<f64>,

  #[serde(alias = "startDate")]
  pub start_date: Option<String>,
  #[serde(alias = "endDate")]
  pub end_date:   Option<String>,
  #[serde(alias = "startTime")]
  pub start_time: Option<String>,
  #[serde(alias = "endTime")]
  pub end_time:   Option<String>,
  #[serde(alias = "dueDate")]
  pub due_date:   Option<String>,
  pub date:       Option<String>,
  pub time:       Option<String>,
  #[serde(alias = "startAt")]
  pub start_at:   Option<String>,
  #[serde(alias = "endAt")]
  pub end_at:     Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
)]
#[serde(untagged)]
pub enum RawParticipant {
  Name(String),
  Full {
    #[serde(alias = "user_id")]
    id:   Value,
    #[serde(
      default,
      alias = "full_name",
      alias = "email"
    )]
    name: Option<String>
  }
}

impl RawParticipant {
  fn into_participant(
    self
  ) -> Participant {
    match self {
      | Self::Name(name) => {
        Participant {
          id: name.clone(),
          name
        }
      }
      | Self::Full {
        id,
        name
      } => {
        let id = value_to_string(&id);
        Participant {
          name: name.unwrap_or_else(
            || id.clone()
          ),
          id
        }
      }
    }
  }
}

impl RawRecord {
  /// Decides the record kind once and
  /// normalizes every field. Malformed
  /// values become absent; this never
  /// fails.
  pub fn into_item(self) -> Item {
    let id = self
      .id
      .as_ref()
      .map(value_to_string)
      .unwrap_or_default();
    let kind = resolve_kind(
      &id,
      self.kind.as_deref(),
      self.date.is_some()
    );
    let schedule =
      build_schedule(&id, &self);

    let status = match self
      .status
      .as_deref()
      .map(str::trim)
    {
      | None | Some("") => Status::ToDo,
      | Some(raw) => {
        raw.parse::<Status>().unwrap_or_else(
          |err| {
            warn!(
              %id,
              status = raw,
              error = %err,
              "unknown status; treating as To Do"
            );
            Status::ToDo
          }
        )
      }
    };

    let priority = match self
      .priority
      .as_deref()
      .map(str::trim)
    {
      | None | Some("") => None,
      | Some(raw) => {
        match raw.parse::<Priority>() {
          | Ok(p) => Some(p),
          | Err(err) => {
            warn!(
              %id,
              priority = raw,
              error = %err,
              "unknown priority; dropping"
            );
            None
          }
        }
      }
    };

    let item = Item {
      kind,
      title: self
        .title
        .unwrap_or_default(),
      description: self
        .description
        .filter(|d| !d.trim().is_empty()),
      location: self
        .location
        .filter(|l| !l.trim().is_empty()),
      status,
      priority,
      assignees: self
        .assignees
        .unwrap_or_default()
        .into_iter()
        .map(
          RawParticipant::into_participant
        )
        .collect(),
      personal: self
        .personal
        .unwrap_or(false),
      progress: self.progress,
      schedule,
      id
    };

    debug!(id = %item.id, kind = ?item.kind, "normalized record");
    item
  }
}

fn resolve_kind(
  id: &str,
  explicit: Option<&str>,
  has_event_date: bool
) -> ItemKind {
  let inferred = if has_event_date {
    ItemKind::Event
  } else {
    ItemKind::Task
  };

  match explicit
    .map(|k| k.trim().to_ascii_lowercase())
    .as_deref()
  {
    | Some("task") => ItemKind::Task,
    | Some("event") => ItemKind::Event,
    | None | Some("") => inferred,
    | Some(other) => {
      warn!(
        %id,
        kind = other,
        inferred = ?inferred,
        "unknown record kind; inferring from fields"
      );
      inferred
    }
  }
}

fn build_schedule(
  id: &str,
  raw: &RawRecord
) -> Schedule {
  let start_at =
    read_instant(id, "start_at", raw.start_at.as_deref());
  let end_at =
    read_instant(id, "end_at", raw.end_at.as_deref());

  let start_date = read_date(
    id,
    "start_date",
    raw.start_date
      .as_deref()
      .or(raw.date.as_deref())
  )
  .or(start_at.map(|dt| dt.date()));

  let start_time = read_time(
    id,
    "start_time",
    raw.start_time
      .as_deref()
      .or(raw.time.as_deref())
  )
  .or(start_at.map(|dt| dt.time()));

  let end_date = read_date(
    id,
    "end_date",
    raw.end_date.as_deref()
  )
  .or(end_at.map(|dt| dt.date()));

  let end_time = read_time(
    id,
    "end_time",
    raw.end_time.as_deref()
  )
  .or(end_at.map(|dt| dt.time()));

  let due_date = read_date(
    id,
    "due_date",
    raw.due_date.as_deref()
  );

  if let (Some(start), Some(end)) =
    (start_date, end_date)
    && end < start
  {
    warn!(
      %id,
      %start,
      %end,
      "end date precedes start date"
    );
  }

  Schedule {
    start_date,
    end_date,
    start_time,
    end_time,
    due_date
  }
}

fn read_date(
  id: &str,
  field: &str,
  raw: Option<&str>
) -> Option<NaiveDate> {
  let raw = raw?.trim();
  if raw.is_empty() {
    return None;
  }
  let parsed = parse_date_lenient(raw);
  if parsed.is_none() {
    warn!(
      %id,
      field,
      value = raw,
      "unreadable date; treating as absent"
    );
  }
  parsed
}

fn read_time(
  id: &str,
  field: &str,
  raw: Option<&str>
) -> Option<NaiveTime> {
  let raw = raw?.trim();
  if raw.is_empty() {
    return None;
  }
  let parsed = parse_time_lenient(raw);
  if parsed.is_none() {
    warn!(
      %id,
      field,
      value = raw,
      "unreadable time; treating as absent"
    );
  }
  parsed
}

fn read_instant(
  id: &str,
  field: &str,
  raw: Option<&str>
) -> Option<NaiveDateTime> {
  let raw = raw?.trim();
  if raw.is_empty() {
    return None;
  }
  match DateTime::parse_from_rfc3339(
    raw
  ) {
    | Ok(dt) => Some(
      to_project_datetime(
        dt.with_timezone(&Utc)
      )
    ),
    | Err(err) => {
      warn!(
        %id,
        field,
        value = raw,
        error = %err,
        "unreadable timestamp; treating as absent"
      );
      None
    }
  }
}

fn value_to_string(
  value: &Value
) -> String {
  match value {
    | Value::String(s) => s.clone(),
    | Value::Null => String::new(),
    | other => other.to_string()
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveTime
  };
  use serde_json::json;

  use super::RawRecord;
  use crate::model::{
    ItemKind,
    Priority,
    Status
  };

  fn record(
    value: serde_json::Value
  ) -> RawRecord {
    serde_json::from_value(value)
      .expect("valid raw record")
  }

  #[test]
  fn event_form_maps_onto_start_fields()
  {
    let item = record(json!({
      "id": 7,
      "title": "Study group",
      "date": "2025-06-15",
      "time": "09:00",
      "endTime": "11:30",
      "members": ["ana", {"id": "u2", "name": "Ben"}],
      "progress": 40
    }))
    .into_item();

    assert_eq!(item.id, "7");
    assert_eq!(item.kind, ItemKind::Event);
    assert_eq!(
      item.schedule.start_date,
      NaiveDate::from_ymd_opt(
        2025, 6, 15
      )
    );
    assert_eq!(
      item.schedule.start_time,
      NaiveTime::from_hms_opt(9, 0, 0)
    );
    assert_eq!(
      item.schedule.end_time,
      NaiveTime::from_hms_opt(
        11, 30, 0
      )
    );
    assert_eq!(item.assignees.len(), 2);
    assert_eq!(
      item.assignees[0].id,
      "ana"
    );
    assert_eq!(
      item.assignees[1].name,
      "Ben"
    );
    assert_eq!(item.progress, Some(40.0));
  }

  #[test]
  fn task_form_accepts_both_casings() {
    let camel = record(json!({
      "id": "t1",
      "title": "Essay",
      "status": "In Progress",
      "priority": "Urgent",
      "startDate": "2025-01-01",
      "endDate": "2025-01-05",
      "isPersonal": true
    }))
    .into_item();
    let snake = record(json!({
      "id": "t1",
      "title": "Essay",
      "status": "In Progress",
      "priority": "Urgent",
      "start_date": "2025-01-01",
      "end_date": "2025-01-05",
      "is_personal": true
    }))
    .into_item();

    assert_eq!(camel, snake);
    assert_eq!(camel.kind, ItemKind::Task);
    assert_eq!(
      camel.status,
      Status::InProgress
    );
    assert_eq!(
      camel.priority,
      Some(Priority::Urgent)
    );
    assert!(camel.personal);
  }

  #[test]
  fn persistence_timestamps_fill_dates_and_times()
   {
    let item = record(json!({
      "id": "e1",
      "kind": "event",
      "title": "Lecture",
      "start_at": "2025-06-15T09:00:00Z",
      "end_at": "2025-06-15T10:30:00Z"
    }))
    .into_item();

    assert_eq!(item.kind, ItemKind::Event);
    assert!(
      item.schedule.start_date.is_some()
    );
    assert!(
      item.schedule.end_time.is_some()
    );
  }

  #[test]
  fn malformed_values_degrade_to_absent()
  {
    let item = record(json!({
      "id": "bad",
      "title": "Broken",
      "status": "Archived",
      "priority": "Critical",
      "dueDate": "next week",
      "startTime": "25:99",
      "start_at": "yesterday"
    }))
    .into_item();

    assert_eq!(item.status, Status::ToDo);
    assert_eq!(item.priority, None);
    assert_eq!(item.schedule.due_date, None);
    assert_eq!(
      item.schedule.start_time,
      None
    );
    assert_eq!(
      item.schedule.start_date,
      None
    );
  }
}
