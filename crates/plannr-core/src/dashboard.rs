use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::activity::is_active;
use crate::due::{
  effective_due_date,
  is_overdue
};
use crate::model::{
  Item,
  Status
};

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct Summary {
  pub total:       usize,
  pub to_do:       usize,
  pub in_progress: usize,
  pub done:        usize,
  pub overdue:     usize,
  pub active:      usize,
  pub due_today:   usize,
  pub personal:    usize
}

#[tracing::instrument(skip(items), fields(count = items.len()))]
pub fn summarize(
  items: &[Item],
  now: NaiveDateTime
) -> Summary {
  let today = now.date();
  let mut summary = Summary {
    total: items.len(),
    ..Summary::default()
  };

  for item in items {
    match item.status {
      | Status::ToDo => {
        summary.to_do += 1
      }
      | Status::InProgress => {
        summary.in_progress += 1
      }
      | Status::Done => summary.done += 1
    }

    if is_overdue(item, today) {
      summary.overdue += 1;
    }
    if is_active(&item.schedule, now) {
      summary.active += 1;
    }
    if !item.is_done()
      && effective_due_date(
        &item.schedule
      ) == Some(today)
    {
      summary.due_today += 1;
    }
    if item.personal {
      summary.personal += 1;
    }
  }

  debug!(?summary, "built summary");
  summary
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime
  };

  use super::summarize;
  use crate::model::{
    Item,
    Status
  };

  fn date(
    raw: &str
  ) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(
      raw, "%Y-%m-%d"
    )
    .ok()
  }

  #[test]
  fn counts_statuses_and_deadlines() {
    let now =
      NaiveDateTime::parse_from_str(
        "2025-06-15T10:00",
        "%Y-%m-%dT%H:%M"
      )
      .unwrap();

    let mut late =
      Item::new_task("1", "late");
    late.schedule.due_date =
      date("2025-06-01");

    let mut today =
      Item::new_task("2", "today");
    today.status = Status::InProgress;
    today.schedule.due_date =
      date("2025-06-15");

    let mut running =
      Item::new_event("3", "running");
    running.schedule.start_date =
      date("2025-06-14");
    running.schedule.end_date =
      date("2025-06-16");
    running.personal = true;

    let mut finished =
      Item::new_task("4", "finished");
    finished.status = Status::Done;
    finished.schedule.due_date =
      date("2025-06-01");

    let summary = summarize(
      &[late, today, running, finished],
      now
    );
    assert_eq!(summary.total, 4);
    assert_eq!(summary.to_do, 2);
    assert_eq!(summary.in_progress, 1);
    assert_eq!(summary.done, 1);
    assert_eq!(summary.overdue, 1);
    assert_eq!(summary.active, 1);
    assert_eq!(summary.due_today, 1);
    assert_eq!(summary.personal, 1);
  }
}
