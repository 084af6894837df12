use chrono::NaiveDate;

use crate::model::{
  Item,
  Schedule
};

/// The date an item is due.
///
/// A start/end period is due at its end;
/// otherwise the discrete `due_date`
/// applies. `None` means the item has no
/// deadline.
#[must_use]
pub fn effective_due_date(
  schedule: &Schedule
) -> Option<NaiveDate> {
  match (
    schedule.start_date,
    schedule.end_date
  ) {
    | (Some(_), Some(end)) => Some(end),
    | _ => schedule.due_date
  }
}

#[must_use]
pub fn is_overdue(
  item: &Item,
  today: NaiveDate
) -> bool {
  if item.is_done() {
    return false;
  }
  effective_due_date(&item.schedule)
    .map(|due| due < today)
    .unwrap_or(false)
}

/// Signed whole days from `today` to the
/// due date; negative once overdue.
#[must_use]
pub fn days_until_due(
  schedule: &Schedule,
  today: NaiveDate
) -> Option<i64> {
  effective_due_date(schedule).map(
    |due| (due - today).num_days()
  )
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::model::{
    Item,
    Schedule,
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
  fn period_end_wins_over_due_date() {
    let schedule = Schedule {
      start_date: date("2025-01-01"),
      end_date: date("2025-01-05"),
      due_date: date("2025-03-01"),
      ..Schedule::default()
    };
    assert_eq!(
      effective_due_date(&schedule),
      date("2025-01-05")
    );
  }

  #[test]
  fn falls_back_to_due_date() {
    let schedule = Schedule {
      due_date: date("2025-02-02"),
      ..Schedule::default()
    };
    assert_eq!(
      effective_due_date(&schedule),
      date("2025-02-02")
    );

    let open_ended = Schedule {
      start_date: date("2025-01-01"),
      due_date: date("2025-02-02"),
      ..Schedule::default()
    };
    assert_eq!(
      effective_due_date(&open_ended),
      date("2025-02-02")
    );
  }

  #[test]
  fn no_date_fields_means_absent() {
    assert_eq!(
      effective_due_date(
        &Schedule::default()
      ),
      None
    );
  }

  #[test]
  fn overdue_ignores_done_items() {
    let today = date("2025-06-15")
      .expect("valid today");
    let mut item =
      Item::new_task("1", "essay");
    item.schedule.due_date =
      date("2025-06-14");
    assert!(is_overdue(&item, today));

    item.status = Status::Done;
    assert!(!is_overdue(&item, today));

    let mut on_time =
      Item::new_task("2", "lab");
    on_time.schedule.due_date =
      date("2025-06-15");
    assert!(
      !is_overdue(&on_time, today)
    );
    assert_eq!(
      days_until_due(
        &on_time.schedule,
        today
      ),
      Some(0)
    );
  }
}
