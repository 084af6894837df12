use std::collections::BTreeSet;

use chrono::{
  NaiveDate,
  NaiveDateTime,
  NaiveTime
};
use tracing::{
  debug,
  trace
};

use crate::datetime::start_of_day;
use crate::due::effective_due_date;
use crate::model::{
  Item,
  Priority,
  Status
};

/// Inclusive calendar window; `to`
/// defaults to `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub from: NaiveDate,
  pub to:   Option<NaiveDate>
}

impl DateRange {
  pub fn new(
    from: NaiveDate,
    to: Option<NaiveDate>
  ) -> Self {
    Self {
      from,
      to
    }
  }

  /// `[from 00:00, to 23:59:59.999]`.
  pub fn bounds(
    &self
  ) -> (NaiveDateTime, NaiveDateTime) {
    let to = self.to.unwrap_or(self.from);
    let end_of_day =
      NaiveTime::from_hms_milli_opt(
        23, 59, 59, 999
      )
      .unwrap_or(NaiveTime::MIN);
    (
      start_of_day(self.from),
      to.and_time(end_of_day)
    )
  }

  /// Interval overlap with
  /// `[start, end ?? start]`.
  pub fn overlaps(
    &self,
    start: NaiveDate,
    end: Option<NaiveDate>
  ) -> bool {
    let (lo, hi) = self.bounds();
    let item_start = start_of_day(start);
    let item_end = start_of_day(
      end.unwrap_or(start)
    );
    item_start <= hi && item_end >= lo
  }

  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    let (lo, hi) = self.bounds();
    let at = start_of_day(date);
    lo <= at && at <= hi
  }
}

/// Filter selections owned by the
/// caller; empty sets impose nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
  pub status:         BTreeSet<Status>,
  pub priority:       BTreeSet<Priority>,
  pub assignees:      BTreeSet<String>,
  pub date_range:     Option<DateRange>,
  pub show_completed: bool,
  pub show_personal:  bool
}

impl Default for FilterOptions {
  fn default() -> Self {
    Self {
      status:         BTreeSet::new(),
      priority:       BTreeSet::new(),
      assignees:      BTreeSet::new(),
      date_range:     None,
      show_completed: true,
      show_personal:  true
    }
  }
}

#[derive(Debug, Clone)]
enum Pred {
  TextContains(String),
  StatusIn(BTreeSet<Status>),
  PriorityIn(BTreeSet<Priority>),
  AssigneeIn(BTreeSet<String>),
  InRange(DateRange),
  HideCompleted,
  HidePersonal
}

/// Conjunction of predicates compiled
/// once from a search term and options.
#[derive(Debug, Clone, Default)]
pub struct Filter {
  preds: Vec<Pred>
}

impl Filter {
  pub fn new(
    search: &str,
    options: &FilterOptions
  ) -> Self {
    let mut preds = Vec::new();

    // Whitespace-only means no search;
    // otherwise the term is kept as typed.
    if !search.trim().is_empty() {
      preds.push(Pred::TextContains(
        search.to_lowercase()
      ));
    }
    if !options.status.is_empty() {
      preds.push(Pred::StatusIn(
        options.status.clone()
      ));
    }
    if !options.priority.is_empty() {
      preds.push(Pred::PriorityIn(
        options.priority.clone()
      ));
    }
    if !options.assignees.is_empty() {
      preds.push(Pred::AssigneeIn(
        options.assignees.clone()
      ));
    }
    if let Some(range) =
      options.date_range
    {
      preds.push(Pred::InRange(range));
    }
    if !options.show_completed {
      preds.push(Pred::HideCompleted);
    }
    if !options.show_personal {
      preds.push(Pred::HidePersonal);
    }

    Self {
      preds
    }
  }

  pub fn matches(
    &self,
    item: &Item
  ) -> bool {
    self
      .preds
      .iter()
      .all(|pred| eval_pred(pred, item))
  }

  pub fn is_empty(&self) -> bool {
    self.preds.is_empty()
  }
}

/// Items passing every selected
/// predicate, in input order.
#[tracing::instrument(skip(
  items, options
), fields(count = items.len()))]
pub fn filter(
  items: &[Item],
  search: &str,
  options: &FilterOptions
) -> Vec<Item> {
  let compiled =
    Filter::new(search, options);
  let out: Vec<Item> = items
    .iter()
    .filter(|item| {
      compiled.matches(item)
    })
    .cloned()
    .collect();
  debug!(
    kept = out.len(),
    dropped = items.len() - out.len(),
    "filtered items"
  );
  out
}

fn eval_pred(
  pred: &Pred,
  item: &Item
) -> bool {
  let ok = match pred {
    | Pred::TextContains(needle) => {
      text_matches(item, needle)
    }
    | Pred::StatusIn(set) => {
      set.contains(&item.status)
    }
    | Pred::PriorityIn(set) => item
      .priority
      .map(|p| set.contains(&p))
      .unwrap_or(false),
    | Pred::AssigneeIn(set) => {
      item
        .assignees
        .iter()
        .any(|a| set.contains(&a.id))
    }
    | Pred::InRange(range) => {
      match item.schedule.start_date {
        | Some(start) => range.overlaps(
          start,
          item.schedule.end_date
        ),
        | None => {
          effective_due_date(
            &item.schedule
          )
          .map(|due| {
            range.contains(due)
          })
          .unwrap_or(false)
        }
      }
    }
    | Pred::HideCompleted => {
      !item.is_done()
    }
    | Pred::HidePersonal => {
      !item.personal
    }
  };

  trace!(pred = ?pred, id = %item.id, ok, "filter predicate evaluation");
  ok
}

fn text_matches(
  item: &Item,
  needle: &str
) -> bool {
  let hit = |text: &str| {
    text.to_lowercase().contains(needle)
  };

  hit(&item.title)
    || item
      .description
      .as_deref()
      .is_some_and(hit)
    || item
      .assignees
      .iter()
      .any(|a| hit(&a.name))
    || item
      .location
      .as_deref()
      .is_some_and(hit)
}
