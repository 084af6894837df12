use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::debug;

use crate::due::effective_due_date;
use crate::model::{
  Item,
  ItemKind
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum SortKey {
  Date,
  Name,
  Priority
}

impl FromStr for SortKey {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "date" | "due" => Ok(Self::Date),
      | "name" | "title" => {
        Ok(Self::Name)
      }
      | "priority" | "progress" => {
        Ok(Self::Priority)
      }
      | other => Err(anyhow!(
        "unknown sort key: {other} \
         (expected date, name or \
         priority)"
      ))
    }
  }
}

impl fmt::Display for SortKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | Self::Date => "date",
      | Self::Name => "name",
      | Self::Priority => "priority"
    })
  }
}

/// Stable ordering into a fresh vector;
/// the input is not reordered.
#[tracing::instrument(skip(items), fields(count = items.len()))]
pub fn sort(
  items: &[Item],
  key: SortKey
) -> Vec<Item> {
  let mut out = items.to_vec();
  out.sort_by(|a, b| {
    compare_items(a, b, key)
  });
  debug!(%key, "sorted items");
  out
}

pub fn compare_items(
  a: &Item,
  b: &Item,
  key: SortKey
) -> Ordering {
  match key {
    | SortKey::Date => cmp_optional(
      effective_due_date(&a.schedule)
        .as_ref(),
      effective_due_date(&b.schedule)
        .as_ref()
    ),
    | SortKey::Name => {
      a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| {
          a.title.cmp(&b.title)
        })
    }
    | SortKey::Priority => {
      compare_urgency(a, b)
    }
  }
}

/// Tasks by priority rank, then events
/// by progress, highest first.
fn compare_urgency(
  a: &Item,
  b: &Item
) -> Ordering {
  match (a.kind, b.kind) {
    | (ItemKind::Task, ItemKind::Task) => {
      cmp_optional(
        a.priority
          .map(|p| p.rank())
          .as_ref(),
        b.priority
          .map(|p| p.rank())
          .as_ref()
      )
    }
    | (
      ItemKind::Event,
      ItemKind::Event
    ) => {
      match (a.progress, b.progress) {
        | (Some(x), Some(y)) => {
          y.total_cmp(&x)
        }
        | (Some(_), None) => {
          Ordering::Less
        }
        | (None, Some(_)) => {
          Ordering::Greater
        }
        | (None, None) => {
          Ordering::Equal
        }
      }
    }
    | (ItemKind::Task, ItemKind::Event) => {
      Ordering::Less
    }
    | (ItemKind::Event, ItemKind::Task) => {
      Ordering::Greater
    }
  }
}

/// `None` sorts after every value.
fn cmp_optional<T: Ord>(
  left: Option<&T>,
  right: Option<&T>
) -> Ordering {
  match (left, right) {
    | (Some(a), Some(b)) => a.cmp(b),
    | (Some(_), None) => Ordering::Less,
    | (None, Some(_)) => {
      Ordering::Greater
    }
    | (None, None) => Ordering::Equal
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    SortKey,
    sort
  };
  use crate::model::{
    Item,
    Priority
  };

  fn titles(
    items: &[Item]
  ) -> Vec<&str> {
    items
      .iter()
      .map(|i| i.title.as_str())
      .collect()
  }

  fn date(
    raw: &str
  ) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(
      raw, "%Y-%m-%d"
    )
    .ok()
  }

  #[test]
  fn name_sort_is_alphabetical() {
    let items = vec![
      Item::new_task("1", "Zeta"),
      Item::new_task("2", "Alpha"),
      Item::new_task("3", "beta"),
    ];
    let out = sort(&items, SortKey::Name);
    assert_eq!(titles(&out), vec![
      "Alpha", "beta", "Zeta"
    ]);
    assert_eq!(titles(&items), vec![
      "Zeta", "Alpha", "beta"
    ]);
  }

  #[test]
  fn priority_rank_puts_urgent_first() {
    let mut low =
      Item::new_task("1", "low");
    low.priority = Some(Priority::Low);
    let unset =
      Item::new_task("2", "unset");
    let mut urgent =
      Item::new_task("3", "urgent");
    urgent.priority =
      Some(Priority::Urgent);
    let mut normal =
      Item::new_task("4", "normal");
    normal.priority =
      Some(Priority::Normal);

    let items =
      vec![low, unset, urgent, normal];
    let out =
      sort(&items, SortKey::Priority);
    assert_eq!(titles(&out), vec![
      "urgent", "normal", "low",
      "unset"
    ]);
  }

  #[test]
  fn events_sort_by_progress_descending()
  {
    let mut half =
      Item::new_event("1", "half");
    half.progress = Some(50.0);
    let mut most =
      Item::new_event("2", "most");
    most.progress = Some(90.0);
    let none =
      Item::new_event("3", "none");
    let mut task =
      Item::new_task("4", "task");
    task.priority = Some(Priority::Low);

    let items =
      vec![half, none, most, task];
    let out =
      sort(&items, SortKey::Priority);
    assert_eq!(titles(&out), vec![
      "task", "most", "half", "none"
    ]);
  }

  #[test]
  fn date_sort_uses_effective_due_and_puts_absent_last()
   {
    let mut period =
      Item::new_task("1", "period");
    period.schedule.start_date =
      date("2025-01-01");
    period.schedule.end_date =
      date("2025-03-01");
    period.schedule.due_date =
      date("2025-01-02");

    let mut due =
      Item::new_task("2", "due");
    due.schedule.due_date =
      date("2025-02-01");

    let none =
      Item::new_task("3", "none");

    let items =
      vec![none, period, due];
    let out = sort(&items, SortKey::Date);
    assert_eq!(titles(&out), vec![
      "due", "period", "none"
    ]);
  }

  #[test]
  fn equal_keys_keep_input_order() {
    let items = vec![
      Item::new_task("1", "first"),
      Item::new_task("2", "second"),
      Item::new_task("3", "third"),
    ];
    let out = sort(&items, SortKey::Date);
    assert_eq!(titles(&out), vec![
      "first", "second", "third"
    ]);
  }

  #[test]
  fn unknown_sort_key_is_rejected() {
    assert_eq!(
      "progress"
        .parse::<SortKey>()
        .unwrap(),
      SortKey::Priority
    );
    assert!(
      "urgency"
        .parse::<SortKey>()
        .is_err()
    );
  }
}
