use std::collections::BTreeSet;
use std::io::{
  self,
  Write
};

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDateTime;
use tracing::{
  debug,
  info,
  instrument
};

use crate::activity::is_active;
use crate::cli::{
  Command,
  ListArgs
};
use crate::config::Config;
use crate::dashboard::summarize;
use crate::datetime::parse_date_expr;
use crate::due::is_overdue;
use crate::filter::{
  DateRange,
  FilterOptions,
  filter
};
use crate::model::{
  Item,
  Priority,
  Status
};
use crate::render::Renderer;
use crate::sort::{
  SortKey,
  sort
};

/// Everything a command needs,
/// resolved once per invocation. `now`
/// is project-local and already honours
/// `--now`; relative date flags count
/// from it.
pub struct Session<'a> {
  pub cfg:      &'a Config,
  pub renderer: &'a Renderer,
  pub items:    &'a [Item],
  pub now:      NaiveDateTime
}

#[instrument(skip(session))]
pub fn dispatch(
  session: &Session<'_>,
  command: Command
) -> anyhow::Result<()> {
  let mut out = io::stdout().lock();
  match command {
    | Command::List(args) => {
      cmd_list(session, &mut out, &args)
    }
    | Command::Active => {
      cmd_active(session, &mut out)
    }
    | Command::Overdue => {
      cmd_overdue(session, &mut out)
    }
    | Command::Show {
      id
    } => cmd_show(session, &mut out, &id),
    | Command::Summary {
      json
    } => {
      cmd_summary(session, &mut out, json)
    }
  }
}

#[instrument(skip(session, out, args))]
pub fn cmd_list<W: Write>(
  session: &Session<'_>,
  out: W,
  args: &ListArgs
) -> anyhow::Result<()> {
  let options =
    build_filter_options(session, args)?;
  let key = match args.sort.as_deref() {
    | Some(raw) => raw.parse::<SortKey>()?,
    | None => session.cfg.default_sort()?
  };

  let kept = filter(
    session.items,
    &args.search,
    &options
  );
  let ordered = sort(&kept, key);
  info!(
    shown = ordered.len(),
    total = session.items.len(),
    %key,
    "list"
  );

  let renderer = session
    .renderer
    .clone()
    .with_compact(
      args.compact || session.cfg.compact()
    );
  renderer.write_item_table(
    out,
    &ordered,
    session.now
  )
}

#[instrument(skip(session, out))]
pub fn cmd_active<W: Write>(
  session: &Session<'_>,
  out: W
) -> anyhow::Result<()> {
  let active: Vec<Item> = session
    .items
    .iter()
    .filter(|item| {
      is_active(
        &item.schedule,
        session.now
      )
    })
    .cloned()
    .collect();
  debug!(count = active.len(), "active items");

  session.renderer.write_item_table(
    out,
    &sort(&active, SortKey::Date),
    session.now
  )
}

#[instrument(skip(session, out))]
pub fn cmd_overdue<W: Write>(
  session: &Session<'_>,
  out: W
) -> anyhow::Result<()> {
  let today = session.now.date();
  let overdue: Vec<Item> = session
    .items
    .iter()
    .filter(|item| {
      is_overdue(item, today)
    })
    .cloned()
    .collect();
  debug!(count = overdue.len(), "overdue items");

  session.renderer.write_item_table(
    out,
    &sort(&overdue, SortKey::Date),
    session.now
  )
}

#[instrument(skip(session, out))]
pub fn cmd_show<W: Write>(
  session: &Session<'_>,
  out: W,
  id: &str
) -> anyhow::Result<()> {
  let item = session
    .items
    .iter()
    .find(|item| item.id == id)
    .ok_or_else(|| {
      anyhow!("no item with id: {id}")
    })?;

  session.renderer.write_item_detail(
    out,
    item,
    session.now
  )
}

#[instrument(skip(session, out))]
pub fn cmd_summary<W: Write>(
  session: &Session<'_>,
  mut out: W,
  json: bool
) -> anyhow::Result<()> {
  let summary =
    summarize(session.items, session.now);
  if json {
    let raw =
      serde_json::to_string_pretty(
        &summary
      )
      .context(
        "failed to serialize summary"
      )?;
    writeln!(out, "{raw}")?;
    return Ok(());
  }

  session
    .renderer
    .write_summary(out, &summary)
}

fn build_filter_options(
  session: &Session<'_>,
  args: &ListArgs
) -> anyhow::Result<FilterOptions> {
  let status = args
    .status
    .iter()
    .map(|raw| raw.parse::<Status>())
    .collect::<anyhow::Result<
      BTreeSet<_>
    >>()
    .context("invalid --status")?;

  let priority = args
    .priority
    .iter()
    .map(|raw| raw.parse::<Priority>())
    .collect::<anyhow::Result<
      BTreeSet<_>
    >>()
    .context("invalid --priority")?;

  let date_range = match &args.from {
    | Some(from) => {
      let from =
        parse_date_expr(from, session.now)
          .context("invalid --from")?
          .date();
      let to = args
        .to
        .as_deref()
        .map(|to| {
          parse_date_expr(
            to,
            session.now
          )
          .map(|dt| dt.date())
        })
        .transpose()
        .context("invalid --to")?;
      Some(DateRange::new(from, to))
    }
    | None => None
  };

  Ok(FilterOptions {
    status,
    priority,
    assignees: args
      .assignee
      .iter()
      .cloned()
      .collect(),
    date_range,
    show_completed: !args.hide_completed
      && session.cfg.show_completed(),
    show_personal: !args.hide_personal
      && session.cfg.show_personal()
  })
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime
  };

  use super::{
    Session,
    cmd_list,
    cmd_overdue,
    cmd_show,
    cmd_summary
  };
  use crate::cli::ListArgs;
  use crate::config::Config;
  use crate::model::{
    Item,
    Priority,
    Status
  };
  use crate::render::Renderer;

  fn items() -> Vec<Item> {
    let mut essay =
      Item::new_task("t1", "Essay");
    essay.priority = Some(Priority::Low);
    essay.schedule.due_date =
      NaiveDate::from_ymd_opt(
        2025, 6, 1
      );

    let mut lab =
      Item::new_task("t2", "Lab report");
    lab.priority =
      Some(Priority::Urgent);
    lab.status = Status::Done;

    vec![essay, lab]
  }

  fn run<F>(f: F) -> String
  where
    F: FnOnce(
      &Session<'_>,
      &mut Vec<u8>
    ) -> anyhow::Result<()>
  {
    let cfg = Config::default();
    let renderer = Renderer::plain();
    let items = items();
    let session = Session {
      cfg:      &cfg,
      renderer: &renderer,
      items:    &items,
      now:      NaiveDateTime::parse_from_str(
        "2025-06-15T10:00",
        "%Y-%m-%dT%H:%M"
      )
      .unwrap()
    };
    let mut buf = Vec::new();
    f(&session, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
  }

  #[test]
  fn list_sorts_by_requested_key() {
    let args = ListArgs {
      sort: Some("priority".into()),
      ..ListArgs::default()
    };
    let text = run(|s, out| {
      cmd_list(s, out, &args)
    });
    let lab = text
      .find("Lab report")
      .unwrap();
    let essay =
      text.find("Essay").unwrap();
    assert!(lab < essay);
  }

  #[test]
  fn list_hides_completed_on_request() {
    let args = ListArgs {
      hide_completed: true,
      ..ListArgs::default()
    };
    let text = run(|s, out| {
      cmd_list(s, out, &args)
    });
    assert!(!text.contains("Lab report"));
    assert!(text.contains("Essay"));
  }

  #[test]
  fn list_rejects_unknown_sort_and_status()
   {
    let cfg = Config::default();
    let renderer = Renderer::plain();
    let items = items();
    let session = Session {
      cfg:      &cfg,
      renderer: &renderer,
      items:    &items,
      now:      NaiveDateTime::default()
    };

    let bad_sort = ListArgs {
      sort: Some("urgency".into()),
      ..ListArgs::default()
    };
    assert!(
      cmd_list(
        &session,
        Vec::new(),
        &bad_sort
      )
      .is_err()
    );

    let bad_status = ListArgs {
      status: vec!["Blocked".into()],
      ..ListArgs::default()
    };
    assert!(
      cmd_list(
        &session,
        Vec::new(),
        &bad_status
      )
      .is_err()
    );
  }

  #[test]
  fn relative_from_counts_from_session_now()
  {
    // Session now is 2025-06-15 10:00,
    // far from the real clock.
    let today = ListArgs {
      from: Some("today".into()),
      ..ListArgs::default()
    };
    let text = run(|s, out| {
      cmd_list(s, out, &today)
    });
    assert!(!text.contains("Essay"));

    let back = ListArgs {
      from: Some("-14d".into()),
      to: Some("today".into()),
      ..ListArgs::default()
    };
    let text = run(|s, out| {
      cmd_list(s, out, &back)
    });
    assert!(text.contains("Essay"));
  }

  #[test]
  fn overdue_and_show_and_summary() {
    let overdue =
      run(|s, out| cmd_overdue(s, out));
    assert!(overdue.contains("Essay"));
    assert!(!overdue.contains("Lab"));

    let detail = run(|s, out| {
      cmd_show(s, out, "t2")
    });
    assert!(detail.contains("Lab report"));

    let summary = run(|s, out| {
      cmd_summary(s, out, true)
    });
    assert!(
      summary.contains("\"overdue\": 1")
    );
  }
}
