pub mod activity;
pub mod adapter;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod datetime;
pub mod due;
pub mod filter;
pub mod format;
pub mod model;
pub mod range;
pub mod render;
pub mod snapshot;
pub mod sort;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use activity::{
  is_active,
  is_active_at,
  is_active_in
};
pub use due::effective_due_date;
pub use filter::{
  DateRange,
  FilterOptions,
  filter
};
pub use model::{
  Item,
  ItemKind,
  Participant,
  Priority,
  Schedule,
  Status
};
pub use range::{
  duration,
  format_range,
  format_range_compact
};
pub use sort::{
  SortKey,
  sort
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting plannr"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.planrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  if let Some(tz) = cfg.get("timezone") {
    datetime::init_project_timezone(&tz)?;
  }

  let clock =
    datetime::to_project_datetime(
      Utc::now()
    );
  let now = match cli.now.as_deref() {
    | Some(expr) => {
      datetime::parse_date_expr(
        expr, clock
      )
      .context("invalid --now")?
    }
    | None => clock
  };
  debug!(%now, "resolved current time");

  let items = snapshot::load_items(
    &cli.input
  )
  .with_context(|| {
    format!(
      "failed to load items from {}",
      cli.input.display()
    )
  })?;

  let renderer =
    render::Renderer::new(&cfg)?;
  let session = commands::Session {
    cfg: &cfg,
    renderer: &renderer,
    items: &items,
    now
  };

  commands::dispatch(
    &session,
    cli.command
  )?;

  info!("done");
  Ok(())
}
