use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDateTime;
use unicode_width::UnicodeWidthStr;

use crate::activity::is_active;
use crate::config::Config;
use crate::dashboard::Summary;
use crate::due::{effective_due_date, is_overdue};
use crate::format::format_date;
use crate::model::Item;
use crate::range::{duration_of, format_range, format_range_compact};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    compact: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let wanted = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };
        // Commands always write to stdout.
        let color = wanted && io::stdout().is_terminal();

        Ok(Self {
            color,
            compact: cfg.compact(),
        })
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            compact: false,
        }
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    #[tracing::instrument(skip(self, out, items, now), fields(count = items.len()))]
    pub fn write_item_table<W: Write>(
        &self,
        out: W,
        items: &[Item],
        now: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let today = now.date();
        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Status".to_string(),
            "Pri".to_string(),
            "When".to_string(),
            "Length".to_string(),
            "".to_string(),
        ];

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let when = if self.compact {
                format_range_compact(&item.schedule, today)
            } else {
                format_range(&item.schedule)
            };
            let when = if is_overdue(item, today) {
                self.paint(&when, "31")
            } else {
                when
            };

            let flag = if is_active(&item.schedule, now) {
                self.paint("now", "32")
            } else {
                String::new()
            };

            rows.push(vec![
                self.paint(&item.id, "33"),
                item.title.clone(),
                item.status.to_string(),
                item.priority.map(|p| p.to_string()).unwrap_or_default(),
                when,
                duration_of(&item.schedule),
                flag,
            ]);
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, item, now), fields(id = %item.id))]
    pub fn write_item_detail<W: Write>(
        &self,
        mut out: W,
        item: &Item,
        now: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let today = now.date();

        writeln!(out, "id        {}", item.id)?;
        writeln!(out, "kind      {:?}", item.kind)?;
        writeln!(out, "title     {}", item.title)?;
        writeln!(out, "status    {}", item.status)?;
        if let Some(priority) = item.priority {
            writeln!(out, "priority  {priority}")?;
        }
        if let Some(progress) = item.progress {
            writeln!(out, "progress  {progress}%")?;
        }
        if let Some(description) = &item.description {
            writeln!(out, "desc      {description}")?;
        }
        if let Some(location) = &item.location {
            writeln!(out, "location  {location}")?;
        }
        if !item.assignees.is_empty() {
            let names: Vec<&str> = item.assignees.iter().map(|a| a.name.as_str()).collect();
            writeln!(out, "people    {}", names.join(", "))?;
        }
        if item.personal {
            writeln!(out, "personal  yes")?;
        }

        writeln!(out, "when      {}", format_range(&item.schedule))?;
        writeln!(
            out,
            "card      {}",
            format_range_compact(&item.schedule, today)
        )?;

        let length = duration_of(&item.schedule);
        if !length.is_empty() {
            writeln!(out, "length    {length}")?;
        }
        if let Some(due) = effective_due_date(&item.schedule) {
            let overdue = if is_overdue(item, today) {
                self.paint(" (overdue)", "31")
            } else {
                String::new()
            };
            writeln!(out, "due       {}{overdue}", format_date(due))?;
        }
        writeln!(
            out,
            "active    {}",
            if is_active(&item.schedule, now) { "yes" } else { "no" }
        )?;

        Ok(())
    }

    pub fn write_summary<W: Write>(&self, mut out: W, summary: &Summary) -> anyhow::Result<()> {
        writeln!(out, "total        {}", summary.total)?;
        writeln!(out, "to do        {}", summary.to_do)?;
        writeln!(out, "in progress  {}", summary.in_progress)?;
        writeln!(out, "done         {}", summary.done)?;
        writeln!(
            out,
            "overdue      {}",
            self.paint(&summary.overdue.to_string(), "31")
        )?;
        writeln!(out, "due today    {}", summary.due_today)?;
        writeln!(out, "active now   {}", summary.active)?;
        writeln!(out, "personal     {}", summary.personal)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || text.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{Renderer, strip_ansi};
    use crate::config::Config;
    use crate::dashboard::Summary;
    use crate::model::{Item, Priority};

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-06-15T10:00", "%Y-%m-%dT%H:%M").unwrap()
    }

    #[test]
    fn table_aligns_columns_and_marks_active_items() {
        let mut lecture = Item::new_event("e1", "Lecture • hall B");
        lecture.schedule.start_date = NaiveDate::from_ymd_opt(2025, 6, 15);
        let mut essay = Item::new_task("t1", "Essay");
        essay.priority = Some(Priority::High);
        essay.schedule.due_date = NaiveDate::from_ymd_opt(2025, 6, 20);

        let mut buf = Vec::new();
        Renderer::plain()
            .write_item_table(&mut buf, &[lecture, essay], now())
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID "));
        assert!(lines[2].contains("From Jun 15, 2025"));
        assert!(lines[2].contains("now"));
        assert!(lines[3].contains("Due Jun 20, 2025"));
        assert!(lines[3].contains("High"));
    }

    #[test]
    fn detail_includes_both_range_forms() {
        let mut essay = Item::new_task("t1", "Essay");
        essay.schedule.due_date = NaiveDate::from_ymd_opt(2025, 6, 1);

        let mut buf = Vec::new();
        Renderer::plain()
            .write_item_detail(&mut buf, &essay, now())
            .unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("when      Due Jun 1, 2025"));
        assert!(text.contains("card      Due Jun 1"));
        assert!(text.contains("(overdue)"));
        assert!(text.contains("active    no"));
    }

    #[test]
    fn color_follows_the_renderer_not_the_writer() {
        let summary = Summary {
            total: 3,
            overdue: 2,
            ..Summary::default()
        };

        let mut colored = Vec::new();
        Renderer {
            color: true,
            compact: false,
        }
        .write_summary(&mut colored, &summary)
        .unwrap();
        let colored = String::from_utf8(colored).unwrap();
        assert!(colored.contains("overdue      \x1b[31m2\x1b[0m"));

        let mut plain = Vec::new();
        Renderer::plain().write_summary(&mut plain, &summary).unwrap();
        let plain = String::from_utf8(plain).unwrap();
        assert!(plain.contains("overdue      2\n"));
        assert_eq!(strip_ansi(&colored), plain);
    }

    #[test]
    fn color_setting_is_validated() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        let renderer = Renderer::new(&cfg).unwrap();
        assert!(!renderer.color);

        cfg.apply_overrides([("color".to_string(), "rainbow".to_string())]);
        assert!(Renderer::new(&cfg).is_err());
    }

    #[test]
    fn strip_ansi_removes_escape_codes() {
        assert_eq!(strip_ansi("\x1b[31mlate\x1b[0m"), "late");
    }
}
