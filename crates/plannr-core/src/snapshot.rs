use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, anyhow};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::adapter::RawRecord;
use crate::model::Item;

/// Reads a snapshot from `path` (`-` for stdin) and normalizes every record.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_items(path: &Path) -> anyhow::Result<Vec<Item>> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed reading snapshot from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };

    let records = parse_records(&raw)
        .with_context(|| format!("failed parsing snapshot {}", path.display()))?;
    let items: Vec<Item> = records.into_iter().map(RawRecord::into_item).collect();

    info!(count = items.len(), "loaded snapshot");
    Ok(items)
}

/// Accepts a JSON array, a grouped `{"tasks": [..], "events": [..]}` object, a single
/// record object, or JSON Lines. Only broken JSON is an error; a record whose fields
/// have the wrong shape is logged and skipped.
pub fn parse_records(raw: &str) -> anyhow::Result<Vec<RawRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        debug!("parsing snapshot as json array");
        let values: Vec<Value> = serde_json::from_str(trimmed).context("invalid json array")?;
        return Ok(decode_all(values, None));
    }

    if trimmed.starts_with('{')
        && let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(trimmed)
    {
        if object.contains_key("tasks") || object.contains_key("events") {
            let tasks = take_group(&mut object, "tasks");
            let events = take_group(&mut object, "events");
            debug!(
                tasks = tasks.len(),
                events = events.len(),
                "parsing snapshot as grouped payload"
            );
            let mut out = decode_all(tasks, Some("task"));
            out.extend(decode_all(events, Some("event")));
            return Ok(out);
        }

        debug!("parsing snapshot as a single record");
        return Ok(decode_all(vec![Value::Object(object)], None));
    }

    debug!("parsing snapshot as jsonl");
    load_jsonl(raw)
}

fn take_group(object: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match object.remove(key) {
        Some(Value::Array(values)) => values,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            warn!(group = key, "group is not an array; skipping");
            Vec::new()
        }
    }
}

fn decode_all(values: Vec<Value>, kind: Option<&str>) -> Vec<RawRecord> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| decode_record(idx + 1, value, kind))
        .collect()
}

fn decode_record(position: usize, value: Value, kind: Option<&str>) -> Option<RawRecord> {
    let mut record = match serde_json::from_value::<RawRecord>(value) {
        Ok(record) => record,
        Err(err) => {
            warn!(record = position, error = %err, "skipping malformed record");
            return None;
        }
    };
    if record.kind.is_none() {
        record.kind = kind.map(str::to_string);
    }
    Some(record)
}

fn load_jsonl(raw: &str) -> anyhow::Result<Vec<RawRecord>> {
    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|err| anyhow!("line {}: {err}", idx + 1))?;
        out.extend(decode_record(idx + 1, value, None));
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::parse_records;
    use crate::model::ItemKind;

    #[test]
    fn reads_json_array() {
        let raw = r#"[{"id": 1, "title": "a"}, {"id": 2, "title": "b", "date": "2025-01-01"}]"#;
        let records = parse_records(raw).expect("parse array");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn reads_jsonl_and_skips_blank_lines() {
        let raw = "{\"id\": 1, \"title\": \"a\"}\n\n{\"id\": 2, \"title\": \"b\"}\n";
        let records = parse_records(raw).expect("parse jsonl");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn grouped_payload_tags_kinds() {
        let raw = r#"{"tasks": [{"id": "t", "title": "task"}], "events": [{"id": "e", "title": "event", "startDate": "2025-01-01"}]}"#;
        let items: Vec<_> = parse_records(raw)
            .expect("parse grouped")
            .into_iter()
            .map(|r| r.into_item())
            .collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, ItemKind::Task);
        assert_eq!(items[1].kind, ItemKind::Event);
    }

    #[test]
    fn empty_grouped_payload_has_no_records() {
        assert!(parse_records(r#"{"tasks": [], "events": []}"#)
            .expect("one line")
            .is_empty());
        let pretty = "{\n  \"tasks\": [],\n  \"events\": []\n}\n";
        assert!(parse_records(pretty).expect("pretty").is_empty());
        assert!(parse_records(r#"{"events": []}"#).expect("events only").is_empty());
        assert!(parse_records("  \n").expect("blank").is_empty());
    }

    #[test]
    fn pretty_printed_single_record_is_read() {
        let raw = "{\n  \"id\": \"t1\",\n  \"title\": \"Essay\"\n}\n";
        let records = parse_records(raw).expect("single record");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("Essay"));
    }

    #[test]
    fn mistyped_record_is_skipped_not_fatal() {
        let raw = r#"[{"id":"ok","title":"fine"},{"id":"bad","title":"x","progress":"40"}]"#;
        let records = parse_records(raw).expect("array with a bad record");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("fine"));

        let grouped = r#"{"tasks": [{"id": "t", "title": "kept"}, {"id": "p", "isPersonal": "yes"}],
                          "events": [{"id": "e", "date": 20250101}]}"#;
        let items: Vec<_> = parse_records(grouped)
            .expect("grouped with bad records")
            .into_iter()
            .map(|r| r.into_item())
            .collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "t");

        let jsonl = "{\"id\": 1, \"progress\": \"40\"}\n{\"id\": 2, \"title\": \"b\"}\n";
        assert_eq!(parse_records(jsonl).expect("jsonl").len(), 1);
    }

    #[test]
    fn broken_json_is_still_an_error() {
        assert!(parse_records("[{\"id\": 1},").is_err());
    }

    #[test]
    fn bad_jsonl_line_reports_line_number() {
        let raw = "{\"id\": 1}\nnot json\n";
        let err = parse_records(raw).expect_err("should fail");
        assert!(err.to_string().contains("line 2"));
    }
}
