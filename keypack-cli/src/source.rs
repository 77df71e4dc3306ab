//! Record sources for the analyzer

use anyhow::{Context, Result};
use keypack_core::{Record, StructuredKey, Value};
use serde::Deserialize;
use std::io::BufRead;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// One input line: `{"row": "...", "cf": "...", "cq": "...", "cv": "...", "ts": 1, "value": "..."}`
#[derive(Debug, Deserialize)]
struct RecordLine {
    row: String,
    #[serde(default)]
    cf: String,
    #[serde(default)]
    cq: String,
    #[serde(default)]
    cv: String,
    #[serde(default)]
    ts: u64,
    #[serde(default)]
    value: String,
}

impl From<RecordLine> for Record {
    fn from(line: RecordLine) -> Self {
        Record::new(
            StructuredKey::new(line.row, line.cf, line.cq, line.cv, line.ts),
            Value::from(line.value.into_bytes()),
        )
    }
}

/// Lazily parse JSON-lines records; blank lines and `#` comments are skipped
pub fn json_lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Record>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(anyhow::Error::new(e).context(format!("reading line {}", i + 1)))),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            Some(
                serde_json::from_str::<RecordLine>(trimmed)
                    .map(Record::from)
                    .with_context(|| format!("invalid record on line {}", i + 1)),
            )
        })
}

/// Synthetic scan: random UUID row, family and qualifier, a fixed
/// visibility and one timestamp, sorted like a real scan
pub fn generate(count: usize) -> Vec<Record> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    let mut records: Vec<Record> = (0..count)
        .map(|_| {
            Record::new(
                StructuredKey::new(
                    Uuid::new_v4().to_string(),
                    Uuid::new_v4().to_string(),
                    Uuid::new_v4().to_string(),
                    "A&B&C",
                    timestamp,
                ),
                Value::empty(),
            )
        })
        .collect();
    records.sort_by(|a, b| a.key().cmp(b.key()));
    records
}
