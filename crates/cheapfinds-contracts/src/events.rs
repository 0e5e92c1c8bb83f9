use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::search::SearchMode;

/// Something the pipeline did, as written to the event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    SearchStarted {
        mode: SearchMode,
        region: String,
        images: usize,
        has_description: bool,
    },
    SearchFinished {
        mode: SearchMode,
        answer_chars: usize,
        citations: usize,
        offers: usize,
    },
    SearchFailed {
        mode: SearchMode,
        error_kind: String,
        message: String,
    },
    ChatTurnFinished {
        turns: usize,
        reply_chars: usize,
    },
    ChatTurnFailed {
        turns: usize,
        error_kind: String,
        message: String,
    },
}

/// Append-only JSONL log.
///
/// Every line carries `type`, `session_id` and `ts` followed by the event's
/// own fields, one compact JSON object per line.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn record(&self, event: &PipelineEvent) -> anyhow::Result<Value> {
        let Value::Object(fields) = serde_json::to_value(event)? else {
            anyhow::bail!("pipeline event did not serialize to an object");
        };
        let mut line = Map::new();
        if let Some(kind) = fields.get("type") {
            line.insert("type".to_string(), kind.clone());
        }
        line.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        line.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in fields {
            if key != "type" {
                line.insert(key, value);
            }
        }
        let line = Value::Object(line);
        self.append(&line)?;
        Ok(line)
    }

    fn append(&self, line: &Value) -> anyhow::Result<()> {
        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_string(line)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(encoded.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::{json, Value};

    use crate::search::SearchMode;

    use super::{EventWriter, PipelineEvent};

    #[test]
    fn record_writes_tagged_jsonl_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("logs").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        let written = writer.record(&PipelineEvent::SearchStarted {
            mode: SearchMode::Multi,
            region: "Canada".to_string(),
            images: 2,
            has_description: true,
        })?;

        let content = fs::read_to_string(&path)?;
        let parsed: Value = serde_json::from_str(content.lines().next().unwrap_or(""))?;
        assert_eq!(parsed, written);
        assert_eq!(parsed["type"], json!("search_started"));
        assert_eq!(parsed["session_id"], json!("session-123"));
        assert_eq!(parsed["mode"], json!("MULTI"));
        assert_eq!(parsed["images"], json!(2));
        DateTime::parse_from_rfc3339(parsed["ts"].as_str().unwrap_or(""))?;
        Ok(())
    }

    #[test]
    fn record_appends_in_order() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        writer.record(&PipelineEvent::ChatTurnFinished {
            turns: 2,
            reply_chars: 40,
        })?;
        writer.record(&PipelineEvent::ChatTurnFailed {
            turns: 4,
            error_kind: "transport".to_string(),
            message: "timeout".to_string(),
        })?;

        let types: Vec<String> = fs::read_to_string(&path)?
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row["type"].as_str().map(str::to_string))
            .collect();
        assert_eq!(types, vec!["chat_turn_finished", "chat_turn_failed"]);
        Ok(())
    }
}
