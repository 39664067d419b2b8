use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

/// Append-only jsonl log of failed requests and rejected commands, so a
/// session's errors survive the TUI being torn down.
#[derive(Clone, Debug)]
pub struct ErrorLogStore {
    path: PathBuf,
}

#[derive(Serialize)]
struct StoredErrorEntry<'a> {
    timestamp_ms: i64,
    kind: &'a str,
    message: &'a str,
}

impl ErrorLogStore {
    pub fn new(path: PathBuf) -> Self {
        ErrorLogStore { path }
    }

    /// `kind` names the operation that failed ("refresh", "control",
    /// "chart", ...), so the log can be filtered after the fact.
    pub fn append(&self, kind: &str, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let entry = StoredErrorEntry {
            timestamp_ms: Local::now().timestamp_millis(),
            kind,
            message,
        };
        serde_json::to_writer(&mut file, &entry)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_line_per_entry() {
        let dir = std::env::temp_dir().join(format!("quantdeck-log-{}", std::process::id()));
        let path = dir.join("errors.jsonl");
        let store = ErrorLogStore::new(path.clone());
        store.append("refresh", "server returned HTTP 502").unwrap();
        store.append("control", "control command for bot 1 failed").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "refresh");
        assert!(first["timestamp_ms"].as_i64().unwrap() > 0);
        fs::remove_dir_all(&dir).ok();
    }
}
