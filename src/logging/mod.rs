//! Structured event log: one JSON line per data load, refresh, export and
//! API request.
//!
//! Log file: `~/.ncdash/events.jsonl` (configurable via `[logging]`).
//! Writing is best-effort; a failure to log never fails the operation that
//! triggered it.

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;
use crate::records::DataQuality;
use crate::source::expand_home;

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Load,
    Refresh,
    Export,
    Request,
    Error,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Refresh => write!(f, "refresh"),
            Self::Export => write!(f, "export"),
            Self::Request => write!(f, "request"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: String,
    pub event: EventKind,
    /// Data source description, e.g. `csv:nc_data.csv`.
    pub source: String,
    #[serde(default)]
    pub rows: usize,
    #[serde(default)]
    pub coerced_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

impl EventEntry {
    pub fn new(event: EventKind, source: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event,
            source: source.to_string(),
            rows: 0,
            coerced_rows: 0,
            detail: None,
        }
    }

    pub fn with_quality(mut self, quality: &DataQuality) -> Self {
        self.rows = quality.rows;
        self.coerced_rows = quality.coerced_rows;
        self
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled || config.path.trim().is_empty() {
            return Self::disabled();
        }
        Self::at(expand_home(&config.path))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Append an entry. Best-effort: failures are silently ignored.
    pub fn record(&self, entry: &EventEntry) {
        let _ = self.append(entry);
    }

    /// Log a successful load with its data-quality counts.
    pub fn load(&self, source: &str, quality: &DataQuality) {
        self.record(&EventEntry::new(EventKind::Load, source).with_quality(quality));
    }

    pub fn refresh(&self, source: &str) {
        self.record(&EventEntry::new(EventKind::Refresh, source));
    }

    pub fn export(&self, source: &str, view: &str, rows: usize) {
        self.record(
            &EventEntry::new(EventKind::Export, source)
                .with_rows(rows)
                .with_detail(view),
        );
    }

    pub fn request(&self, source: &str, route: &str, status: u16) {
        self.record(&EventEntry::new(EventKind::Request, source).with_detail(format!("{route} {status}")));
    }

    pub fn error(&self, source: &str, message: &str) {
        self.record(&EventEntry::new(EventKind::Error, source).with_detail(message));
    }

    /// Read the last `limit` entries, oldest first.
    ///
    /// Silently skips malformed lines. Returns an empty vec if the file does
    /// not exist or cannot be read.
    pub fn read_recent(&self, limit: usize) -> Vec<EventEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        let entries: Vec<EventEntry> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();
        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }

    fn append(&self, entry: &EventEntry) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;

        Ok(())
    }
}

/// Print a human-facing warning to stderr.
pub fn warn(message: impl std::fmt::Display) {
    eprintln!("[ncdash] {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_append_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let log = EventLog::at(&path);

        let quality = DataQuality {
            rows: 10,
            coerced_rows: 2,
            ..DataQuality::default()
        };
        log.load("csv:nc.csv", &quality);
        log.export("csv:nc.csv", "pareto", 4);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(first["event"], "load");
        assert_eq!(first["rows"], 10);
        assert_eq!(first["coerced_rows"], 2);
        assert!(first.get("detail").is_none());
    }

    #[test]
    fn read_recent_returns_tail_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let log = EventLog::at(&path);
        log.refresh("a");
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();
        log.request("a", "/api/summary", 200);
        log.error("a", "boom");

        let recent = log.read_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event, EventKind::Request);
        assert_eq!(recent[0].detail.as_deref(), Some("/api/summary 200"));
        assert_eq!(recent[1].event, EventKind::Error);
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let config = LoggingConfig {
            enabled: false,
            ..LoggingConfig::default()
        };
        let log = EventLog::from_config(&config);
        assert!(log.path().is_none());
        log.refresh("sample");
        assert!(log.read_recent(10).is_empty());
    }
}
