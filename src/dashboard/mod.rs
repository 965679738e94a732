//! The load pipeline shared by the CLI and the web API.
//!
//! `source.fetch()` → [`normalize`] → [`RecordSet`], with every load,
//! refresh and failure written to the event log. Views are computed from
//! the (filtered) record set in [`views`].

pub mod views;

use anyhow::{Context, Result};

use crate::config::NcdashConfig;
use crate::logging::EventLog;
use crate::records::{DataQuality, RecordSet, normalize};
use crate::source::{self, DataSource};

pub use views::{View, ViewContext};

pub struct Dashboard {
    config: NcdashConfig,
    source: Box<dyn DataSource>,
    log: EventLog,
}

impl Dashboard {
    pub fn new(config: NcdashConfig, source: Box<dyn DataSource>) -> Self {
        let log = EventLog::from_config(&config.logging);
        Self {
            config,
            source,
            log,
        }
    }

    /// Build the source described by `config.source`.
    pub fn from_config(config: NcdashConfig) -> Result<Self> {
        let source = source::from_config(&config.source)
            .with_context(|| format!("cannot open {} source", config.source.kind))?;
        Ok(Self::new(config, source))
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &NcdashConfig {
        &self.config
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Fetch and normalize the full ticket set.
    ///
    /// A missing id column is fatal; coerced values are not, and show up in
    /// the returned set's [`DataQuality`].
    pub fn load(&mut self) -> Result<RecordSet> {
        let described = self.describe();

        let rows = match self.source.fetch() {
            Ok(rows) => rows,
            Err(e) => {
                self.log.error(&described, &e.to_string());
                return Err(e).with_context(|| format!("failed to load tickets from {described}"));
            }
        };

        let records = match normalize(&rows) {
            Ok(records) => records,
            Err(e) => {
                self.log.error(&described, &e.to_string());
                return Err(e).with_context(|| format!("unusable ticket data from {described}"));
            }
        };

        self.log.load(&described, &DataQuality::from_records(&records));
        Ok(records)
    }

    /// Invalidate any cached rows; the next [`load`](Self::load) re-pulls.
    pub fn refresh(&mut self) {
        self.source.refresh();
        self.log.refresh(&self.describe());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RawRow;
    use crate::source::SourceError;
    use serde_json::{Value, json};

    struct Fixed {
        rows: Vec<RawRow>,
    }

    impl DataSource for Fixed {
        fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError> {
            Ok(self.rows.clone())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    struct Failing;

    impl DataSource for Failing {
        fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError> {
            Err(SourceError::NotConfigured("source.url"))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn row(value: Value) -> RawRow {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn load_normalizes_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::at(dir.path().join("events.jsonl"));
        let source = Fixed {
            rows: vec![
                row(json!({"NC Number": "NC-1", "Cost of Rework": "N/A"})),
                row(json!({"NC Number": "NC-2", "Cost of Rework": "$5.00"})),
            ],
        };
        let mut dashboard = Dashboard::new(NcdashConfig::default(), Box::new(source)).with_log(log);

        let records = dashboard.load().unwrap();
        assert_eq!(records.len(), 2);

        let events = dashboard.log().read_recent(10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rows, 2);
        assert_eq!(events[0].coerced_rows, 1);
        assert_eq!(events[0].source, "fixed");
    }

    #[test]
    fn missing_id_column_is_fatal() {
        let source = Fixed {
            rows: vec![row(json!({"Status": "Open"}))],
        };
        let mut dashboard =
            Dashboard::new(NcdashConfig::default(), Box::new(source)).with_log(EventLog::disabled());
        let err = dashboard.load().unwrap_err();
        assert!(err.to_string().contains("unusable ticket data"));
    }

    #[test]
    fn fetch_failures_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::at(dir.path().join("events.jsonl"));
        let mut dashboard = Dashboard::new(NcdashConfig::default(), Box::new(Failing)).with_log(log);

        assert!(dashboard.load().is_err());
        let events = dashboard.log().read_recent(1);
        assert_eq!(events[0].event, crate::logging::EventKind::Error);
    }
}
