//! Data-source collaborators.
//!
//! A [`DataSource`] delivers raw rows; the normalizer turns them into
//! tickets. Sources:
//!
//! - [`CsvFileSource`]: a local CSV export of the NC sheet
//! - [`JsonFileSource`]: a local JSON array of row objects
//! - [`HttpCsvSource`]: a published-sheet CSV URL fetched with `ureq`
//! - [`SampleSource`]: deterministic generated data for demos
//!
//! Any of them can be wrapped in a [`CachedSource`], which keeps the last
//! fetch for a configurable TTL and persists it between invocations.

mod cache;
mod file;
mod http;
mod sample;

use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::{SourceConfig, SourceKind};
use crate::records::RawRow;

pub use cache::CachedSource;
pub use file::{CsvFileSource, JsonFileSource};
pub use http::HttpCsvSource;
pub use sample::SampleSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON rows: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array of objects, found {0}")]
    Shape(&'static str),
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("source is not configured: {0}")]
    NotConfigured(&'static str),
}

/// A supplier of raw ticket rows.
pub trait DataSource {
    /// Return all rows, possibly from a cache.
    fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError>;

    /// Drop any cached rows so the next [`fetch`](Self::fetch) re-pulls.
    fn refresh(&mut self) {}

    /// Short human-readable description for logs and health output.
    fn describe(&self) -> String;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError> {
        (**self).fetch()
    }

    fn refresh(&mut self) {
        (**self).refresh()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Build the configured source, wrapped in a cache when `cache_ttl_secs` is
/// non-zero.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn DataSource>, SourceError> {
    let inner: Box<dyn DataSource> = match config.kind {
        SourceKind::Csv => Box::new(CsvFileSource::new(require_path(config)?)),
        SourceKind::Json => Box::new(JsonFileSource::new(require_path(config)?)),
        SourceKind::HttpCsv => {
            if config.url.trim().is_empty() {
                return Err(SourceError::NotConfigured("source.url"));
            }
            Box::new(HttpCsvSource::new(&config.url, config.timeout_ms))
        }
        SourceKind::Sample => Box::new(SampleSource::default()),
    };

    if config.cache_ttl_secs == 0 || config.kind == SourceKind::Sample {
        return Ok(inner);
    }
    Ok(Box::new(CachedSource::new(
        inner,
        cache_ttl(config.cache_ttl_secs),
        cache::default_cache_path(),
    )))
}

/// Configured TTL as a duration, saturating at the largest representable one.
fn cache_ttl(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

fn require_path(config: &SourceConfig) -> Result<PathBuf, SourceError> {
    if config.path.trim().is_empty() {
        return Err(SourceError::NotConfigured("source.path"));
    }
    Ok(expand_home(&config.path))
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sources_require_a_path() {
        let config = SourceConfig {
            kind: SourceKind::Csv,
            path: String::new(),
            ..SourceConfig::default()
        };
        assert!(matches!(
            from_config(&config),
            Err(SourceError::NotConfigured("source.path"))
        ));
    }

    #[test]
    fn http_source_requires_a_url() {
        let config = SourceConfig {
            kind: SourceKind::HttpCsv,
            url: " ".into(),
            ..SourceConfig::default()
        };
        assert!(matches!(
            from_config(&config),
            Err(SourceError::NotConfigured("source.url"))
        ));
    }

    #[test]
    fn sample_source_is_never_cached() {
        let config = SourceConfig {
            kind: SourceKind::Sample,
            ..SourceConfig::default()
        };
        let source = from_config(&config).unwrap();
        assert!(source.describe().starts_with("sample"));
    }

    #[test]
    fn huge_cache_ttl_saturates() {
        assert_eq!(cache_ttl(300), chrono::Duration::seconds(300));
        assert_eq!(cache_ttl(u64::MAX), chrono::Duration::MAX);

        let config = SourceConfig {
            kind: SourceKind::Csv,
            path: "data/nc.csv".into(),
            cache_ttl_secs: u64::MAX,
            ..SourceConfig::default()
        };
        let source = from_config(&config).unwrap();
        assert!(source.describe().contains("(cached"));
    }

    #[test]
    fn expand_home_leaves_relative_paths() {
        assert_eq!(expand_home("data/nc.csv"), PathBuf::from("data/nc.csv"));
    }
}
