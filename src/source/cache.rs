//! TTL cache around any [`DataSource`].
//!
//! The last successful fetch is kept in memory and, when a cache path is
//! given, persisted to `~/.ncdash/cache.json` so short-lived CLI invocations
//! share it. Persistence is best-effort: unreadable or stale snapshots are
//! ignored and write failures never fail a fetch.
//!
//! A snapshot is only reused if it was taken from the same source
//! (compared by [`DataSource::describe`]).

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{DataSource, SourceError};
use crate::records::RawRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    source: String,
    fetched_at: DateTime<Utc>,
    rows: Vec<RawRow>,
}

pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    path: Option<PathBuf>,
    snapshot: Option<Snapshot>,
}

/// Default on-disk snapshot location: `~/.ncdash/cache.json`.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ncdash").join("cache.json"))
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration, path: Option<PathBuf>) -> Self {
        Self {
            inner,
            ttl,
            path,
            snapshot: None,
        }
    }

    /// Fetch against an explicit clock.
    pub fn fetch_at(&mut self, now: DateTime<Utc>) -> Result<Vec<RawRow>, SourceError> {
        if self.snapshot.is_none() {
            self.snapshot = self.load_snapshot();
        }

        if let Some(snapshot) = &self.snapshot
            && now - snapshot.fetched_at < self.ttl
        {
            return Ok(snapshot.rows.clone());
        }

        let rows = self.inner.fetch()?;
        let snapshot = Snapshot {
            source: self.inner.describe(),
            fetched_at: now,
            rows: rows.clone(),
        };
        self.save_snapshot(&snapshot);
        self.snapshot = Some(snapshot);
        Ok(rows)
    }

    /// When the cached rows were fetched, if any are cached.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.as_ref().map(|s| s.fetched_at)
    }

    fn load_snapshot(&self) -> Option<Snapshot> {
        let path = self.path.as_ref()?;
        let content = fs::read_to_string(path).ok()?;
        let snapshot: Snapshot = serde_json::from_str(&content).ok()?;
        (snapshot.source == self.inner.describe()).then_some(snapshot)
    }

    fn save_snapshot(&self, snapshot: &Snapshot) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string(snapshot) {
            let _ = fs::write(path, json);
        }
    }
}

impl<S: DataSource> DataSource for CachedSource<S> {
    fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError> {
        self.fetch_at(Utc::now())
    }

    fn refresh(&mut self) {
        self.snapshot = None;
        if let Some(path) = &self.path {
            let _ = fs::remove_file(path);
        }
        self.inner.refresh();
    }

    fn describe(&self) -> String {
        format!("{} (cached {}s)", self.inner.describe(), self.ttl.num_seconds())
    }
}
