/// Configuration schema and defaults for ncdash.
///
/// Sections: `[source]`, `[pareto]`, `[logging]` and `[web]`. Every field
/// has a built-in default; config files only need the keys they change.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Maps directly to `~/.ncdash/config.toml` and `.ncdash.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NcdashConfig {
    pub source: SourceConfig,
    pub pareto: ParetoConfig,
    pub logging: LoggingConfig,
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// [source]
// ---------------------------------------------------------------------------

/// Where ticket rows come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Local CSV export of the NC sheet.
    #[default]
    Csv,
    /// Local JSON array of row objects.
    Json,
    /// Published-sheet CSV URL.
    HttpCsv,
    /// Built-in generated data.
    Sample,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
            Self::HttpCsv => write!(f, "http-csv"),
            Self::Sample => write!(f, "sample"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// File path for `csv` and `json` sources. `~` is expanded.
    pub path: String,
    /// URL for `http-csv` sources.
    pub url: String,
    /// How long a fetch is reused before re-pulling. `0` disables caching.
    pub cache_ttl_secs: u64,
    /// HTTP request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            path: "nc_data.csv".to_string(),
            url: String::new(),
            cache_ttl_secs: 300,
            timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [pareto]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParetoConfig {
    /// Cumulative percentage that closes the "vital few" prefix.
    pub threshold_pct: f64,
}

impl Default for ParetoConfig {
    fn default() -> Self {
        Self {
            threshold_pct: crate::analytics::pareto::DEFAULT_THRESHOLD_PCT,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether the JSONL event log is written.
    pub enabled: bool,
    /// Path to the event log. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.ncdash/events.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `ncdash serve`.
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8501".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML
// ---------------------------------------------------------------------------

impl NcdashConfig {
    /// Annotated default config written by `ncdash config init`.
    pub fn default_toml() -> String {
        r#"# ncdash configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (NCDASH_*)
#   2. Project config (.ncdash.toml in current directory)
#   3. User global config (~/.ncdash/config.toml)
#   4. Built-in defaults

[source]
kind = "csv"              # csv | json | http-csv | sample
path = "nc_data.csv"      # used by csv and json
url = ""                  # used by http-csv (published sheet CSV link)
cache_ttl_secs = 300      # 0 disables the fetch cache
timeout_ms = 10000

[pareto]
threshold_pct = 80.0

[logging]
enabled = true
path = "~/.ncdash/events.jsonl"

[web]
addr = "127.0.0.1:8501"
"#
        .to_string()
    }
}
