/// Configuration system for ncdash.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::NcdashConfig::default()`]
/// 2. **User global config**: `~/.ncdash/config.toml`
/// 3. **Project local config**: `.ncdash.toml` in the current working directory
/// 4. **Environment variables**: `NCDASH_*` overrides (highest precedence)
///
/// Layers are merged key by key, so a project file that only sets
/// `source.path` keeps every other value from the layers below it.
///
/// # Usage
///
/// ```rust,ignore
/// use ncdash::config;
///
/// let cfg = config::load();
/// let source = ncdash::source::from_config(&cfg.source)?;
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::NcdashConfig;
use schema::SourceKind;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges defaults → global TOML → project TOML → env vars.
pub fn load() -> NcdashConfig {
    let files: Vec<PathBuf> = [global_config_path(), project_config_path()]
        .into_iter()
        .flatten()
        .collect();
    let mut config = load_layers(&files);
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Merge the given TOML files, in order, over the built-in defaults.
///
/// Missing files are skipped. Malformed files are reported on stderr and
/// skipped; a bad config never blocks the dashboard.
fn load_layers(paths: &[PathBuf]) -> NcdashConfig {
    let Ok(mut merged) = toml::Value::try_from(NcdashConfig::default()) else {
        return NcdashConfig::default();
    };

    for path in paths {
        if let Some(layer) = load_toml_value(path) {
            merge_values(&mut merged, layer);
        }
    }

    merged.try_into().unwrap_or_else(|e| {
        eprintln!("[ncdash] ignoring config files: {e}");
        NcdashConfig::default()
    })
}

fn load_toml_value(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("[ncdash] ignoring malformed {}: {e}", path.display());
            None
        }
    }
}

/// Recursively overlay `overlay` onto `base`: tables merge, everything else
/// replaces.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.ncdash/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ncdash").join("config.toml"))
}

/// Path to the project local config: `.ncdash.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".ncdash.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment overrides (highest precedence layer).
///
/// Supported variables:
/// - `NCDASH_SOURCE_KIND`: `csv`, `json`, `http-csv`, `sample`
/// - `NCDASH_SOURCE_PATH`: file path for file sources
/// - `NCDASH_SOURCE_URL`: published-sheet CSV URL
/// - `NCDASH_CACHE_TTL_SECS`: fetch cache TTL, `0` disables
/// - `NCDASH_PARETO_THRESHOLD`: vital-few threshold percentage
/// - `NCDASH_LOGGING`: event log on/off (`1`/`true`/`yes`/`on`)
/// - `NCDASH_WEB_ADDR`: listen address for `serve`
fn apply_overrides(config: &mut NcdashConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("NCDASH_SOURCE_KIND")
        && let Some(kind) = parse_kind(&val)
    {
        config.source.kind = kind;
    }
    if let Some(val) = var("NCDASH_SOURCE_PATH")
        && !val.is_empty()
    {
        config.source.path = val;
    }
    if let Some(val) = var("NCDASH_SOURCE_URL")
        && !val.is_empty()
    {
        config.source.url = val;
    }
    if let Some(val) = var("NCDASH_CACHE_TTL_SECS")
        && let Ok(secs) = val.trim().parse::<u64>()
    {
        config.source.cache_ttl_secs = secs;
    }
    if let Some(val) = var("NCDASH_PARETO_THRESHOLD")
        && let Ok(pct) = val.trim().parse::<f64>()
        && (0.0..=100.0).contains(&pct)
    {
        config.pareto.threshold_pct = pct;
    }
    if let Some(val) = var("NCDASH_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
    if let Some(val) = var("NCDASH_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a source kind string.
pub fn parse_kind(val: &str) -> Option<SourceKind> {
    match val.trim().to_ascii_lowercase().as_str() {
        "csv" => Some(SourceKind::Csv),
        "json" => Some(SourceKind::Json),
        "http-csv" | "http_csv" | "httpcsv" | "http" | "sheet" => Some(SourceKind::HttpCsv),
        "sample" | "demo" => Some(SourceKind::Sample),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.ncdash/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    write_default(&path, force)?;
    Ok(path)
}

fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.ncdash/ directory")?;
    }

    fs::write(path, NcdashConfig::default_toml()).context("failed to write config file")
}

/// Set a single config key in the global config file.
///
/// Supports dotted keys like `source.kind`. The file is created from the
/// defaults if it does not exist yet.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_value_in_file(&path, key, value)
}

fn set_value_in_file(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(NcdashConfig::default())
            .context("failed to serialize default config")?
    };

    set_toml_value(&mut root, key, value)?;

    // Refuse to write a file that would no longer load.
    let _: NcdashConfig = root
        .clone()
        .try_into()
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// Sections missing from a hand-written file are created. The new value is
/// typed after the existing value, or after the built-in default when the
/// key is absent.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((&leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };
    if leaf.is_empty() || sections.is_empty() {
        anyhow::bail!("config key must be '<section>.<key>', got '{key}'");
    }

    let defaults = toml::Value::try_from(NcdashConfig::default())
        .context("failed to serialize default config")?;
    let mut template = &defaults;
    for &part in &parts {
        template = template
            .get(part)
            .with_context(|| format!("config key not found: '{part}' in '{key}'"))?;
    }

    let mut current = root;
    for &part in sections {
        let table = current
            .as_table_mut()
            .with_context(|| format!("expected table above '{part}' in '{key}'"))?;
        current = table
            .entry(part.to_string())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{}'", sections.join(".")))?;

    let kind = table.get(leaf).unwrap_or(template);
    let new_value = match kind {
        toml::Value::Boolean(_) => toml::Value::Boolean(is_truthy(raw_value)),
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .trim()
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        toml::Value::Float(_) => {
            let f: f64 = raw_value
                .trim()
                .parse()
                .with_context(|| format!("expected number for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
