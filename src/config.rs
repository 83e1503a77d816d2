//! Portfolio configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged on top of it, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! debug = false                  # Disable every cache (listing, templates)
//! content_root = "content"       # Directory holding the dated galleries
//! gallery_pattern = "*-*"        # Glob matched against directory names
//! template_suffix = ".html.twig" # A set's template is the file with this suffix
//! templates_dir = "templates"    # Site-level templates (index, about)
//! cache_dir = ".smak-cache"      # Compiled templates, HTTP cache, sessions
//!
//! [freshness]
//! enabled = false                # Flag recently updated sets as fresh
//! interval = "30days"            # How recent counts as fresh
//!
//! [logging]
//! level = "info"                 # tracing filter directive (RUST_LOG wins)
//! format = "compact"             # compact | json
//! ```
//!
//! Relative paths resolve against the directory the config was loaded from.
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Portfolio configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortfolioConfig {
    /// Disables listing memoization and the template freshness check.
    pub debug: bool,
    pub content_root: String,
    /// Glob selecting which directories under the content root are sets.
    pub gallery_pattern: String,
    pub template_suffix: String,
    pub templates_dir: String,
    pub cache_dir: String,
    pub freshness: FreshnessConfig,
    pub logging: LoggingConfig,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            debug: false,
            content_root: "content".to_string(),
            gallery_pattern: "*-*".to_string(),
            template_suffix: ".html.twig".to_string(),
            templates_dir: "templates".to_string(),
            cache_dir: ".smak-cache".to_string(),
            freshness: FreshnessConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PortfolioConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = globset::Glob::new(&self.gallery_pattern) {
            return Err(ConfigError::Validation(format!(
                "gallery_pattern is not a valid glob: {e}"
            )));
        }
        if self.template_suffix.is_empty() {
            return Err(ConfigError::Validation(
                "template_suffix must not be empty".into(),
            ));
        }
        if self.freshness.enabled && self.freshness.interval.is_zero() {
            return Err(ConfigError::Validation(
                "freshness.interval must be non-zero when freshness is enabled".into(),
            ));
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::Validation(format!(
                "logging.level is not a valid filter: {e}"
            )));
        }
        Ok(())
    }
}

/// Resolved filesystem locations, anchored at the config directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub content_root: PathBuf,
    pub templates_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Paths {
    pub fn resolve(config: &PortfolioConfig, base: &Path) -> Self {
        Self {
            content_root: base.join(&config.content_root),
            templates_dir: base.join(&config.templates_dir),
            cache_dir: base.join(&config.cache_dir),
        }
    }

    pub fn compiled_dir(&self) -> PathBuf {
        self.cache_dir.join("compiled")
    }

    pub fn http_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("http")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.cache_dir.join("sessions")
    }
}

/// The "fresh" badge on recently updated sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FreshnessConfig {
    pub enabled: bool,
    /// A set is fresh when its template changed within this window.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// [`PortfolioConfig::default`] as a TOML table: the base layer that a
/// site's `config.toml` is merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PortfolioConfig::default()).expect("default config must serialize")
}

/// Merge a site's values onto the defaults.
///
/// Tables merge per key, so `[freshness] enabled = true` keeps the default
/// `interval` and the `[logging]` table untouched. Scalars and arrays in
/// `overlay` replace the default outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse the site directory's `config.toml` without interpreting it.
///
/// A site without the file runs on defaults, so absence is `Ok(None)`
/// rather than an error. Syntax errors surface here; unknown keys and bad
/// values are caught after merging.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Resolve the effective [`PortfolioConfig`] for a site directory:
/// defaults, then `config.toml`, then [`PortfolioConfig::validate`].
pub fn load_config(dir: &Path) -> Result<PortfolioConfig, ConfigError> {
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: PortfolioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# smak-folio configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Relative paths resolve against the directory holding this file.
# Unknown keys will cause an error.

# Disable every cache: the set listing is rebuilt on each request and
# templates are never checked against their compiled copies.
debug = false

# Directory holding the galleries, e.g. content/2024/00-spring/.
content_root = "content"

# Glob matched against directory names to decide which ones are sets.
gallery_pattern = "*-*"

# A set's template is the file in its directory ending with this suffix.
template_suffix = ".html.twig"

# Site-level templates (index.html.twig, about.html.twig, ...).
templates_dir = "templates"

# Compiled templates, the HTTP response cache and session blobs.
cache_dir = ".smak-cache"

# ---------------------------------------------------------------------------
# Fresh badge
# ---------------------------------------------------------------------------
[freshness]
# Promote sets whose template changed recently to the top of the listing.
enabled = false

# How recent counts as fresh ("30days", "2weeks", "48h", ...).
interval = "30days"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# tracing filter directive. RUST_LOG overrides it when set.
level = "info"

# compact | json
format = "compact"
"##
}
