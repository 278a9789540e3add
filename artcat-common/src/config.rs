//! Configuration loading, root folder resolution and logging setup
//!
//! Bootstrap configuration comes from a TOML file. Every field has a built-in
//! default so a missing or partial file never prevents startup.
//!
//! # Root folder priority
//!
//! 1. Explicit argument (highest priority)
//! 2. Environment variable `ARTCAT_ROOT_FOLDER`
//! 3. TOML `root_folder`
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "ARTCAT_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the catalog database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identifier and ingestion settings
    #[serde(default)]
    pub catalog: CatalogSettings,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// What to do with a variant whose SKU fails to parse during ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedSkuPolicy {
    /// Abort the whole batch on the first malformed SKU
    #[default]
    Abort,
    /// Drop the offending variant and report it
    SkipAndReport,
}

/// What to do once the 26 letter blocks of a period are used up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WraparoundPolicy {
    /// Refuse to mint a code that would reuse a block letter
    #[default]
    Fail,
    /// Cycle back to block `A` (codes repeat every 26,000 ordinals)
    Reuse,
}

/// Identifier and ingestion settings (`[catalog]` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// First year of period `10`
    pub period_start_year: i32,
    /// Name of the counter row used for artwork ordinals
    pub sequence_name: String,
    /// Column grouping rows into one product
    pub group_key_column: String,
    /// Column carrying the variant SKU
    pub sku_column: String,
    /// Column carrying a media URL
    pub media_column: String,
    /// Separator between the identifier prefix and the free-form suffix of a filename
    pub filename_suffix_separator: char,
    pub malformed_sku_policy: MalformedSkuPolicy,
    pub block_wraparound: WraparoundPolicy,
    /// EventBus channel capacity
    pub event_capacity: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            period_start_year: 2020,
            sequence_name: "artwork".to_string(),
            group_key_column: "Handle".to_string(),
            sku_column: "Variant SKU".to_string(),
            media_column: "Image Src".to_string(),
            filename_suffix_separator: '_',
            malformed_sku_policy: MalformedSkuPolicy::default(),
            block_wraparound: WraparoundPolicy::default(),
            event_capacity: 100,
        }
    }
}

impl CatalogSettings {
    /// Reject values that parse but would break identifiers or drivers
    pub fn validate(&self) -> Result<()> {
        let invalid = |key, reason: &str| {
            Err(Error::InvalidSetting {
                key,
                reason: reason.to_string(),
            })
        };

        if self.period_start_year < 1 {
            return invalid("period_start_year", "must be a positive year");
        }
        if self.sequence_name.trim().is_empty() {
            return invalid("sequence_name", "must not be empty");
        }
        if self.group_key_column.is_empty() {
            return invalid("group_key_column", "must not be empty");
        }
        let separator = self.filename_suffix_separator;
        if separator == '-' || separator.is_ascii_alphanumeric() {
            return invalid(
                "filename_suffix_separator",
                "must not be '-' or a letter or digit",
            );
        }
        if self.event_capacity == 0 {
            return invalid("event_capacity", "must be at least 1");
        }

        Ok(())
    }
}

/// Resolve the root folder following the priority order in the module docs
pub fn resolve_root_folder(explicit: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("artcat"))
        .unwrap_or_else(|| PathBuf::from("./artcat_data"))
}

/// Default TOML location (`<config dir>/artcat/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("artcat").join("config.toml"))
}

/// Load TOML configuration
///
/// A missing file logs a warning and yields defaults. A file that exists but
/// cannot be read or parsed is a configuration error, and so is a `[catalog]`
/// value rejected by [`CatalogSettings::validate`].
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.catalog.validate()?;

    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Write TOML configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, target: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = target.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;

    if let Err(e) = std::fs::rename(&temp_path, target) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the configured level. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", logging.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }

    Ok(())
}
