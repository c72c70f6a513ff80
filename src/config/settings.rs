//! TOML-based configuration for threadline.
//!
//! Supports a config file (threadline.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [lineage]
//! max_depth = 64
//! strict_upstream_lists = false
//!
//! [export]
//! csv_delimiter = ","
//! pretty_json = true
//! output_dir = "${LINEAGE_OUT}/exports"
//!
//! [log]
//! level = "info"
//! json = false
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::facts::NormalizeOptions;
use crate::lineage::DEFAULT_MAX_DEPTH;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Tree building and fact normalization.
    pub lineage: LineageSettings,

    /// Output formats and locations.
    pub export: ExportSettings,

    /// Log output.
    pub log: LogSettings,
}

/// Lineage building settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LineageSettings {
    /// Deepest upstream level a database-side tree may reach.
    pub max_depth: usize,

    /// Reject facts whose upstream table and column lists differ in length.
    pub strict_upstream_lists: bool,
}

impl Default for LineageSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_upstream_lists: false,
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Single ASCII character separating CSV fields.
    pub csv_delimiter: String,

    /// Indent JSON documents.
    pub pretty_json: bool,

    /// Directory for default output files (supports ${ENV_VAR} expansion).
    pub output_dir: Option<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            csv_delimiter: ",".to_string(),
            pretty_json: true,
            output_dir: None,
        }
    }
}

impl ExportSettings {
    /// The delimiter as a byte.
    pub fn delimiter(&self) -> Result<u8, SettingsError> {
        match self.csv_delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(SettingsError::InvalidConfig(format!(
                "csv_delimiter must be a single ASCII character, got {:?}",
                self.csv_delimiter
            ))),
        }
    }

    /// The output directory with environment variables expanded.
    pub fn resolved_output_dir(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.output_dir
            .as_deref()
            .map(|dir| expand_env_vars(dir).map(PathBuf::from))
            .transpose()
    }
}

/// Log settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset, e.g. "info" or "threadline=debug".
    pub level: String,

    /// Emit JSON log lines.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `THREADLINE_CONFIG`
    /// 2. `./threadline.toml`
    /// 3. `~/.config/threadline/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("THREADLINE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("threadline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("threadline").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.lineage.max_depth == 0 {
            return Err(SettingsError::InvalidConfig(
                "lineage.max_depth must be at least 1".to_string(),
            ));
        }
        self.export.delimiter()?;
        Ok(())
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            strict_upstream_lists: self.lineage.strict_upstream_lists,
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name = if chars.next_if_eq(&'{').is_some() {
            let mut name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                name.push(ch);
            }
            name
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // A lone $ is kept.
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
