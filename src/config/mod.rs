//! Configuration module for threadline.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, ExportSettings, LineageSettings, LogSettings, Settings, SettingsError,
};
