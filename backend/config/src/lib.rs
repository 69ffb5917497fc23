//! `vox-config`: assistant runtime configuration.
//!
//! Provides:
//! - Typed config schema with defaults for every section
//! - YAML read/write
//! - Environment overrides for log level and definitions path
//! - Validation with field paths

pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, apply_env_overrides_with};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use schema::{AnswersConfig, AssistantConfig, WakeConfig, WakeMode};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Load a config file, apply environment overrides and validate.
///
/// This is the main entry point for loading a config at runtime. The report
/// is returned rather than logged so callers can install a subscriber first
/// (the log level and directory come from the config itself).
pub async fn load_and_prepare(path: &Path) -> Result<(AssistantConfig, ValidationReport)> {
    let config = apply_env_overrides(load_config(path).await?);
    let report = validate(&config);
    Ok((config, report))
}
