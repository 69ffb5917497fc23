//! Environment overrides applied after the config file is read.
//!
//! `VOX_LOG` (falling back to `RUST_LOG`) replaces `log_level`;
//! `VOX_DEFINITIONS` replaces `definitions_path`.

use crate::schema::AssistantConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

pub fn apply_env_overrides(config: AssistantConfig) -> AssistantConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_env_overrides_with(
    mut config: AssistantConfig,
    env: &HashMap<String, String>,
) -> AssistantConfig {
    let non_empty = |key: &str| env.get(key).filter(|v| !v.trim().is_empty());

    if let Some(level) = non_empty("VOX_LOG").or_else(|| non_empty("RUST_LOG")) {
        debug!(level = %level, "Log level overridden from environment");
        config.log_level = level.clone();
    }
    if let Some(path) = non_empty("VOX_DEFINITIONS") {
        config.definitions_path = PathBuf::from(path);
    }
    config
}
