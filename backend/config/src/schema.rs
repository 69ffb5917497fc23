//! Typed assistant configuration.
//!
//! Every section has a `Default` so that a partial (or missing) YAML file
//! still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration document (`config.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub wake: WakeConfig,
    /// Number of history events kept for scenario evaluation.
    pub max_history_length: usize,
    pub answers: AnswersConfig,
    /// YAML file holding the declarative command definitions.
    pub definitions_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake: WakeConfig::default(),
            max_history_length: 50,
            answers: AnswersConfig::default(),
            definitions_path: PathBuf::from("commands.yaml"),
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Whether requests must start with a wake word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeMode {
    #[default]
    Disabled,
    Always,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    pub mode: WakeMode,
    pub words: Vec<String>,
}

/// Canned replies used by the assistant itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswersConfig {
    /// Reply to a bare wake word.
    pub default: Vec<String>,
    /// Acknowledgement when several commands run at once.
    pub multi: Vec<String>,
    /// Reply when nothing recognised the request.
    pub no_command: Vec<String>,
}

impl Default for AnswersConfig {
    fn default() -> Self {
        Self {
            default: vec!["Yes?".to_string()],
            multi: vec!["On it.".to_string()],
            no_command: Vec::new(),
        }
    }
}
