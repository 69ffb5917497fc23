//! Config validation with field paths in every message.

use crate::schema::{AssistantConfig, WakeMode};
use thiserror::Error;
use vox_core::VoxError;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Err(VoxError::ConfigError)` listing every error, if there are any.
    pub fn into_result(self) -> Result<(), VoxError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        Err(VoxError::ConfigError(messages.join("; ")))
    }

    /// Emit every finding through `tracing`.
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &AssistantConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_wake(config, &mut report);
    validate_history(config, &mut report);
    validate_answers(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_wake(config: &AssistantConfig, report: &mut ValidationReport) {
    if config.wake.mode != WakeMode::Always {
        return;
    }
    if config.wake.words.is_empty() {
        report.error("wake.words", "Wake mode is 'always' but no wake words are configured");
    }
    for (i, word) in config.wake.words.iter().enumerate() {
        if word.trim().is_empty() {
            report.error(format!("wake.words[{i}]"), "Wake word cannot be empty");
        }
    }
}

fn validate_history(config: &AssistantConfig, report: &mut ValidationReport) {
    if config.max_history_length == 0 {
        report.error("max_history_length", "History length must be at least 1");
    }
}

fn validate_answers(config: &AssistantConfig, report: &mut ValidationReport) {
    if config.answers.default.is_empty() {
        report.warn("answers.default", "No reply configured for a bare wake word");
    }
    if config.answers.multi.is_empty() {
        report.warn("answers.multi", "No acknowledgement configured for multiple commands");
    }
}

fn validate_logging(config: &AssistantConfig, report: &mut ValidationReport) {
    // Directive strings such as "vox_agent=debug" are passed through untouched.
    let level = config.log_level.trim().to_lowercase();
    if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
        report.warn(
            "log_level",
            format!("Unknown log level '{}'; falling back to info", config.log_level),
        );
    }
}
