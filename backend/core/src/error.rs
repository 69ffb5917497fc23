use thiserror::Error;

/// Top-level error type for the Vox assistant.
#[derive(Debug, Error)]
pub enum VoxError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid equivalent for command '{command}': {reason}")]
    InvalidEquivalent { command: String, reason: String },

    #[error("no handler registered for action: {0}")]
    UnknownAction(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("command definition error: {0}")]
    DefinitionError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
