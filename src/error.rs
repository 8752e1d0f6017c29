use thiserror::Error;

#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Command not allowed: {group} {subcommand}")]
    CommandNotAllowed { group: String, subcommand: String },

    #[error("Command execution failed: {0}")]
    ExecutionError(String),

    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("User cancelled")]
    UserCancelled,

    #[error("Audit log error: {0}")]
    AuditLogError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PilotError>;
