use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    /// Bad user input: no file, unreadable file, malformed CSV row.
    InputError(String),
    /// The session is not in a state that allows the action.
    PreconditionError(String),
    EngineError(String),
    PersistenceError(String),
    SecurityError(String),
    ConfigError(String),
    IoError(String),
}

impl AppError {
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InputError(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::PreconditionError(_) => 409,
            AppError::EngineError(_) => 502,
            AppError::Internal(_)
            | AppError::PersistenceError(_)
            | AppError::SecurityError(_)
            | AppError::ConfigError(_)
            | AppError::IoError(_) => 500,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InputError(msg) => write!(f, "Input error: {}", msg),
            AppError::PreconditionError(msg) => write!(f, "Precondition failed: {}", msg),
            AppError::EngineError(msg) => write!(f, "Engine error: {}", msg),
            AppError::PersistenceError(msg) => write!(f, "Persistence error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::InputError(format!("Failed to parse CSV: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::PersistenceError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
