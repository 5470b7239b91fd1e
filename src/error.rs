//! Error types for the announcer

use std::io;
use thiserror::Error;

/// Main error type for the announcer
#[derive(Error, Debug)]
pub enum AnnouncerError {
    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    /// Rejected user input; the action is aborted and nothing changes
    #[error("{0}")]
    Validation(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for announcer operations
pub type Result<T> = std::result::Result<T, AnnouncerError>;

impl AnnouncerError {
    /// True for errors caused by user input rather than the environment
    pub fn is_validation(&self) -> bool {
        matches!(self, AnnouncerError::Validation(_))
    }
}

impl From<String> for AnnouncerError {
    fn from(s: String) -> Self {
        AnnouncerError::Other(s)
    }
}

impl From<&str> for AnnouncerError {
    fn from(s: &str) -> Self {
        AnnouncerError::Other(s.to_string())
    }
}
