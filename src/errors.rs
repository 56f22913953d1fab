use std::result;
use thiserror::Error;

pub type Result<T> = result::Result<T, AppError>;

/// Application-wide error enum
///
/// Bad user input never shows up here: the option resolver coerces it to a
/// default or the prompt is repeated.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The external downloader or transcoder failed. Caught by the session
    /// and auto loops, reported, and never fatal.
    #[error("Download error: {0}")]
    Download(String),

    #[error("Missing dependency: {0}")]
    Dependency(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl From<arboard::Error> for AppError {
    fn from(err: arboard::Error) -> Self {
        AppError::Clipboard(err.to_string())
    }
}

impl AppError {
    /// Whether the session loops should report this error and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Download(_) | AppError::Clipboard(_))
    }
}
