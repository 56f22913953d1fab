use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::errors::{AppError, Result};

/// The user's home directory, or the current directory when it cannot be found.
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Creates `path` and any missing parents. Succeeds if it already exists.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    debug!(path = %path.display(), "creating download folder");
    fs::create_dir_all(path).map_err(AppError::Io)?;
    Ok(())
}
