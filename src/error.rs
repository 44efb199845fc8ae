use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a run directory (expected run-NNN): {0}")]
    InvalidRunDir(String),

    #[error("Invalid status {0:?}: must be done, in_progress, or pending")]
    InvalidStatus(String),

    #[error("Task {task_id} not found in {path}")]
    TaskNotFound { task_id: String, path: PathBuf },

    #[error("Implementation log missing for task {task_id} (expected at {expected})")]
    ImplLogMissing { task_id: String, expected: PathBuf },

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
