//! Error types for the profile store and process supervisor.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write profiles to {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize profiles: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("a configuration named '{0}' already exists")]
    DuplicateName(String),

    #[error("configuration name must not be blank")]
    BlankName,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid OpenOCD dir: {}", .0.display())]
    InvalidInstallDir(PathBuf),

    #[error("executable not found under {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("OpenOCD is already running")]
    AlreadyRunning,

    #[error("no running OpenOCD process to kill")]
    NotRunning,

    #[error("failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
