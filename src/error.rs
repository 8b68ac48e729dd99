use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the grid core.
///
/// Per-image decode failures are not errors here: the cache records them as
/// absent thumbnails and keeps going.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("prefetch worker is already running")]
    WorkerAlreadyRunning,

    #[error("failed to spawn prefetch worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("failed to scan {path:?}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("engine failed to list groups: {0:#}")]
    Engine(anyhow::Error),
}

pub type Result<T, E = GridError> = std::result::Result<T, E>;
