use std::fs;
use std::path::{Path, PathBuf};

use nbody_core::{Body, SimConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot encoding error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Body state at a given step, with the parameters that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub run_id: Uuid,
    pub step: u64,
    pub config: SimConfig,
    pub bodies: Vec<Body>,
}

impl Snapshot {
    /// New snapshot stamped with a fresh run id
    pub fn new(step: u64, config: SimConfig, bodies: Vec<Body>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            step,
            config,
            bodies,
        }
    }
}

/// Save a snapshot to disk as bincode
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = bincode::serialize(snapshot)?;
    fs::write(path, data).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Load a snapshot from disk
pub fn load_snapshot(path: &Path) -> Result<Snapshot, StorageError> {
    let data = fs::read(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot = bincode::deserialize(&data)?;
    Ok(snapshot)
}
