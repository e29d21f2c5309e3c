use nbody_core::ConfigError;
use nbody_shmem::{RuntimeError, StoreError};
use nbody_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("body store error: {0}")]
    Store(#[from] StoreError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("snapshot error: {0}")]
    Storage(#[from] StorageError),

    #[error("non-finite acceleration on body {index} at step {step}")]
    NonFinite { step: usize, index: usize },
}
