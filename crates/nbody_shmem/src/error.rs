use thiserror::Error;

/// Failed one-sided access against the symmetric region
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no PE {pe} in a world of {npes}")]
    NoSuchPe { pe: usize, npes: usize },

    #[error("body index {index} out of range for {n} bodies")]
    IndexOutOfRange { index: usize, n: usize },

    #[error("body {index} is not owned by PE {pe}")]
    NotOwner { pe: usize, index: usize },

    #[error("buffer holds {actual} bodies, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Problems bringing up or tearing down the PEs
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("a world needs at least one PE")]
    NoProcesses,

    #[error("invalid {var} value {value:?}: expected a positive integer")]
    InvalidPeCount { var: &'static str, value: String },

    #[error("failed to spawn PE {rank}: {source}")]
    Spawn {
        rank: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("PE {rank} panicked")]
    PeFailed { rank: usize },

    #[error("MPI error: {0}")]
    Mpi(String),

    #[error("{world} MPI ranks span several nodes ({node} share memory with this rank)")]
    NotSharedMemory { world: usize, node: usize },
}
