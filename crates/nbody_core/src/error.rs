use thiserror::Error;

/// Configuration problems detected before the driver loop starts.
///
/// Every PE validates the same inputs, so every PE reaches the same verdict.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("body count must be positive, got {0}")]
    NonPositiveBodyCount(i64),

    #[error("step count must not be negative, got {0}")]
    NegativeSteps(i64),

    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error("gravitational constant must be finite, got {0}")]
    InvalidGravity(f64),

    #[error("softening length must be non-negative and finite, got {0}")]
    InvalidSoftening(f64),

    #[error("process count must be at least 1")]
    NoProcesses,

    #[error("rank {rank} out of range for {npes} processes")]
    RankOutOfRange { rank: usize, npes: usize },

    #[error("scenario requires {expected} bodies, configured for {actual}")]
    ScenarioBodyCount { expected: usize, actual: usize },

    #[error("invalid scenario parameter: {0}")]
    InvalidScenario(String),

    #[error("body {index}: {reason}")]
    InvalidBody { index: usize, reason: String },
}
