pub mod config;
pub mod constants;
pub mod error;
pub mod partition;
pub mod types;

pub use config::{GlobalConfig, Scenario, SimConfig};
pub use constants::*;
pub use error::ConfigError;
pub use partition::Partition;
pub use types::*;
