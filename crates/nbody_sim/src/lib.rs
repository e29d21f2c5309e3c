pub mod driver;
pub mod error;
pub mod run;

pub use driver::{Driver, Initial, Phase, RunReport};
pub use error::SimError;
pub use run::{run_from_bodies, run_simulation, SimulationOutput};
#[cfg(feature = "mpi")]
pub use run::{run_mpi, RankOutput};
