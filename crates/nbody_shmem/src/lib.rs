//! Symmetric body store, step barrier and the PE launchers.
//!
//! Processing elements (PEs) are single-threaded workers that share nothing
//! but a symmetric body region, a step barrier and a fault marker. A PE may
//! read any body slot but writes only the slots of its own partition.
//!
//! Two backends implement [`BodyStore`] and [`Collective`]: [`World`] runs
//! PEs as threads of one process, and with the `mpi` feature `MpiPe` runs
//! them as MPI ranks over a shared-memory window.

pub mod barrier;
pub mod error;
#[cfg(feature = "mpi")]
pub mod mpi;
pub mod region;
pub mod segment;
pub mod store;
pub mod world;

pub use barrier::StepBarrier;
pub use error::{RuntimeError, StoreError};
#[cfg(feature = "mpi")]
pub use mpi::{MpiPe, MpiRuntime};
pub use region::SymmetricRegion;
pub use store::{BodyStore, Collective};
pub use world::{pes_from_env, FaultFlag, Pe, StartGate, World, PES_ENV};
