pub mod diagnostics;
pub mod forces;
pub mod integrator;
pub mod procgen;

pub use forces::{first_non_finite, Gravity};
pub use integrator::{advance_all, symplectic_euler};
pub use procgen::ScatterParams;
