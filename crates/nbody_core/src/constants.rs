// Physical constants and run defaults.
// Units are SI throughout: metres, seconds, kilograms.

/// Gravitational constant (m^3 kg^-1 s^-2)
pub const G: f64 = 6.67e-11;

/// Default number of bodies in the simulation
pub const DEFAULT_BODY_COUNT: usize = 10_000;

/// Default number of timesteps to run
pub const DEFAULT_STEPS: usize = 10;

/// Default timestep (seconds)
pub const TIMESTEP: f64 = 0.25;

/// Default seed for initial condition generation
pub const DEFAULT_SEED: u64 = 42;

/// Stride applied to the seed per body index so each body gets its own stream
pub const BODY_SEED_STRIDE: u64 = 7919;

/// Number of 64-bit words in one marshaled body record
pub const BODY_WORDS: usize = 7;
