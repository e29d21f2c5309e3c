use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BODY_COUNT, DEFAULT_SEED, DEFAULT_STEPS, G, TIMESTEP};
use crate::error::ConfigError;
use crate::partition::Partition;
use crate::types::Body;

/// Initial condition recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Bodies scattered uniformly in a cube of half-width `extent`
    Random {
        extent: f64,
        max_speed: f64,
        min_mass: f64,
        max_mass: f64,
    },
    /// Two equal masses on a circular orbit about their barycentre
    TwoBody { separation: f64, mass: f64 },
    /// Bodies restored from a saved snapshot
    Snapshot { path: PathBuf },
}

impl Default for Scenario {
    fn default() -> Self {
        Self::Random {
            extent: 1.0e3,
            max_speed: 1.0e-2,
            min_mass: 1.0e9,
            max_mass: 1.0e11,
        }
    }
}

/// Simulation parameters, loaded once at startup and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Total number of bodies
    pub n: usize,
    /// Number of timesteps to run
    pub nsteps: usize,
    /// Timestep (seconds)
    pub dt: f64,
    /// Gravitational constant
    pub g: f64,
    /// Plummer softening length; zero keeps the exact Newtonian sum
    pub softening: f64,
    /// Seed for deterministic initial conditions
    pub seed: u64,
    /// Abort collectively on the first non-finite acceleration
    pub check_finite: bool,
    pub scenario: Scenario,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n: DEFAULT_BODY_COUNT,
            nsteps: DEFAULT_STEPS,
            dt: TIMESTEP,
            g: G,
            softening: 0.0,
            seed: DEFAULT_SEED,
            check_finite: false,
            scenario: Scenario::default(),
        }
    }
}

impl SimConfig {
    /// Apply signed counts as given on a command line
    pub fn with_counts(mut self, n: i64, nsteps: i64) -> Result<Self, ConfigError> {
        if n <= 0 {
            return Err(ConfigError::NonPositiveBodyCount(n));
        }
        if nsteps < 0 {
            return Err(ConfigError::NegativeSteps(nsteps));
        }
        self.n = n as usize;
        self.nsteps = nsteps as usize;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::NonPositiveBodyCount(0));
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidTimestep(self.dt));
        }
        if !self.g.is_finite() {
            return Err(ConfigError::InvalidGravity(self.g));
        }
        if !(self.softening.is_finite() && self.softening >= 0.0) {
            return Err(ConfigError::InvalidSoftening(self.softening));
        }
        self.validate_scenario()
    }

    /// Check externally supplied initial state against this configuration.
    ///
    /// Masses must be positive and every field finite; anything else would
    /// only surface as NaN somewhere mid-run.
    pub fn validate_bodies(&self, bodies: &[Body]) -> Result<(), ConfigError> {
        if bodies.len() != self.n {
            return Err(ConfigError::ScenarioBodyCount {
                expected: bodies.len(),
                actual: self.n,
            });
        }
        for (index, body) in bodies.iter().enumerate() {
            if !body.is_finite() {
                return Err(ConfigError::InvalidBody {
                    index,
                    reason: "non-finite position, velocity or mass".to_string(),
                });
            }
            if body.mass <= 0.0 {
                return Err(ConfigError::InvalidBody {
                    index,
                    reason: format!("mass must be positive, got {}", body.mass),
                });
            }
        }
        Ok(())
    }

    fn validate_scenario(&self) -> Result<(), ConfigError> {
        match &self.scenario {
            Scenario::Random {
                extent,
                max_speed,
                min_mass,
                max_mass,
            } => {
                if !(extent.is_finite() && *extent > 0.0) {
                    return Err(ConfigError::InvalidScenario(format!("extent {extent}")));
                }
                if !(max_speed.is_finite() && *max_speed >= 0.0) {
                    return Err(ConfigError::InvalidScenario(format!("max_speed {max_speed}")));
                }
                if !(min_mass.is_finite() && *min_mass > 0.0 && max_mass >= min_mass && max_mass.is_finite()) {
                    return Err(ConfigError::InvalidScenario(format!(
                        "mass range {min_mass}..{max_mass}"
                    )));
                }
                Ok(())
            }
            Scenario::TwoBody { separation, mass } => {
                if self.n != 2 {
                    return Err(ConfigError::ScenarioBodyCount {
                        expected: 2,
                        actual: self.n,
                    });
                }
                if !(separation.is_finite() && *separation > 0.0) {
                    return Err(ConfigError::InvalidScenario(format!("separation {separation}")));
                }
                if !(mass.is_finite() && *mass > 0.0) {
                    return Err(ConfigError::InvalidScenario(format!("mass {mass}")));
                }
                Ok(())
            }
            // Body count is checked against the file when it is loaded
            Scenario::Snapshot { .. } => Ok(()),
        }
    }
}

/// Per-PE view of the run: the shared parameters plus this PE's identity.
///
/// Built once per PE and handed by reference to every component.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    sim: SimConfig,
    rank: usize,
    partition: Partition,
}

impl GlobalConfig {
    pub fn new(sim: SimConfig, rank: usize, npes: usize) -> Result<Self, ConfigError> {
        if npes == 0 {
            return Err(ConfigError::NoProcesses);
        }
        if rank >= npes {
            return Err(ConfigError::RankOutOfRange { rank, npes });
        }
        sim.validate()?;
        let partition = Partition::new(sim.n, npes)?;
        Ok(Self {
            sim,
            rank,
            partition,
        })
    }

    pub fn sim(&self) -> &SimConfig {
        &self.sim
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn npes(&self) -> usize {
        self.partition.npes()
    }

    pub fn n(&self) -> usize {
        self.sim.n
    }

    pub fn nsteps(&self) -> usize {
        self.sim.nsteps
    }

    pub fn dt(&self) -> f64 {
        self.sim.dt
    }

    pub fn g(&self) -> f64 {
        self.sim.g
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Index range this PE is the sole writer for
    pub fn local_range(&self) -> std::ops::Range<usize> {
        self.partition.local_range(self.rank)
    }

    /// The PE that reports on behalf of all others
    pub fn is_reporter(&self) -> bool {
        self.rank == 0
    }
}
