use std::ops::Range;

use nbody_core::{Accel, Body, ConfigError, GlobalConfig, Scenario};
use nbody_physics::procgen::{self, ScatterParams};
use nbody_physics::{advance_all, diagnostics, first_non_finite, Gravity};
use nbody_shmem::{BodyStore, Collective, StoreError};
use tracing::{debug, info, trace, warn, Level};

use crate::error::SimError;

/// Position of a PE in the step cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Writing initial conditions, then the start-up barrier
    Init,
    /// Force accumulation over a consistent snapshot
    Reading,
    /// Everyone finished reading before anyone writes
    Barrier1,
    /// Integrating the local partition
    Writing,
    /// Everyone finished writing before anyone reads
    Barrier2,
    Done,
}

impl Phase {
    /// Transition taken on leaving `self` with `completed` steps finished
    pub fn next(self, completed: usize, nsteps: usize) -> Phase {
        match self {
            Phase::Init if nsteps == 0 => Phase::Done,
            Phase::Init => Phase::Reading,
            Phase::Reading => Phase::Barrier1,
            Phase::Barrier1 => Phase::Writing,
            Phase::Writing => Phase::Barrier2,
            Phase::Barrier2 if completed >= nsteps => Phase::Done,
            Phase::Barrier2 => Phase::Reading,
            Phase::Done => Phase::Done,
        }
    }
}

/// Where initial body state comes from
#[derive(Debug, Clone, Copy)]
pub enum Initial<'a> {
    /// Generated per body from the configured scenario
    Generate,
    /// Supplied by the environment, one entry per body
    Loaded(&'a [Body]),
}

/// What one PE hands back when its driver reaches `Done`
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub rank: usize,
    pub steps_completed: usize,
    pub local_range: Range<usize>,
    /// Barrier calls made by this PE
    pub barriers: u64,
    /// (step, index) of the first non-finite acceleration this PE computed
    pub first_non_finite: Option<(usize, usize)>,
}

/// Per-PE driver loop.
///
/// Owns the process-local snapshot and acceleration buffers; the only shared
/// state it touches goes through the store handle.
pub struct Driver<'a, S> {
    config: &'a GlobalConfig,
    pe: &'a mut S,
    initial: Initial<'a>,
    gravity: Gravity,
    phase: Phase,
    step: usize,
    barriers: u64,
    first_non_finite: Option<(usize, usize)>,
    bodies: Vec<Body>,
    accels: Vec<Accel>,
}

impl<'a, S: BodyStore + Collective> Driver<'a, S> {
    pub fn new(config: &'a GlobalConfig, pe: &'a mut S, initial: Initial<'a>) -> Self {
        let blank = Body::new([0.0; 3], [0.0; 3], 0.0);
        Self {
            config,
            pe,
            initial,
            gravity: Gravity::from_config(config.sim()),
            phase: Phase::Init,
            step: 0,
            barriers: 0,
            first_non_finite: None,
            bodies: vec![blank; config.n()],
            accels: vec![[0.0; 3]; config.local_range().len()],
        }
    }

    pub fn run(mut self) -> Result<RunReport, SimError> {
        let nsteps = self.config.nsteps();
        loop {
            match self.phase {
                Phase::Init => {
                    self.write_initial()?;
                    self.rendezvous()?;
                    self.report("initial")?;
                }
                Phase::Reading => self.read_phase()?,
                Phase::Barrier1 => {
                    self.rendezvous()?;
                    if let Some(index) = self.pe.fault()? {
                        if self.config.is_reporter() {
                            warn!(step = self.step, index, "aborting on non-finite acceleration");
                        }
                        return Err(SimError::NonFinite {
                            step: self.step,
                            index,
                        });
                    }
                }
                Phase::Writing => self.write_phase()?,
                Phase::Barrier2 => {
                    self.rendezvous()?;
                    self.step += 1;
                    debug!(step = self.step, "step complete");
                }
                Phase::Done => break,
            }
            let next = self.phase.next(self.step, nsteps);
            trace!(from = ?self.phase, to = ?next, step = self.step, "phase transition");
            self.phase = next;
        }

        self.report("final")?;
        Ok(RunReport {
            rank: self.pe.rank(),
            steps_completed: self.step,
            local_range: self.config.local_range(),
            barriers: self.barriers,
            first_non_finite: self.first_non_finite,
        })
    }

    fn rendezvous(&mut self) -> Result<(), SimError> {
        self.pe.barrier()?;
        self.barriers += 1;
        Ok(())
    }

    fn initial_body(&self, index: usize) -> Result<Body, SimError> {
        if let Initial::Loaded(bodies) = self.initial {
            return bodies.get(index).copied().ok_or_else(|| {
                SimError::Store(StoreError::IndexOutOfRange {
                    index,
                    n: bodies.len(),
                })
            });
        }

        let sim = self.config.sim();
        match &sim.scenario {
            Scenario::Random {
                extent,
                max_speed,
                min_mass,
                max_mass,
            } => {
                let params = ScatterParams {
                    extent: *extent,
                    max_speed: *max_speed,
                    min_mass: *min_mass,
                    max_mass: *max_mass,
                };
                Ok(procgen::random_body(sim.seed, index, &params))
            }
            Scenario::TwoBody { separation, mass } => {
                Ok(procgen::circular_pair(*separation, *mass, sim.g)[index])
            }
            Scenario::Snapshot { path } => Err(ConfigError::InvalidScenario(format!(
                "snapshot {} was not loaded",
                path.display()
            ))
            .into()),
        }
    }

    fn write_initial(&mut self) -> Result<(), SimError> {
        let range = self.config.local_range();
        debug!(lo = range.start, hi = range.end, "writing initial conditions");
        for index in range {
            let body = self.initial_body(index)?;
            self.pe.put_local(index, body)?;
        }
        Ok(())
    }

    /// Fetch every partition, then accumulate accelerations for the local range
    fn read_phase(&mut self) -> Result<(), SimError> {
        self.pe.snapshot(&mut self.bodies)?;

        let range = self.config.local_range();
        self.gravity
            .accumulate(&self.bodies, range.clone(), &mut self.accels);

        if let Some(k) = first_non_finite(&self.accels) {
            let index = range.start + k;
            if self.config.sim().check_finite {
                debug!(step = self.step, index, "raising fault");
                self.pe.raise_fault(index)?;
            } else if self.first_non_finite.is_none() {
                warn!(step = self.step, index, "non-finite acceleration, continuing");
            }
            self.first_non_finite.get_or_insert((self.step, index));
        }
        Ok(())
    }

    /// Advance the local partition using this step's snapshot
    fn write_phase(&mut self) -> Result<(), SimError> {
        let range = self.config.local_range();
        advance_all(&mut self.bodies[range.clone()], &self.accels, self.config.dt());
        for index in range {
            self.pe.put_local(index, self.bodies[index])?;
        }
        Ok(())
    }

    /// Rank 0 logs conservation diagnostics for the whole system.
    ///
    /// Only called where no PE can be writing: right after the start-up
    /// barrier or after the last step.
    fn report(&mut self, label: &str) -> Result<(), SimError> {
        if !self.config.is_reporter() {
            return Ok(());
        }
        self.pe.snapshot(&mut self.bodies)?;
        let p = diagnostics::total_momentum(&self.bodies);
        info!(
            label,
            step = self.step,
            momentum = ?p,
            kinetic = diagnostics::kinetic_energy(&self.bodies),
            "system state"
        );
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                label,
                energy = diagnostics::total_energy(&self.bodies, &self.gravity),
                center_of_mass = ?diagnostics::center_of_mass(&self.bodies),
                "energy"
            );
        }
        Ok(())
    }
}
