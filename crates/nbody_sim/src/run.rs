use nbody_core::{Body, ConfigError, GlobalConfig, Scenario, SimConfig};
use nbody_shmem::{BodyStore, Collective, World};
use nbody_storage::load_snapshot;
use tracing::{info, info_span};

use crate::driver::{Driver, Initial, RunReport};
use crate::error::SimError;

/// Final state of a completed run
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    /// All N bodies after the last step, in index order
    pub bodies: Vec<Body>,
    pub npes: usize,
    pub steps: usize,
    /// One report per PE, in rank order
    pub reports: Vec<RunReport>,
}

/// Run `config` on `npes` PEs, taking initial conditions from its scenario
pub fn run_simulation(config: &SimConfig, npes: usize) -> Result<SimulationOutput, SimError> {
    match &config.scenario {
        Scenario::Snapshot { path } => {
            let snapshot = load_snapshot(path)?;
            info!(path = %path.display(), run_id = %snapshot.run_id, step = snapshot.step, "loaded snapshot");
            run_from_bodies(config, npes, &snapshot.bodies)
        }
        _ => execute(config, npes, Initial::Generate),
    }
}

/// Run `config` on `npes` PEs starting from explicit body state
pub fn run_from_bodies(
    config: &SimConfig,
    npes: usize,
    bodies: &[Body],
) -> Result<SimulationOutput, SimError> {
    config.validate_bodies(bodies)?;
    execute(config, npes, Initial::Loaded(bodies))
}

fn execute(config: &SimConfig, npes: usize, initial: Initial<'_>) -> Result<SimulationOutput, SimError> {
    if npes == 0 {
        return Err(ConfigError::NoProcesses.into());
    }
    // Rejected here, before any PE exists; the caller reports it
    config.validate()?;
    let world = World::new(npes, config.n)?;

    let results = world.launch(|mut pe| {
        let rank = pe.rank();
        let _span = info_span!("pe", rank).entered();
        let global = GlobalConfig::new(config.clone(), rank, pe.npes())?;
        if global.is_reporter() {
            info!(n = global.n(), npes = global.npes(), nsteps = global.nsteps(), dt = global.dt(), "starting simulation");
        }
        Driver::new(&global, &mut pe, initial).run()
    })?;

    let reports = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    let steps = reports.first().map_or(0, |r| r.steps_completed);

    // Every PE has joined; read the final state straight out of the region
    let bodies = gather(&world)?;

    Ok(SimulationOutput {
        bodies,
        npes,
        steps,
        reports,
    })
}

fn gather(world: &World) -> Result<Vec<Body>, SimError> {
    let n = world.partition().body_count();
    let mut bodies = vec![Body::new([0.0; 3], [0.0; 3], 0.0); n];
    world.gather(&mut bodies)?;
    Ok(bodies)
}

/// What one MPI rank gets back from [`run_mpi`]
#[cfg(feature = "mpi")]
#[derive(Debug, Clone)]
pub struct RankOutput {
    pub report: RunReport,
    pub npes: usize,
    /// Full final state, present on rank 0 only
    pub bodies: Option<Vec<Body>>,
}

/// Run `config` as this MPI rank.
///
/// Every rank of the job must call this with the same arguments. `bodies`
/// replaces the scenario's generated initial state when given.
#[cfg(feature = "mpi")]
pub fn run_mpi(
    runtime: &nbody_shmem::MpiRuntime,
    config: &SimConfig,
    bodies: Option<&[Body]>,
) -> Result<RankOutput, SimError> {
    config.validate()?;
    if let Some(bodies) = bodies {
        config.validate_bodies(bodies)?;
    }
    let initial = match bodies {
        Some(bodies) => Initial::Loaded(bodies),
        None if matches!(config.scenario, Scenario::Snapshot { .. }) => {
            return Err(ConfigError::InvalidScenario("snapshot bodies were not supplied".to_string()).into());
        }
        None => Initial::Generate,
    };

    let mut pe = runtime.attach(config.n)?;
    let rank = pe.rank();
    let npes = pe.npes();
    let _span = info_span!("rank", rank).entered();

    let global = GlobalConfig::new(config.clone(), rank, npes)?;
    if global.is_reporter() {
        info!(n = global.n(), npes, nsteps = global.nsteps(), dt = global.dt(), "starting simulation");
    }
    let report = Driver::new(&global, &mut pe, initial).run()?;

    let bodies = if global.is_reporter() {
        let mut all = vec![Body::new([0.0; 3], [0.0; 3], 0.0); global.n()];
        pe.snapshot(&mut all)?;
        Some(all)
    } else {
        None
    };
    // Keep every segment alive until rank 0 has read it
    pe.barrier()?;

    Ok(RankOutput { report, npes, bodies })
}
