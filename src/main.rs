use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use nbody_core::{Body, Scenario, SimConfig};
#[cfg(feature = "mpi")]
use nbody_shmem::MpiRuntime;
#[cfg(not(feature = "mpi"))]
use nbody_shmem::pes_from_env;
#[cfg(feature = "mpi")]
use nbody_sim::run_mpi;
#[cfg(not(feature = "mpi"))]
use nbody_sim::{run_from_bodies, run_simulation};
use nbody_storage::{load_snapshot, save_snapshot, Snapshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Distributed all-pairs N-body simulation.
///
/// The number of processing elements comes from NBODY_PES (default: one per
/// available core), or from the MPI launcher when built with the `mpi`
/// feature; never from the command line.
#[derive(Parser, Debug)]
#[command(name = "nbody")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of bodies [default: 10000]
    #[arg(short = 'n', allow_negative_numbers = true)]
    bodies: Option<i64>,

    /// Number of timesteps [default: 10]
    #[arg(short = 't', allow_negative_numbers = true)]
    steps: Option<i64>,

    /// YAML file with simulation parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start from a saved snapshot instead of generated bodies
    #[arg(long)]
    input: Option<PathBuf>,

    /// Save the final state as a snapshot
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print every body after the run
    #[arg(long)]
    print: bool,
}

fn load_config(path: &Path) -> anyhow::Result<SimConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Validated configuration plus the snapshot being resumed, if any
#[derive(Debug)]
struct RunPlan {
    config: SimConfig,
    resumed: Option<Snapshot>,
}

impl RunPlan {
    fn initial_bodies(&self) -> Option<&[Body]> {
        self.resumed.as_ref().map(|s| s.bodies.as_slice())
    }

    /// Step number of the state `steps` steps after the start
    fn step_after(&self, steps: usize) -> u64 {
        self.resumed.as_ref().map_or(0, |s| s.step) + steps as u64
    }
}

/// Layer the configuration: snapshot or defaults, then `--config`, then flags.
///
/// A resumed run keeps the physics it was saved with unless a config file
/// is given explicitly.
fn build_plan(cli: &Cli) -> anyhow::Result<RunPlan> {
    let resumed = match &cli.input {
        Some(path) => Some(
            load_snapshot(path).with_context(|| format!("failed to load snapshot {}", path.display()))?,
        ),
        None => None,
    };
    let base = match (&cli.config, &resumed) {
        (Some(path), _) => load_config(path)?,
        (None, Some(snapshot)) => snapshot.config.clone(),
        (None, None) => SimConfig::default(),
    };
    let n = cli.bodies.unwrap_or(base.n as i64);
    let nsteps = cli.steps.unwrap_or(base.nsteps as i64);
    let mut config = base.with_counts(n, nsteps)?;
    if let Some(input) = &cli.input {
        config.scenario = Scenario::Snapshot {
            path: input.clone(),
        };
    }
    config.validate()?;
    Ok(RunPlan { config, resumed })
}

fn print_body(b: &Body) {
    println!(
        "x: {:7.3} y: {:7.3} z: {:7.3} dx: {:7.3} dy: {:7.3} dz: {:7.3}",
        b.position[0], b.position[1], b.position[2], b.velocity[0], b.velocity[1], b.velocity[2]
    );
}

fn announce(config: &SimConfig, npes: usize) {
    println!(
        "beginning N-body simulation of {} bodies with {} processes over {} timesteps",
        config.n, npes, config.nsteps
    );
}

/// Final state as seen by the reporting process
struct Completed {
    bodies: Vec<Body>,
    npes: usize,
    steps: usize,
    elapsed: Duration,
}

#[cfg(not(feature = "mpi"))]
fn simulate(plan: &RunPlan) -> anyhow::Result<Option<Completed>> {
    let npes = pes_from_env()?;
    announce(&plan.config, npes);

    let start = Instant::now();
    let output = match plan.initial_bodies() {
        Some(bodies) => run_from_bodies(&plan.config, npes, bodies)?,
        None => run_simulation(&plan.config, npes)?,
    };
    Ok(Some(Completed {
        bodies: output.bodies,
        npes: output.npes,
        steps: output.steps,
        elapsed: start.elapsed(),
    }))
}

/// Every rank runs its share; only rank 0 comes back with the final state
#[cfg(feature = "mpi")]
fn simulate(plan: &RunPlan) -> anyhow::Result<Option<Completed>> {
    let runtime = MpiRuntime::init()?;
    let (rank, npes) = runtime.world_shape()?;
    if rank == 0 {
        announce(&plan.config, npes);
    }

    let start = Instant::now();
    let output = run_mpi(&runtime, &plan.config, plan.initial_bodies())?;
    let elapsed = start.elapsed();
    Ok(output.bodies.map(|bodies| Completed {
        bodies,
        npes: output.npes,
        steps: output.report.steps_completed,
        elapsed,
    }))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let plan = build_plan(&cli)?;
    let Some(done) = simulate(&plan)? else {
        return Ok(());
    };

    println!("execution time: {:7.4} ms", done.elapsed.as_secs_f64() * 1e3);
    info!(steps = done.steps, npes = done.npes, "simulation complete");

    if cli.print {
        for b in &done.bodies {
            print_body(b);
        }
    }

    if let Some(path) = &cli.output {
        let snapshot = Snapshot::new(plan.step_after(done.steps), plan.config, done.bodies);
        save_snapshot(&snapshot, path)
            .with_context(|| format!("failed to save snapshot {}", path.display()))?;
        info!(path = %path.display(), run_id = %snapshot.run_id, step = snapshot.step, "snapshot saved");
    }

    Ok(())
}
