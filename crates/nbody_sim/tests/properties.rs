use nbody_core::{Body, ConfigError, Partition, Scenario, SimConfig};
use nbody_physics::diagnostics::{magnitude, total_momentum};
use nbody_physics::procgen::{circular_pair, circular_period, random_body, ScatterParams};
use nbody_sim::{run_from_bodies, run_simulation, SimError};
use nbody_storage::{save_snapshot, Snapshot};

fn small_random(n: usize, nsteps: usize) -> SimConfig {
    SimConfig {
        n,
        nsteps,
        ..SimConfig::default()
    }
}

fn scatter() -> ScatterParams {
    match Scenario::default() {
        Scenario::Random {
            extent,
            max_speed,
            min_mass,
            max_mass,
        } => ScatterParams {
            extent,
            max_speed,
            min_mass,
            max_mass,
        },
        other => panic!("unexpected default scenario {other:?}"),
    }
}

#[test]
fn test_partition_completeness() {
    for n in [1, 2, 3, 7, 10, 64, 101] {
        for npes in 1..=12 {
            let part = Partition::new(n, npes).unwrap();
            let mut seen = vec![0u32; n];
            for range in part.ranges() {
                for i in range {
                    seen[i] += 1;
                }
            }
            assert!(seen.iter().all(|&c| c == 1), "n={n} npes={npes}");
        }
    }
}

#[test]
fn test_zero_step_run_keeps_initial_state() {
    let config = small_random(13, 0);
    let out = run_simulation(&config, 4).unwrap();

    let expected: Vec<Body> = (0..13)
        .map(|i| random_body(config.seed, i, &scatter()))
        .collect();
    assert_eq!(out.bodies, expected);
    assert_eq!(out.steps, 0);
    assert!(out.reports.iter().all(|r| r.barriers == 1));
}

#[test]
fn test_single_process_equivalence() {
    let config = small_random(37, 6);
    let reference = run_simulation(&config, 1).unwrap();

    for npes in [2, 3, 5, 8] {
        let out = run_simulation(&config, npes).unwrap();
        // Forces are summed in index order regardless of partitioning
        assert_eq!(out.bodies, reference.bodies, "npes={npes}");
    }
}

#[test]
fn test_determinism() {
    let config = small_random(25, 5);
    let a = run_simulation(&config, 3).unwrap();
    let b = run_simulation(&config, 3).unwrap();
    assert_eq!(a.bodies, b.bodies);
}

#[test]
fn test_more_pes_than_bodies() {
    let config = small_random(3, 4);
    let reference = run_simulation(&config, 1).unwrap();
    let out = run_simulation(&config, 6).unwrap();
    assert_eq!(out.bodies, reference.bodies);
    assert_eq!(out.reports.len(), 6);
    assert!(out.reports.iter().any(|r| r.local_range.is_empty()));
}

#[test]
fn test_momentum_conserved_symmetric_pair() {
    let bodies = vec![
        Body::new([-1.0, 0.0, 0.0], [0.0, -0.3, 0.1], 1.0),
        Body::new([1.0, 0.0, 0.0], [0.0, 0.3, -0.1], 1.0),
    ];
    let config = SimConfig {
        n: 2,
        nsteps: 200,
        dt: 0.01,
        g: 1.0,
        ..SimConfig::default()
    };
    let out = run_from_bodies(&config, 2, &bodies).unwrap();
    assert!(magnitude(total_momentum(&out.bodies)) < 1e-12);
    assert_ne!(out.bodies, bodies);
}

#[test]
fn test_momentum_conserved_random() {
    let config = small_random(30, 10);
    let initial: Vec<Body> = (0..30)
        .map(|i| random_body(config.seed, i, &scatter()))
        .collect();
    let out = run_simulation(&config, 4).unwrap();

    let p0 = total_momentum(&initial);
    let p1 = total_momentum(&out.bodies);
    let scale: f64 = initial.iter().map(|b| magnitude(b.momentum())).sum();
    let drift = magnitude([p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]]);
    assert!(drift <= 1e-9 * scale, "momentum drift {drift} vs scale {scale}");
}

#[test]
fn test_two_body_kepler_period() {
    let (separation, mass, g) = (1.0, 0.5, 1.0);
    let period = circular_period(separation, mass, g);
    let nsteps = 20_000;
    let config = SimConfig {
        n: 2,
        nsteps,
        dt: period / nsteps as f64,
        g,
        check_finite: true,
        scenario: Scenario::TwoBody { separation, mass },
        ..SimConfig::default()
    };

    let initial = circular_pair(separation, mass, g);
    for npes in [1, 2] {
        let out = run_simulation(&config, npes).unwrap();
        let before = relative(&initial);
        let after = relative(&out.bodies);
        let err = magnitude([after[0] - before[0], after[1] - before[1], after[2] - before[2]]);
        assert!(err < 1e-2 * separation, "npes={npes} drift {err}");
    }
}

fn relative(bodies: &[Body]) -> [f64; 3] {
    let (a, b) = (bodies[0].position, bodies[1].position);
    [b[0] - a[0], b[1] - a[1], b[2] - a[2]]
}

fn coincident() -> Vec<Body> {
    vec![
        Body::new([0.0, 0.0, 0.0], [0.0; 3], 1.0),
        Body::new([5.0, 0.0, 0.0], [0.0; 3], 1.0),
        Body::new([5.0, 0.0, 0.0], [0.0; 3], 1.0),
    ]
}

#[test]
fn test_degenerate_pair_fails_fast_on_every_pe() {
    let config = SimConfig {
        n: 3,
        nsteps: 5,
        g: 1.0,
        check_finite: true,
        ..SimConfig::default()
    };
    let err = run_from_bodies(&config, 3, &coincident()).unwrap_err();
    assert!(matches!(err, SimError::NonFinite { step: 0, index: 1 }), "{err}");
}

#[test]
fn test_degenerate_pair_propagates_without_check() {
    let config = SimConfig {
        n: 3,
        nsteps: 2,
        g: 1.0,
        ..SimConfig::default()
    };
    let out = run_from_bodies(&config, 2, &coincident()).unwrap();
    assert!(!out.bodies[1].is_finite());
    assert!(!out.bodies[2].is_finite());
    // Mass is never touched by integration
    assert!(out.bodies.iter().all(|b| b.mass == 1.0));

    // Each PE notes where it first saw the NaN even though nobody aborted
    assert_eq!(out.reports[1].first_non_finite, Some((0, 1)));
    assert_eq!(out.reports[0].first_non_finite, Some((1, 0)));
}

#[test]
fn test_softening_keeps_degenerate_pair_finite() {
    let config = SimConfig {
        n: 3,
        nsteps: 2,
        g: 1.0,
        softening: 0.1,
        check_finite: true,
        ..SimConfig::default()
    };
    let out = run_from_bodies(&config, 2, &coincident()).unwrap();
    assert!(out.bodies.iter().all(Body::is_finite));
}

#[test]
fn test_configuration_errors() {
    let config = small_random(4, 1);
    assert!(matches!(
        run_simulation(&config, 0),
        Err(SimError::Config(ConfigError::NoProcesses))
    ));

    let bad_dt = SimConfig {
        dt: -1.0,
        ..small_random(4, 1)
    };
    assert!(matches!(
        run_simulation(&bad_dt, 3),
        Err(SimError::Config(ConfigError::InvalidTimestep(_)))
    ));

    let empty = SimConfig {
        n: 0,
        ..SimConfig::default()
    };
    assert!(matches!(
        run_simulation(&empty, 2),
        Err(SimError::Config(ConfigError::NonPositiveBodyCount(0)))
    ));

    assert!(matches!(
        run_from_bodies(&small_random(4, 1), 2, &coincident()),
        Err(SimError::Config(ConfigError::ScenarioBodyCount {
            expected: 3,
            actual: 4
        }))
    ));
}

#[test]
fn test_invalid_loaded_bodies_rejected_before_launch() {
    let config = SimConfig {
        n: 2,
        nsteps: 3,
        g: 1.0,
        ..SimConfig::default()
    };
    let weightless = vec![
        Body::new([0.0; 3], [0.0; 3], 1.0),
        Body::new([1.0, 0.0, 0.0], [0.0; 3], 0.0),
    ];
    assert!(matches!(
        run_from_bodies(&config, 2, &weightless),
        Err(SimError::Config(ConfigError::InvalidBody { index: 1, .. }))
    ));

    let runaway = vec![
        Body::new([0.0; 3], [f64::INFINITY, 0.0, 0.0], 1.0),
        Body::new([1.0, 0.0, 0.0], [0.0; 3], 1.0),
    ];
    assert!(matches!(
        run_from_bodies(&config, 1, &runaway),
        Err(SimError::Config(ConfigError::InvalidBody { index: 0, .. }))
    ));
}

#[test]
fn test_zero_mass_snapshot_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weightless.bin");
    let config = SimConfig {
        n: 2,
        nsteps: 1,
        g: 1.0,
        ..SimConfig::default()
    };
    let bodies = vec![
        Body::new([0.0; 3], [0.0; 3], 0.0),
        Body::new([1.0, 0.0, 0.0], [0.0; 3], 1.0),
    ];
    save_snapshot(&Snapshot::new(0, config.clone(), bodies), &path).unwrap();

    let resumed = SimConfig {
        scenario: Scenario::Snapshot { path },
        ..config
    };
    assert!(matches!(
        run_simulation(&resumed, 2),
        Err(SimError::Config(ConfigError::InvalidBody { index: 0, .. }))
    ));
}

#[test]
fn test_resume_from_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");

    let first = small_random(11, 3);
    let out = run_simulation(&first, 2).unwrap();
    save_snapshot(&Snapshot::new(3, first.clone(), out.bodies.clone()), &path).unwrap();

    let resumed = SimConfig {
        nsteps: 2,
        scenario: Scenario::Snapshot { path: path.clone() },
        ..first.clone()
    };
    let continued = run_simulation(&resumed, 3).unwrap();

    let straight = run_simulation(&small_random(11, 5), 2).unwrap();
    assert_eq!(continued.bodies, straight.bodies);

    let wrong_count = SimConfig {
        n: 12,
        ..resumed
    };
    assert!(matches!(
        run_simulation(&wrong_count, 1),
        Err(SimError::Config(ConfigError::ScenarioBodyCount { .. }))
    ));
}
