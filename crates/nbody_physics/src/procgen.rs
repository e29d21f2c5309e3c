use std::f64::consts::PI;

use nbody_core::constants::BODY_SEED_STRIDE;
use nbody_core::Body;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Parameters of the random scatter scenario
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterParams {
    pub extent: f64,
    pub max_speed: f64,
    pub min_mass: f64,
    pub max_mass: f64,
}

/// Generate body `index` of a random scatter.
///
/// Each body gets its own stream derived from `(seed, index)`, so the result
/// is the same whichever PE generates it.
pub fn random_body(seed: u64, index: usize, params: &ScatterParams) -> Body {
    let body_seed = seed.wrapping_add((index as u64).wrapping_mul(BODY_SEED_STRIDE));
    let mut rng = ChaCha8Rng::seed_from_u64(body_seed);

    let e = params.extent;
    let position = [
        rng.gen_range(-e..=e),
        rng.gen_range(-e..=e),
        rng.gen_range(-e..=e),
    ];

    let s = params.max_speed;
    let velocity = [
        rng.gen_range(-s..=s),
        rng.gen_range(-s..=s),
        rng.gen_range(-s..=s),
    ];

    let mass = rng.gen_range(params.min_mass..=params.max_mass);

    Body::new(position, velocity, mass)
}

/// Two equal masses on a circular orbit in the xy plane.
///
/// The barycentre sits at the origin and total momentum is zero.
pub fn circular_pair(separation: f64, mass: f64, g: f64) -> [Body; 2] {
    // Each body circles the barycentre at radius d/2: v² / (d/2) = G m / d²
    let v = (g * mass / (2.0 * separation)).sqrt();
    let half = separation / 2.0;
    [
        Body::new([-half, 0.0, 0.0], [0.0, -v, 0.0], mass),
        Body::new([half, 0.0, 0.0], [0.0, v, 0.0], mass),
    ]
}

/// Period of the orbit produced by [`circular_pair`]
pub fn circular_period(separation: f64, mass: f64, g: f64) -> f64 {
    2.0 * PI * (separation.powi(3) / (g * 2.0 * mass)).sqrt()
}
