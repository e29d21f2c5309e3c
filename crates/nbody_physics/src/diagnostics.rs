use nbody_core::Body;

use crate::forces::Gravity;

/// Total linear momentum Σ m·v
pub fn total_momentum(bodies: &[Body]) -> [f64; 3] {
    let mut p = [0.0f64; 3];
    for b in bodies {
        let m = b.momentum();
        p[0] += m[0];
        p[1] += m[1];
        p[2] += m[2];
    }
    p
}

pub fn total_mass(bodies: &[Body]) -> f64 {
    bodies.iter().map(|b| b.mass).sum()
}

/// Mass-weighted mean position. Empty input gives the origin.
pub fn center_of_mass(bodies: &[Body]) -> [f64; 3] {
    let m = total_mass(bodies);
    if m == 0.0 {
        return [0.0; 3];
    }
    let mut c = [0.0f64; 3];
    for b in bodies {
        for k in 0..3 {
            c[k] += b.mass * b.position[k];
        }
    }
    [c[0] / m, c[1] / m, c[2] / m]
}

pub fn kinetic_energy(bodies: &[Body]) -> f64 {
    bodies
        .iter()
        .map(|b| {
            let v2: f64 = b.velocity.iter().map(|v| v * v).sum();
            0.5 * b.mass * v2
        })
        .sum()
}

/// Pairwise potential energy, each pair counted once.
/// Uses the same softening as the force law so energies stay comparable.
pub fn potential_energy(bodies: &[Body], gravity: &Gravity) -> f64 {
    let mut u = 0.0;
    for (i, bi) in bodies.iter().enumerate() {
        for bj in &bodies[i + 1..] {
            let dx = bj.position[0] - bi.position[0];
            let dy = bj.position[1] - bi.position[1];
            let dz = bj.position[2] - bi.position[2];
            let r = (dx * dx + dy * dy + dz * dz + gravity.softening2).sqrt();
            u -= gravity.g * bi.mass * bj.mass / r;
        }
    }
    u
}

pub fn total_energy(bodies: &[Body], gravity: &Gravity) -> f64 {
    kinetic_energy(bodies) + potential_energy(bodies, gravity)
}

/// Euclidean norm of a 3-vector
pub fn magnitude(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
