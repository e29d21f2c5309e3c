use std::ops::Range;

use nbody_core::{Accel, Body, SimConfig};

/// Newtonian gravity with optional Plummer softening
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    pub g: f64,
    /// Softening length squared; zero is the exact inverse-square law
    pub softening2: f64,
}

impl Gravity {
    pub fn new(g: f64, softening: f64) -> Self {
        Self {
            g,
            softening2: softening * softening,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.g, config.softening)
    }

    /// Acceleration on a body at `pos_i` due to mass `mass_j` at `pos_j`.
    ///
    /// Coincident positions with zero softening yield NaN components; the
    /// value is returned as is and left for the caller to detect.
    pub fn pair_acceleration(&self, pos_i: [f64; 3], pos_j: [f64; 3], mass_j: f64) -> Accel {
        let dx = pos_j[0] - pos_i[0];
        let dy = pos_j[1] - pos_i[1];
        let dz = pos_j[2] - pos_i[2];

        let r2 = dx * dx + dy * dy + dz * dz + self.softening2;
        let r = r2.sqrt();
        let r3 = r2 * r;

        let f = self.g * mass_j / r3;

        [f * dx, f * dy, f * dz]
    }

    /// Net acceleration on `bodies[i]` from every other body.
    ///
    /// Sources are summed in index order so the result does not depend on
    /// how the bodies are partitioned.
    pub fn acceleration_on(&self, bodies: &[Body], i: usize) -> Accel {
        let pos_i = bodies[i].position;
        let mut acc = [0.0f64; 3];
        for (j, bj) in bodies.iter().enumerate() {
            if j == i {
                continue;
            }
            let a = self.pair_acceleration(pos_i, bj.position, bj.mass);
            acc[0] += a[0];
            acc[1] += a[1];
            acc[2] += a[2];
        }
        acc
    }

    /// Fill `out[k]` with the acceleration of body `range.start + k`.
    ///
    /// `bodies` is the full N-body state; `out` must be the length of `range`.
    pub fn accumulate(&self, bodies: &[Body], range: Range<usize>, out: &mut [Accel]) {
        debug_assert_eq!(out.len(), range.len());
        for (slot, i) in out.iter_mut().zip(range) {
            *slot = self.acceleration_on(bodies, i);
        }
    }
}

/// Offset of the first acceleration with a non-finite component
pub fn first_non_finite(accels: &[Accel]) -> Option<usize> {
    accels
        .iter()
        .position(|a| !(a[0].is_finite() && a[1].is_finite() && a[2].is_finite()))
}
