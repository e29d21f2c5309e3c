use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::constants::BODY_WORDS;

/// A point mass.
///
/// Must stay repr(C) and Pod: the symmetric region stores bodies as raw
/// `[u64; BODY_WORDS]` records and casts back and forth.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Body {
    /// Position (x, y, z)
    pub position: [f64; 3],
    /// Velocity (dx, dy, dz)
    pub velocity: [f64; 3],
    /// Mass, never mutated after initialization
    pub mass: f64,
}

impl Body {
    pub fn new(position: [f64; 3], velocity: [f64; 3], mass: f64) -> Self {
        Self {
            position,
            velocity,
            mass,
        }
    }

    /// Momentum vector m * v
    pub fn momentum(&self) -> [f64; 3] {
        [
            self.mass * self.velocity[0],
            self.mass * self.velocity[1],
            self.mass * self.velocity[2],
        ]
    }

    /// Raw word representation used for one-sided transfers
    pub fn to_words(self) -> [u64; BODY_WORDS] {
        bytemuck::cast(self)
    }

    pub fn from_words(words: [u64; BODY_WORDS]) -> Self {
        bytemuck::cast(words)
    }

    /// True when every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.velocity.iter().all(|c| c.is_finite())
            && self.mass.is_finite()
    }
}

/// Per-body acceleration held in a process-local buffer
pub type Accel = [f64; 3];
