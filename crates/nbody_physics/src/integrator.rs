use nbody_core::{Accel, Body};

/// One symplectic Euler step: the velocity is kicked first and the drift
/// uses the updated velocity. Mass is left untouched.
pub fn symplectic_euler(body: &Body, accel: &Accel, dt: f64) -> Body {
    let mut next = *body;
    for k in 0..3 {
        next.velocity[k] += accel[k] * dt;
        next.position[k] += next.velocity[k] * dt;
    }
    next
}

/// Advance a slice of bodies in place with matching accelerations
pub fn advance_all(bodies: &mut [Body], accels: &[Accel], dt: f64) {
    debug_assert_eq!(bodies.len(), accels.len());
    for (b, a) in bodies.iter_mut().zip(accels) {
        *b = symplectic_euler(b, a, dt);
    }
}
