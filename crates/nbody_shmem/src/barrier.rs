use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug)]
struct BarrierState {
    waiting: usize,
    generation: u64,
}

/// Reusable rendezvous for a fixed number of parties.
///
/// `wait` blocks until every party has arrived, then releases them all and
/// returns the new generation. Generations count completed rendezvous, so
/// all PEs agree on them like a shared step counter. There is no timeout: a
/// party that never arrives blocks the others forever.
///
/// Release also publishes every write made before `wait` to every party
/// returning from it.
#[derive(Debug)]
pub struct StepBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl StepBarrier {
    pub fn new(parties: usize) -> Self {
        Self {
            parties,
            state: Mutex::new(BarrierState {
                waiting: 0,
                generation: 0,
            }),
            released: Condvar::new(),
        }
    }

    pub fn wait(&self) -> u64 {
        // A panicking PE cannot leave the counters half-updated
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let arrived_in = state.generation;
        state.waiting += 1;

        if state.waiting >= self.parties {
            state.waiting = 0;
            state.generation += 1;
            self.released.notify_all();
            return state.generation;
        }

        while state.generation == arrived_in {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.generation
    }

    /// Number of completed rendezvous
    pub fn generation(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }
}
