use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;

use nbody_core::{Body, Partition};
use tracing::debug;

use crate::barrier::StepBarrier;
use crate::error::{RuntimeError, StoreError};
use crate::region::SymmetricRegion;
use crate::store::{BodyStore, Collective};

/// Environment variable holding the number of PEs to launch
pub const PES_ENV: &str = "NBODY_PES";

/// PE count supplied by the runtime environment.
///
/// Falls back to the available hardware parallelism when `NBODY_PES` is unset.
pub fn pes_from_env() -> Result<usize, RuntimeError> {
    match std::env::var(PES_ENV) {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(RuntimeError::InvalidPeCount {
                var: PES_ENV,
                value,
            }),
        },
        Err(_) => Ok(thread::available_parallelism().map(|n| n.get()).unwrap_or(1)),
    }
}

/// Collective fault marker.
///
/// Any PE may raise it during a read phase; every PE checks it after the
/// following barrier, so all of them see the same value and leave together.
/// Keeps the lowest body index raised.
#[derive(Debug)]
pub struct FaultFlag {
    first: AtomicU64,
}

impl FaultFlag {
    const CLEAR: u64 = u64::MAX;

    pub fn new() -> Self {
        Self {
            first: AtomicU64::new(Self::CLEAR),
        }
    }

    pub fn raise(&self, index: usize) {
        self.first.fetch_min(index as u64, Ordering::Relaxed);
    }

    pub fn get(&self) -> Option<usize> {
        match self.first.load(Ordering::Relaxed) {
            Self::CLEAR => None,
            index => Some(index as usize),
        }
    }
}

impl Default for FaultFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The shared state of `npes` cooperating PEs
pub struct World {
    partition: Partition,
    region: SymmetricRegion,
    barrier: StepBarrier,
    fault: FaultFlag,
}

/// Holds spawned PEs back until every spawn has succeeded.
///
/// If a spawn fails the gate is shut instead, and the PEs already started
/// return without ever reaching a barrier sized for the full world.
#[derive(Debug, Default)]
pub struct StartGate {
    state: Mutex<Option<bool>>,
    changed: Condvar,
}

impl StartGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn settle(&self, go: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = Some(go);
        self.changed.notify_all();
    }

    pub fn open(&self) {
        self.settle(true);
    }

    pub fn shut(&self) {
        self.settle(false);
    }

    /// Block until the gate is settled; true if the PE may run
    pub fn pass(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(go) = *state {
                return go;
            }
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl World {
    /// Allocate a world of `npes` PEs with room for `n` bodies in every segment
    pub fn new(npes: usize, n: usize) -> Result<Self, RuntimeError> {
        let partition = Partition::new(n, npes).map_err(|_| RuntimeError::NoProcesses)?;
        Ok(Self {
            partition,
            region: SymmetricRegion::new(npes, n),
            barrier: StepBarrier::new(npes),
            fault: FaultFlag::new(),
        })
    }

    pub fn npes(&self) -> usize {
        self.partition.npes()
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn barrier(&self) -> &StepBarrier {
        &self.barrier
    }

    /// Copy the full state out of the owners' segments.
    ///
    /// Only meaningful while no PE is running, e.g. after [`World::launch`]
    /// has returned.
    pub fn gather(&self, out: &mut [Body]) -> Result<(), StoreError> {
        if out.len() != self.partition.body_count() {
            return Err(StoreError::BufferLength {
                expected: self.partition.body_count(),
                actual: out.len(),
            });
        }
        for (pe, range) in self.partition.ranges().enumerate() {
            self.region.get_range(pe, range.clone(), &mut out[range])?;
        }
        Ok(())
    }

    /// Run `f` once on every PE, each on its own named thread.
    ///
    /// Results come back in rank order. No PE starts until all of them have
    /// been spawned. A PE that panics while others wait at a barrier stalls
    /// the whole world; this is not recovered.
    pub fn launch<T, F>(&self, f: F) -> Result<Vec<T>, RuntimeError>
    where
        T: Send,
        F: Fn(Pe<'_>) -> T + Sync,
    {
        let npes = self.npes();
        debug!(npes, n = self.partition.body_count(), "launching PEs");
        let gate = StartGate::new();

        thread::scope(|s| -> Result<Vec<T>, RuntimeError> {
            let (f, gate) = (&f, &gate);
            let mut handles = Vec::with_capacity(npes);
            for rank in 0..npes {
                let pe = Pe { rank, world: self };
                let spawned = thread::Builder::new()
                    .name(format!("pe-{rank}"))
                    .spawn_scoped(s, move || gate.pass().then(|| f(pe)));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        gate.shut();
                        for h in handles {
                            let _ = h.join();
                        }
                        return Err(RuntimeError::Spawn { rank, source });
                    }
                }
            }
            gate.open();

            // Join everyone before reporting so no panic escapes the scope
            let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
            joined
                .into_iter()
                .enumerate()
                .map(|(rank, r)| r.ok().flatten().ok_or(RuntimeError::PeFailed { rank }))
                .collect()
        })
    }
}

/// Handle given to one PE: its identity plus access to the shared world
#[derive(Clone, Copy)]
pub struct Pe<'w> {
    rank: usize,
    world: &'w World,
}

impl Collective for Pe<'_> {
    fn npes(&self) -> usize {
        self.world.npes()
    }

    fn barrier(&mut self) -> Result<(), StoreError> {
        self.world.barrier.wait();
        Ok(())
    }

    fn raise_fault(&mut self, index: usize) -> Result<(), StoreError> {
        self.world.fault.raise(index);
        Ok(())
    }

    fn fault(&self) -> Result<Option<usize>, StoreError> {
        Ok(self.world.fault.get())
    }
}

impl BodyStore for Pe<'_> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn partition(&self) -> &Partition {
        &self.world.partition
    }

    fn fetch(&self, pe: usize, index: usize) -> Result<Body, StoreError> {
        let npes = self.world.npes();
        if pe >= npes {
            return Err(StoreError::NoSuchPe { pe, npes });
        }
        match self.world.partition.owner(index) {
            None => Err(StoreError::IndexOutOfRange {
                index,
                n: self.world.partition.body_count(),
            }),
            Some(owner) if owner != pe => Err(StoreError::NotOwner { pe, index }),
            Some(_) => self.world.region.get(pe, index),
        }
    }

    fn put_local(&mut self, index: usize, body: Body) -> Result<(), StoreError> {
        match self.world.partition.owner(index) {
            None => Err(StoreError::IndexOutOfRange {
                index,
                n: self.world.partition.body_count(),
            }),
            Some(owner) if owner != self.rank => Err(StoreError::NotOwner {
                pe: self.rank,
                index,
            }),
            Some(_) => self.world.region.put(self.rank, index, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(x: f64) -> Body {
        Body::new([x, 0.0, 0.0], [0.0; 3], 1.0)
    }

    #[test]
    fn test_zero_pes_rejected() {
        assert!(matches!(World::new(0, 10), Err(RuntimeError::NoProcesses)));
    }

    #[test]
    fn test_launch_returns_in_rank_order() {
        let world = World::new(4, 8).unwrap();
        let ranks = world
            .launch(|pe| {
                let name = thread::current().name().map(str::to_owned);
                (pe.rank(), name)
            })
            .unwrap();
        for (i, (rank, name)) in ranks.iter().enumerate() {
            assert_eq!(*rank, i);
            assert_eq!(name.as_deref(), Some(format!("pe-{i}").as_str()));
        }
    }

    #[test]
    fn test_writes_visible_after_barrier() {
        let world = World::new(3, 7).unwrap();
        let views = world
            .launch(|mut pe| {
                for i in pe.local_range() {
                    pe.put_local(i, body(i as f64)).unwrap();
                }
                pe.barrier().unwrap();
                let mut all = vec![body(-1.0); 7];
                pe.snapshot(&mut all).unwrap();
                all
            })
            .unwrap();
        for view in views {
            let xs: Vec<f64> = view.iter().map(|b| b.position[0]).collect();
            assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        }
    }

    #[test]
    fn test_gather_after_launch() {
        let world = World::new(3, 5).unwrap();
        world
            .launch(|mut pe| {
                for i in pe.local_range() {
                    pe.put_local(i, body(10.0 * i as f64)).unwrap();
                }
            })
            .unwrap();
        let mut out = vec![body(0.0); 5];
        world.gather(&mut out).unwrap();
        assert_eq!(out[4].position[0], 40.0);
        assert_eq!(out[1].position[0], 10.0);
    }

    #[test]
    fn test_ownership_enforced() {
        let world = World::new(2, 4).unwrap();
        world
            .launch(|mut pe| {
                let foreign = if pe.rank() == 0 { 3 } else { 0 };
                assert_eq!(
                    pe.put_local(foreign, body(0.0)),
                    Err(StoreError::NotOwner {
                        pe: pe.rank(),
                        index: foreign
                    })
                );
                assert_eq!(
                    pe.fetch(pe.rank(), foreign),
                    Err(StoreError::NotOwner {
                        pe: pe.rank(),
                        index: foreign
                    })
                );
                assert_eq!(
                    pe.fetch(5, 0),
                    Err(StoreError::NoSuchPe { pe: 5, npes: 2 })
                );
                assert_eq!(
                    pe.put_local(4, body(0.0)),
                    Err(StoreError::IndexOutOfRange { index: 4, n: 4 })
                );
            })
            .unwrap();
    }

    #[test]
    fn test_fetch_partition_length_checked() {
        let world = World::new(2, 5).unwrap();
        world
            .launch(|pe| {
                let mut wrong = vec![body(0.0); 1];
                assert_eq!(
                    pe.fetch_partition(1, &mut wrong),
                    Err(StoreError::BufferLength {
                        expected: 3,
                        actual: 1
                    })
                );
            })
            .unwrap();
    }

    #[test]
    fn test_fault_flag_keeps_lowest() {
        let flag = FaultFlag::new();
        assert_eq!(flag.get(), None);
        flag.raise(9);
        flag.raise(4);
        flag.raise(6);
        assert_eq!(flag.get(), Some(4));
    }

    #[test]
    fn test_fault_shared_after_barrier() {
        let world = World::new(3, 6).unwrap();
        let seen = world
            .launch(|mut pe| {
                if pe.rank() > 0 {
                    pe.raise_fault(pe.local_range().start).unwrap();
                }
                pe.barrier().unwrap();
                pe.fault().unwrap()
            })
            .unwrap();
        assert_eq!(seen, vec![Some(2); 3]);
    }

    #[test]
    fn test_shut_gate_releases_waiters() {
        let gate = StartGate::new();
        let ran = thread::scope(|s| {
            let waiters: Vec<_> = (0..3).map(|_| s.spawn(|| gate.pass())).collect();
            gate.shut();
            waiters
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<bool>>()
        });
        assert_eq!(ran, vec![false; 3]);
        // Settled gates answer immediately
        assert!(!gate.pass());
    }

    #[test]
    fn test_open_gate_lets_pes_run() {
        let gate = StartGate::new();
        gate.open();
        assert!(gate.pass());
    }

    #[test]
    fn test_panicking_pe_reported() {
        let world = World::new(2, 2).unwrap();
        let result = world.launch(|pe| {
            if pe.rank() == 1 {
                panic!("boom");
            }
        });
        assert!(matches!(result, Err(RuntimeError::PeFailed { rank: 1 })));
    }
}
