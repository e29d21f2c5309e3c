//! PEs as MPI ranks sharing one node.
//!
//! Each rank allocates a symmetric segment of a [`SharedWindow`]; remote
//! reads go straight to the owner's segment through `remote_slice`. The
//! collective step rendezvous is a window fence followed by a barrier on
//! the shared-memory communicator.

use ferrompi::{Communicator, Mpi, SharedWindow};
use nbody_core::{Body, Partition};
use tracing::{debug, info};

use crate::error::{RuntimeError, StoreError};
use crate::segment;
use crate::store::{BodyStore, Collective};

fn transport(e: ferrompi::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

fn runtime(e: ferrompi::Error) -> RuntimeError {
    RuntimeError::Mpi(e.to_string())
}

/// Initialized MPI environment; finalized on drop
pub struct MpiRuntime {
    mpi: Mpi,
}

impl MpiRuntime {
    pub fn init() -> Result<Self, RuntimeError> {
        let mpi = Mpi::init().map_err(runtime)?;
        Ok(Self { mpi })
    }

    /// Rank and size of the world communicator
    pub fn world_shape(&self) -> Result<(usize, usize), RuntimeError> {
        let world = self.mpi.world();
        let rank = usize::try_from(world.rank()).map_err(|_| RuntimeError::NoProcesses)?;
        let size = usize::try_from(world.size()).map_err(|_| RuntimeError::NoProcesses)?;
        Ok((rank, size))
    }

    /// Allocate this rank's segment for `n` bodies.
    ///
    /// Collective: every rank must call it with the same `n`. All ranks have
    /// to share one node, since bodies are read through shared memory.
    pub fn attach(&self, n: usize) -> Result<MpiPe, RuntimeError> {
        let world = self.mpi.world();
        let node = world.split_shared().map_err(runtime)?;
        if node.size() != world.size() {
            return Err(RuntimeError::NotSharedMemory {
                world: world.size() as usize,
                node: node.size() as usize,
            });
        }

        let rank = usize::try_from(node.rank()).map_err(|_| RuntimeError::NoProcesses)?;
        let npes = usize::try_from(node.size()).map_err(|_| RuntimeError::NoProcesses)?;
        let partition = Partition::new(n, npes).map_err(|_| RuntimeError::NoProcesses)?;

        let mut window = SharedWindow::<f64>::allocate(&node, segment::segment_len(n)).map_err(runtime)?;
        segment::reset(window.local_slice_mut());
        window.fence().map_err(runtime)?;

        if rank == 0 {
            info!(npes, n, "attached shared window");
        }
        debug!(rank, words = segment::segment_len(n), "segment ready");
        Ok(MpiPe {
            rank,
            partition,
            node,
            window,
        })
    }
}

/// One MPI rank's handle on the shared body store
pub struct MpiPe {
    rank: usize,
    partition: Partition,
    node: Communicator,
    window: SharedWindow<f64>,
}

impl MpiPe {
    fn segment(&self, pe: usize) -> Result<&[f64], StoreError> {
        let npes = self.partition.npes();
        if pe >= npes {
            return Err(StoreError::NoSuchPe { pe, npes });
        }
        let rank = pe.try_into().map_err(|_| StoreError::NoSuchPe { pe, npes })?;
        self.window.remote_slice(rank).map_err(transport)
    }

    fn check_owner(&self, pe: usize, index: usize) -> Result<(), StoreError> {
        match self.partition.owner(index) {
            None => Err(StoreError::IndexOutOfRange {
                index,
                n: self.partition.body_count(),
            }),
            Some(owner) if owner != pe => Err(StoreError::NotOwner { pe, index }),
            Some(_) => Ok(()),
        }
    }
}

impl BodyStore for MpiPe {
    fn rank(&self) -> usize {
        self.rank
    }

    fn partition(&self) -> &Partition {
        &self.partition
    }

    fn fetch(&self, pe: usize, index: usize) -> Result<Body, StoreError> {
        let remote = self.segment(pe)?;
        self.check_owner(pe, index)?;
        segment::read_body(remote, index)
    }

    /// One `remote_slice` per partition instead of one per body
    fn fetch_partition(&self, pe: usize, out: &mut [Body]) -> Result<(), StoreError> {
        let range = self.partition.local_range(pe);
        if out.len() != range.len() {
            return Err(StoreError::BufferLength {
                expected: range.len(),
                actual: out.len(),
            });
        }
        let remote = self.segment(pe)?;
        for (dst, index) in out.iter_mut().zip(range) {
            *dst = segment::read_body(remote, index)?;
        }
        Ok(())
    }

    fn put_local(&mut self, index: usize, body: Body) -> Result<(), StoreError> {
        self.check_owner(self.rank, index)?;
        segment::write_body(self.window.local_slice_mut(), index, body)
    }
}

impl Collective for MpiPe {
    fn npes(&self) -> usize {
        self.partition.npes()
    }

    fn barrier(&mut self) -> Result<(), StoreError> {
        self.window.fence().map_err(transport)?;
        self.node.barrier().map_err(transport)
    }

    fn raise_fault(&mut self, index: usize) -> Result<(), StoreError> {
        segment::raise(self.window.local_slice_mut(), index);
        Ok(())
    }

    fn fault(&self) -> Result<Option<usize>, StoreError> {
        let mut lowest = None;
        for pe in 0..self.partition.npes() {
            if let Some(index) = segment::fault(self.segment(pe)?) {
                lowest = Some(lowest.map_or(index, |l: usize| l.min(index)));
            }
        }
        Ok(lowest)
    }
}
