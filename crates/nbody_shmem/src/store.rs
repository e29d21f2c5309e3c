use std::ops::Range;

use nbody_core::{Body, Partition};

use crate::error::StoreError;

/// One PE's view of the body store.
///
/// Reads may target any PE; writes only the caller's own partition. Values
/// read between two barriers reflect each owner's last write before the
/// first of them.
pub trait BodyStore {
    fn rank(&self) -> usize;

    fn partition(&self) -> &Partition;

    /// One-sided get of body `index` from the PE that owns it
    fn fetch(&self, pe: usize, index: usize) -> Result<Body, StoreError>;

    /// Write a locally owned body
    fn put_local(&mut self, index: usize, body: Body) -> Result<(), StoreError>;

    fn local_range(&self) -> Range<usize> {
        self.partition().local_range(self.rank())
    }

    /// Batched get of PE `pe`'s whole partition into `out`
    fn fetch_partition(&self, pe: usize, out: &mut [Body]) -> Result<(), StoreError> {
        let range = self.partition().local_range(pe);
        if out.len() != range.len() {
            return Err(StoreError::BufferLength {
                expected: range.len(),
                actual: out.len(),
            });
        }
        for (dst, index) in out.iter_mut().zip(range) {
            *dst = self.fetch(pe, index)?;
        }
        Ok(())
    }

    /// Assemble the full N-body state, partition by partition
    fn snapshot(&self, out: &mut [Body]) -> Result<(), StoreError> {
        let partition = *self.partition();
        if out.len() != partition.body_count() {
            return Err(StoreError::BufferLength {
                expected: partition.body_count(),
                actual: out.len(),
            });
        }
        for (pe, range) in partition.ranges().enumerate() {
            self.fetch_partition(pe, &mut out[range])?;
        }
        Ok(())
    }
}

/// Collective operations every PE calls in the same order
pub trait Collective {
    fn npes(&self) -> usize;

    /// Block until every PE has arrived. Puts made before the call are
    /// visible to every PE once it returns.
    fn barrier(&mut self) -> Result<(), StoreError>;

    /// Flag body `index` as faulty; seen by all PEs after the next barrier
    fn raise_fault(&mut self, index: usize) -> Result<(), StoreError>;

    /// Lowest body index raised by any PE before the last barrier
    fn fault(&self) -> Result<Option<usize>, StoreError>;
}
