use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use nbody_core::{Body, BODY_WORDS};

use crate::error::StoreError;

/// One segment of `n` body slots per PE, identical layout on every PE.
///
/// A slot is `BODY_WORDS` atomic words, so a concurrent read can never see a
/// half-written word. Ordering between a put on one PE and a get on another
/// comes from the step barrier, not from the atomics, so all accesses here
/// are `Relaxed`.
pub struct SymmetricRegion {
    npes: usize,
    n: usize,
    segments: Vec<Box<[AtomicU64]>>,
}

impl SymmetricRegion {
    pub fn new(npes: usize, n: usize) -> Self {
        let segments = (0..npes)
            .map(|_| (0..n * BODY_WORDS).map(|_| AtomicU64::new(0)).collect())
            .collect();
        Self { npes, n, segments }
    }

    fn slot(&self, pe: usize, index: usize) -> Result<&[AtomicU64], StoreError> {
        let segment = self.segments.get(pe).ok_or(StoreError::NoSuchPe {
            pe,
            npes: self.npes,
        })?;
        if index >= self.n {
            return Err(StoreError::IndexOutOfRange { index, n: self.n });
        }
        let base = index * BODY_WORDS;
        Ok(&segment[base..base + BODY_WORDS])
    }

    /// Get body `index` from PE `pe`'s segment
    pub fn get(&self, pe: usize, index: usize) -> Result<Body, StoreError> {
        let slot = self.slot(pe, index)?;
        let mut words = [0u64; BODY_WORDS];
        for (w, cell) in words.iter_mut().zip(slot) {
            *w = cell.load(Ordering::Relaxed);
        }
        Ok(Body::from_words(words))
    }

    /// Put body `index` into PE `pe`'s segment
    pub fn put(&self, pe: usize, index: usize, body: Body) -> Result<(), StoreError> {
        let slot = self.slot(pe, index)?;
        for (cell, w) in slot.iter().zip(body.to_words()) {
            cell.store(w, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Bulk get of a contiguous index range from one segment
    pub fn get_range(&self, pe: usize, range: Range<usize>, out: &mut [Body]) -> Result<(), StoreError> {
        if out.len() != range.len() {
            return Err(StoreError::BufferLength {
                expected: range.len(),
                actual: out.len(),
            });
        }
        for (dst, index) in out.iter_mut().zip(range) {
            *dst = self.get(pe, index)?;
        }
        Ok(())
    }
}
