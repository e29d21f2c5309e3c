use std::ops::Range;

use crate::error::ConfigError;

/// Contiguous block partitioning of `n` bodies over `npes` processing elements.
///
/// PE `p` owns `[floor(p*n/npes), floor((p+1)*n/npes))`. The ranges are
/// contiguous, disjoint and cover `[0, n)`. Block sizes differ by at most
/// one (5 bodies over 3 PEs gives 1, 2, 2). When `n < npes` some PEs own
/// nothing.
///
/// Every PE computes this independently; no communication is needed to agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    n: usize,
    npes: usize,
}

impl Partition {
    pub fn new(n: usize, npes: usize) -> Result<Self, ConfigError> {
        if npes == 0 {
            return Err(ConfigError::NoProcesses);
        }
        Ok(Self { n, npes })
    }

    pub fn body_count(&self) -> usize {
        self.n
    }

    pub fn npes(&self) -> usize {
        self.npes
    }

    fn boundary(&self, rank: usize) -> usize {
        // u128 keeps rank * n exact for any usize inputs
        ((rank as u128 * self.n as u128) / self.npes as u128) as usize
    }

    /// Index range owned by `rank`. Ranks past the end own an empty range.
    pub fn local_range(&self, rank: usize) -> Range<usize> {
        if rank >= self.npes {
            return self.n..self.n;
        }
        self.boundary(rank)..self.boundary(rank + 1)
    }

    /// Owning rank of `index`, the inverse of [`Partition::local_range`]
    pub fn owner(&self, index: usize) -> Option<usize> {
        if index >= self.n {
            return None;
        }
        let owner = ((index as u128 + 1) * self.npes as u128 - 1) / self.n as u128;
        Some(owner as usize)
    }

    pub fn local_len(&self, rank: usize) -> usize {
        self.local_range(rank).len()
    }

    /// All ranges in rank order
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.npes).map(|p| self.local_range(p))
    }
}
