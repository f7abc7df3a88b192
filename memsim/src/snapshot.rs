use collections::{Interval, OrderedIntervalSet};

use crate::block::{Block, FreeRegion, Region};
use crate::pending_queue::PendingRequest;

/// A read-only picture of a memory manager, taken for reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub mi: usize,
    pub mf: usize,
    /// Allocated and free regions merged in ascending order.
    pub regions: OrderedIntervalSet<Region>,
    pub pending: Vec<PendingRequest>,
    pub free_bytes: usize,
}

impl Snapshot {
    pub fn new(
        mi: usize,
        mf: usize,
        allocated: &OrderedIntervalSet<Block>,
        free: &OrderedIntervalSet<FreeRegion>,
        pending: Vec<PendingRequest>,
        free_bytes: usize,
    ) -> Self {
        Snapshot {
            mi,
            mf,
            regions: allocated.concat(free),
            pending,
            free_bytes,
        }
    }

    pub fn allocated_bytes(&self) -> usize {
        (self.mf - self.mi) - self.free_bytes
    }

    pub fn largest_free(&self) -> usize {
        self.regions
            .iter()
            .filter(|region| region.is_free())
            .map(Interval::len)
            .max()
            .unwrap_or(0)
    }

    pub fn free_region_count(&self) -> usize {
        self.regions.iter().filter(|region| region.is_free()).count()
    }

    /// Share of free memory outside the largest free region, from 0.0
    /// (one contiguous free region) towards 1.0.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free() as f64 / self.free_bytes as f64
    }
}
