use collections::{Interval, OrderedIntervalSet};
use log::{debug, trace};

use crate::block::{Block, BlockId, FreeRegion};
use crate::error::{MemoryError, Result};
use crate::instruction::{Instruction, Outcome, Released};
use crate::pending_queue::{PendingQueue, PendingRequest};
use crate::snapshot::Snapshot;

/// Which fitting free region an allocation is carved from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FitPolicy {
    /// The free list is scanned to the end and the last region large enough
    /// wins: the highest-addressed fitting region.
    #[default]
    LastFit,
    /// The scan stops at the lowest-addressed fitting region.
    FirstFit,
}

/// Allocator over the abstract address range `[mi, mf)`.
///
/// Every address in the range belongs to exactly one allocated block or one
/// free region. Free regions are kept coalesced, so no two of them touch.
/// Requests that cannot be satisfied wait in a FIFO and are retried after
/// each successful release.
#[derive(Debug)]
pub struct MemoryManager {
    mi: usize,
    mf: usize,
    allocated: OrderedIntervalSet<Block>,
    free: OrderedIntervalSet<FreeRegion>,
    free_bytes: usize,
    next_id: BlockId,
    pending: PendingQueue,
    policy: FitPolicy,
}

impl MemoryManager {
    pub fn new(mi: usize, mf: usize) -> Result<Self> {
        Self::with_policy(mi, mf, FitPolicy::default())
    }

    pub fn with_policy(mi: usize, mf: usize, policy: FitPolicy) -> Result<Self> {
        if mi >= mf {
            return Err(MemoryError::InvalidInterval { mi, mf });
        }

        let mut free = OrderedIntervalSet::new();
        free.insert(FreeRegion::new(mi, mf));
        debug!("memory [{mi}, {mf}) ready, {} bytes, {policy:?}", mf - mi);

        Ok(MemoryManager {
            mi,
            mf,
            allocated: OrderedIntervalSet::new(),
            free,
            free_bytes: mf - mi,
            next_id: 1,
            pending: PendingQueue::new(),
            policy,
        })
    }

    /// Allocates `size` bytes under a fresh id.
    ///
    /// On `NoFreeBlock` or `Fragmentation` the request stays in the pending
    /// queue under the id it was given and is retried after later releases.
    pub fn allocate(&mut self, size: usize) -> Result<Block> {
        self.allocate_as(size, None)
    }

    /// Allocates `size` bytes, reusing `preset_id` when given. Only pending
    /// retries pass an id, so a granted request keeps its identity.
    pub fn allocate_as(&mut self, size: usize, preset_id: Option<BlockId>) -> Result<Block> {
        if size == 0 {
            return Err(MemoryError::InvalidSize);
        }

        let id = match preset_id {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };

        let Some(region) = self.select_region(size) else {
            self.pending.offer(PendingRequest::new(id, size));
            let error = if self.free_bytes >= size {
                MemoryError::Fragmentation {
                    size,
                    free: self.free_bytes,
                    largest: self.largest_free(),
                }
            } else {
                MemoryError::NoFreeBlock {
                    size,
                    free: self.free_bytes,
                }
            };
            debug!("request {id} for {size} bytes queued: {error}");
            return Err(error);
        };

        self.free.remove(region.start);
        let block = Block::new(id, region.start, region.start + size);
        if block.end < region.end {
            self.free.insert(FreeRegion::new(block.end, region.end));
        }
        self.allocated.insert(block);
        self.recount_free_bytes();

        debug!(
            "block {id} allocated at [{}, {}), {} bytes free",
            block.start, block.end, self.free_bytes
        );
        Ok(block)
    }

    fn select_region(&self, size: usize) -> Option<FreeRegion> {
        let mut candidate = None;
        for region in self.free.iter() {
            if !region.fits(size) {
                continue;
            }
            trace!("[{}, {}) fits {size} bytes", region.start, region.end);
            candidate = Some(*region);
            if self.policy == FitPolicy::FirstFit {
                break;
            }
        }
        candidate
    }

    /// Frees the block with this id, coalesces free space and retries the
    /// pending requests.
    pub fn release(&mut self, id: BlockId) -> Result<Released> {
        let block = self
            .allocated
            .remove_first(|block| block.id == id)
            .ok_or(MemoryError::BlockNotFound { id })?;

        self.free.insert(FreeRegion::from(&block));
        debug!("block {id} released, [{}, {}) is free", block.start, block.end);

        self.coalesce();
        let granted = self.drain_pending();

        Ok(Released { block, granted })
    }

    /// Merges touching or overlapping free regions into maximal ones.
    pub fn coalesce(&mut self) {
        let before = self.free.len();
        let mut merged: Vec<FreeRegion> = Vec::with_capacity(before);

        for region in self.free.drain() {
            match merged.last_mut() {
                Some(current) if current.touches(&region) => {
                    current.end = current.end.max(region.end);
                }
                _ => merged.push(region),
            }
        }

        self.free = OrderedIntervalSet::from_sorted(merged);
        self.recount_free_bytes();

        if self.free.len() != before {
            debug!("coalesced {before} free regions into {}", self.free.len());
        }
    }

    /// Retries every request pending at the time of the call, once each, in
    /// FIFO order. Requests that still fail go back to the end of the queue.
    /// Returns the blocks granted.
    pub fn drain_pending(&mut self) -> Vec<Block> {
        let attempts = self.pending.len();
        let mut granted = Vec::new();

        for _ in 0..attempts {
            let Some(request) = self.pending.take_next() else {
                break;
            };
            match self.allocate_as(request.size, Some(request.id)) {
                Ok(block) => {
                    debug!("pending request {} granted", request.id);
                    granted.push(block);
                }
                Err(error) => debug!("pending request {} still waiting: {error}", request.id),
            }
        }

        granted
    }

    pub fn execute(&mut self, instruction: Instruction) -> Result<Outcome> {
        match instruction {
            Instruction::Allocate(size) => self.allocate(size).map(Outcome::Allocated),
            Instruction::Release(id) => self.release(id).map(Outcome::Released),
        }
    }

    fn recount_free_bytes(&mut self) {
        self.free_bytes = self.free.total_len();
    }

    pub fn mi(&self) -> usize {
        self.mi
    }

    pub fn mf(&self) -> usize {
        self.mf
    }

    pub fn capacity(&self) -> usize {
        self.mf - self.mi
    }

    pub fn free_bytes(&self) -> usize {
        self.free_bytes
    }

    pub fn largest_free(&self) -> usize {
        self.free.iter().map(Interval::len).max().unwrap_or(0)
    }

    pub fn allocated(&self) -> &OrderedIntervalSet<Block> {
        &self.allocated
    }

    pub fn free_regions(&self) -> &OrderedIntervalSet<FreeRegion> {
        &self.free
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    pub fn find_block(&self, id: BlockId) -> Option<&Block> {
        self.allocated.iter().find(|block| block.id == id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.mi,
            self.mf,
            &self.allocated,
            &self.free,
            self.pending.list_requests(),
            self.free_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn free_spans(manager: &MemoryManager) -> Vec<(usize, usize)> {
        manager
            .free_regions()
            .iter()
            .map(|region| (region.start, region.end))
            .collect()
    }

    fn pending(manager: &MemoryManager) -> Vec<(BlockId, usize)> {
        manager
            .pending()
            .iter()
            .map(|request| (request.id, request.size))
            .collect()
    }

    fn assert_consistent(manager: &MemoryManager) {
        let snapshot = manager.snapshot();
        let mut cursor = manager.mi();
        for region in snapshot.regions.iter() {
            assert_eq!(region.start(), cursor, "gap or overlap at {cursor}");
            assert!(region.start() < region.end());
            cursor = region.end();
        }
        assert_eq!(cursor, manager.mf());

        for pair in manager.free_regions().iter().collect::<Vec<_>>().windows(2) {
            assert!(!pair[0].touches(pair[1]), "free regions touch");
        }

        for pair in manager.allocated().iter().collect::<Vec<_>>().windows(2) {
            assert!(!pair[0].overlaps(pair[1]), "allocated blocks overlap");
        }

        let allocated: usize = manager.allocated().iter().map(Block::size).sum();
        assert_eq!(manager.free_bytes(), manager.capacity() - allocated);

        let mut ids: Vec<_> = manager.allocated().iter().map(|block| block.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), manager.allocated().len(), "duplicate block ids");
    }

    #[test]
    fn new_manager_has_one_free_region_covering_everything() {
        let manager = MemoryManager::new(0, 1000).unwrap();

        assert_eq!(free_spans(&manager), vec![(0, 1000)]);
        assert_eq!(manager.free_bytes(), 1000);
        assert!(manager.allocated().is_empty());
        assert!(manager.pending().is_empty());
    }

    #[rstest]
    #[case(10, 10)]
    #[case(11, 10)]
    fn empty_or_inverted_interval_is_rejected(#[case] mi: usize, #[case] mf: usize) {
        let result = MemoryManager::new(mi, mf);
        assert_eq!(result.unwrap_err(), MemoryError::InvalidInterval { mi, mf });
    }

    #[test]
    fn allocations_take_sequential_ids_from_the_start_of_a_single_region() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();

        let first = manager.allocate(100).unwrap();
        let second = manager.allocate(200).unwrap();

        assert_eq!(first, Block::new(1, 0, 100));
        assert_eq!(second, Block::new(2, 100, 300));
        assert_eq!(free_spans(&manager), vec![(300, 1000)]);
        assert_eq!(manager.free_bytes(), 700);
    }

    #[test]
    fn allocation_of_the_whole_region_leaves_no_free_region() {
        let mut manager = MemoryManager::new(50, 150).unwrap();

        let block = manager.allocate(100).unwrap();

        assert_eq!(block, Block::new(1, 50, 150));
        assert!(manager.free_regions().is_empty());
        assert_eq!(manager.free_bytes(), 0);
    }

    #[test]
    fn zero_sized_allocation_is_rejected_without_side_effects() {
        let mut manager = MemoryManager::new(0, 100).unwrap();

        assert_eq!(manager.allocate(0), Err(MemoryError::InvalidSize));
        assert!(manager.pending().is_empty());
        assert_eq!(manager.allocate(10).unwrap().id, 1);
    }

    #[test]
    fn oversized_request_is_queued_as_no_free_block() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(200).unwrap();

        let error = manager.allocate(2000).unwrap_err();

        assert_eq!(error, MemoryError::NoFreeBlock { size: 2000, free: 700 });
        assert_eq!(pending(&manager), vec![(3, 2000)]);
        assert_eq!(manager.allocate(10).unwrap().id, 4);
    }

    #[test]
    fn scattered_free_space_is_reported_as_fragmentation() {
        let mut manager = MemoryManager::new(0, 300).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(100).unwrap();
        manager.release(1).unwrap();
        manager.release(3).unwrap();

        let error = manager.allocate(150).unwrap_err();

        assert_eq!(
            error,
            MemoryError::Fragmentation {
                size: 150,
                free: 200,
                largest: 100
            }
        );
        assert_eq!(pending(&manager), vec![(4, 150)]);
    }

    #[rstest]
    #[case(FitPolicy::LastFit, Block::new(4, 300, 350))]
    #[case(FitPolicy::FirstFit, Block::new(4, 0, 50))]
    fn policy_decides_which_fitting_region_is_used(
        #[case] policy: FitPolicy,
        #[case] expected: Block,
    ) {
        let mut manager = MemoryManager::with_policy(0, 1000, policy).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(100).unwrap();
        manager.release(1).unwrap();

        let block = manager.allocate(50).unwrap();

        assert_eq!(block, expected);
        assert_consistent(&manager);
    }

    #[test]
    fn last_fit_skips_later_regions_that_are_too_small() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();
        manager.allocate(400).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(450).unwrap();
        manager.release(1).unwrap();

        let block = manager.allocate(300).unwrap();

        assert_eq!(free_spans(&manager), vec![(300, 400), (950, 1000)]);
        assert_eq!(block, Block::new(4, 0, 300));
    }

    #[test]
    fn release_unknown_id_reports_block_not_found() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();
        manager.allocate(100).unwrap();

        let error = manager.release(42).unwrap_err();

        assert_eq!(error, MemoryError::BlockNotFound { id: 42 });
        assert_eq!(manager.allocated().len(), 1);
        assert_eq!(free_spans(&manager), vec![(100, 1000)]);
    }

    #[test]
    fn release_of_a_pending_id_reports_block_not_found() {
        let mut manager = MemoryManager::new(0, 100).unwrap();
        manager.allocate(500).unwrap_err();

        assert_eq!(
            manager.release(1).unwrap_err(),
            MemoryError::BlockNotFound { id: 1 }
        );
        assert_eq!(pending(&manager), vec![(1, 500)]);
    }

    #[test]
    fn released_block_merges_with_both_neighbours() {
        let mut manager = MemoryManager::new(0, 300).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(50).unwrap();
        manager.release(1).unwrap();
        assert_eq!(free_spans(&manager), vec![(0, 100), (250, 300)]);

        let released = manager.release(2).unwrap();

        assert_eq!(released.block, Block::new(2, 100, 200));
        assert!(released.granted.is_empty());
        assert_eq!(free_spans(&manager), vec![(0, 200), (250, 300)]);
        manager.release(3).unwrap();
        assert_eq!(free_spans(&manager), vec![(0, 300)]);
        assert_eq!(manager.free_bytes(), 300);
    }

    #[test]
    fn document_scenario_keeps_oversized_request_pending() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();

        assert_eq!(manager.allocate(100).unwrap(), Block::new(1, 0, 100));
        assert_eq!(free_spans(&manager), vec![(100, 1000)]);

        assert_eq!(manager.allocate(200).unwrap(), Block::new(2, 100, 300));
        assert_eq!(free_spans(&manager), vec![(300, 1000)]);

        assert_eq!(
            manager.allocate(2000).unwrap_err(),
            MemoryError::NoFreeBlock { size: 2000, free: 700 }
        );
        assert_eq!(pending(&manager), vec![(3, 2000)]);

        let released = manager.release(1).unwrap();
        assert!(released.granted.is_empty());
        assert_eq!(free_spans(&manager), vec![(0, 100), (300, 1000)]);
        assert_eq!(manager.free_bytes(), 800);
        assert_eq!(pending(&manager), vec![(3, 2000)]);

        let released = manager.release(2).unwrap();
        assert!(released.granted.is_empty());
        assert_eq!(free_spans(&manager), vec![(0, 1000)]);
        assert_eq!(manager.free_bytes(), 1000);
        assert_eq!(pending(&manager), vec![(3, 2000)]);
    }

    #[test]
    fn pending_request_is_granted_with_its_original_id() {
        let mut manager = MemoryManager::new(0, 300).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(100).unwrap();
        manager.release(1).unwrap();
        manager.release(3).unwrap();
        manager.allocate(150).unwrap_err();

        let released = manager.release(2).unwrap();

        assert_eq!(released.granted, vec![Block::new(4, 0, 150)]);
        assert!(manager.pending().is_empty());
        assert_eq!(manager.find_block(4), Some(&Block::new(4, 0, 150)));
        assert_eq!(free_spans(&manager), vec![(150, 300)]);
        assert_consistent(&manager);
    }

    #[test]
    fn drain_grants_what_fits_and_requeues_the_rest_in_order() {
        let mut manager = MemoryManager::new(0, 100).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(500).unwrap_err();
        manager.allocate(40).unwrap_err();
        manager.allocate(600).unwrap_err();
        manager.allocate(50).unwrap_err();

        let released = manager.release(1).unwrap();

        assert_eq!(
            released.granted,
            vec![Block::new(3, 0, 40), Block::new(5, 40, 90)]
        );
        assert_eq!(pending(&manager), vec![(2, 500), (4, 600)]);
        assert_eq!(free_spans(&manager), vec![(90, 100)]);
    }

    #[test]
    fn drain_with_nothing_satisfiable_keeps_queue_unchanged() {
        let mut manager = MemoryManager::new(0, 100).unwrap();
        manager.allocate(500).unwrap_err();
        manager.allocate(700).unwrap_err();

        let granted = manager.drain_pending();

        assert!(granted.is_empty());
        assert_eq!(pending(&manager), vec![(1, 500), (2, 700)]);
    }

    #[test]
    fn coalesce_twice_is_the_same_as_once() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();
        for _ in 0..5 {
            manager.allocate(100).unwrap();
        }
        manager.release(2).unwrap();
        manager.release(4).unwrap();

        manager.coalesce();
        let once = free_spans(&manager);
        manager.coalesce();

        assert_eq!(free_spans(&manager), once);
        assert_eq!(once, vec![(100, 200), (300, 400), (500, 1000)]);
    }

    #[test]
    fn releasing_every_other_block_then_the_rest_leaves_one_region() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();
        for _ in 0..10 {
            manager.allocate(100).unwrap();
        }

        for id in (1..=9).step_by(2) {
            manager.release(id).unwrap();
        }
        assert_eq!(manager.free_regions().len(), 5);
        assert_consistent(&manager);

        for id in (2..=10).step_by(2) {
            manager.release(id).unwrap();
            assert_consistent(&manager);
        }
        assert_eq!(free_spans(&manager), vec![(0, 1000)]);
    }

    #[test]
    fn execute_dispatches_instructions() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();

        let allocated = manager.execute(Instruction::Allocate(10)).unwrap();
        let released = manager.execute(Instruction::Release(1)).unwrap();

        assert_eq!(allocated, Outcome::Allocated(Block::new(1, 0, 10)));
        assert_eq!(
            released,
            Outcome::Released(Released {
                block: Block::new(1, 0, 10),
                granted: Vec::new()
            })
        );
        assert_eq!(
            manager.execute(Instruction::Release(1)),
            Err(MemoryError::BlockNotFound { id: 1 })
        );
    }

    #[test]
    fn snapshot_lists_regions_pending_requests_and_free_bytes() {
        let mut manager = MemoryManager::new(0, 1000).unwrap();
        manager.allocate(100).unwrap();
        manager.allocate(5000).unwrap_err();

        let snapshot = manager.snapshot();

        assert_eq!(snapshot.regions.len(), 2);
        assert_eq!(snapshot.pending, vec![PendingRequest::new(2, 5000)]);
        assert_eq!(snapshot.free_bytes, 900);
        assert_eq!(snapshot.largest_free(), 900);
    }

    fn instructions() -> impl Strategy<Value = Vec<Instruction>> {
        prop::collection::vec(
            prop_oneof![
                (1usize..400).prop_map(Instruction::Allocate),
                (1usize..24).prop_map(Instruction::Release),
            ],
            0..80,
        )
    }

    fn policies() -> impl Strategy<Value = FitPolicy> {
        prop_oneof![Just(FitPolicy::LastFit), Just(FitPolicy::FirstFit)]
    }

    proptest! {
        #[test]
        fn prop_every_state_is_consistent(
            mi in 0usize..100,
            span in 1usize..1500,
            policy in policies(),
            program in instructions(),
        ) {
            let mut manager = MemoryManager::with_policy(mi, mi + span, policy).unwrap();
            for instruction in program {
                let _ = manager.execute(instruction);
                assert_consistent(&manager);
            }
        }

        #[test]
        fn prop_coalesce_is_idempotent(span in 1usize..1500, program in instructions()) {
            let mut manager = MemoryManager::new(0, span).unwrap();
            for instruction in program {
                let _ = manager.execute(instruction);
            }

            manager.coalesce();
            let once = free_spans(&manager);
            manager.coalesce();

            prop_assert_eq!(free_spans(&manager), once);
        }

        #[test]
        fn prop_allocate_then_release_restores_free_space(
            span in 1usize..1500,
            program in instructions(),
            size in 1usize..400,
        ) {
            let mut manager = MemoryManager::new(0, span).unwrap();
            for instruction in program {
                let _ = manager.execute(instruction);
            }
            let before = free_spans(&manager);
            let nothing_pending = manager.pending().is_empty();

            if let Ok(block) = manager.allocate(size) {
                let released = manager.release(block.id).unwrap();
                if nothing_pending {
                    prop_assert!(released.granted.is_empty());
                    prop_assert_eq!(free_spans(&manager), before);
                }
            }
        }

        #[test]
        fn prop_queued_requests_never_hold_blocks(span in 1usize..1500, program in instructions()) {
            let mut manager = MemoryManager::new(0, span).unwrap();
            for instruction in program {
                if let Err(error) = manager.execute(instruction) {
                    if let Instruction::Allocate(size) = instruction {
                        prop_assert!(error.is_queued());
                        prop_assert!(size > manager.largest_free());
                    }
                }
                for request in manager.pending().iter() {
                    prop_assert!(manager.find_block(request.id).is_none());
                }
            }
        }
    }
}
