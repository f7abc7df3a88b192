use log::debug;
use memsim::{BlockId, Instruction};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_ALLOC_RATIO: f64 = 0.5;

/// Endless stream of random instructions over a memory of `capacity` bytes.
///
/// Ids are predicted the way the memory manager hands them out, sequentially
/// from 1 for every allocation, so releases name ids that were issued.
/// Whether those blocks were granted or are still pending is not tracked.
pub struct RandomInstructions {
    rng: StdRng,
    max_size: usize,
    alloc_ratio: f64,
    next_id: BlockId,
    issued: Vec<BlockId>,
}

impl RandomInstructions {
    pub fn new(capacity: usize, seed: u64) -> Self {
        debug!("random instructions seeded with {seed}");
        RandomInstructions {
            rng: StdRng::seed_from_u64(seed),
            max_size: (capacity / 4).max(1),
            alloc_ratio: DEFAULT_ALLOC_RATIO,
            next_id: 1,
            issued: Vec::new(),
        }
    }

    pub fn from_entropy(capacity: usize) -> Self {
        Self::new(capacity, rand::thread_rng().r#gen())
    }

    /// Probability of an allocation on each step, clamped to `[0, 1]`.
    /// A non-finite ratio keeps the default.
    pub fn with_alloc_ratio(mut self, ratio: f64) -> Self {
        self.alloc_ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            DEFAULT_ALLOC_RATIO
        };
        self
    }

    fn allocate(&mut self) -> Instruction {
        let size = self.rng.gen_range(1..=self.max_size);
        self.issued.push(self.next_id);
        self.next_id += 1;
        Instruction::Allocate(size)
    }

    fn release(&mut self) -> Instruction {
        let index = self.rng.gen_range(0..self.issued.len());
        Instruction::Release(self.issued.swap_remove(index))
    }
}

impl Iterator for RandomInstructions {
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        if self.issued.is_empty() || self.rng.gen_bool(self.alloc_ratio) {
            Some(self.allocate())
        } else {
            Some(self.release())
        }
    }
}
