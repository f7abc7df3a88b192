//! Simulated dynamic memory allocation over an abstract address range `[mi, mf)`.
//!
//! A [`MemoryManager`] hands out blocks from its free regions, coalesces
//! released space and keeps requests it could not satisfy in a FIFO of
//! pending requests, retried after every successful release.

pub mod block;
pub mod error;
pub mod instruction;
pub mod memory_manager;
pub mod pending_queue;
pub mod snapshot;

pub use block::{Block, BlockId, FreeRegion, Region};
pub use error::{MemoryError, Result};
pub use instruction::{Instruction, Outcome, Released};
pub use memory_manager::{FitPolicy, MemoryManager};
pub use pending_queue::{PendingQueue, PendingRequest};
pub use snapshot::Snapshot;
