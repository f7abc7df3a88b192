use thiserror::Error;

use crate::block::BlockId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("invalid memory interval [{mi}, {mf})")]
    InvalidInterval { mi: usize, mf: usize },

    #[error("not enough free memory to allocate {size} bytes ({free} free)")]
    NoFreeBlock { size: usize, free: usize },

    #[error(
        "external fragmentation: {size} bytes requested, {free} free but the largest region holds {largest}"
    )]
    Fragmentation {
        size: usize,
        free: usize,
        largest: usize,
    },

    #[error("block {id} not found")]
    BlockNotFound { id: BlockId },

    #[error("allocation size must be greater than zero")]
    InvalidSize,
}

impl MemoryError {
    /// The failed request was put in the pending queue and will be retried
    /// after a release.
    pub fn is_queued(&self) -> bool {
        matches!(
            self,
            MemoryError::NoFreeBlock { .. } | MemoryError::Fragmentation { .. }
        )
    }
}

pub type Result<T> = core::result::Result<T, MemoryError>;
