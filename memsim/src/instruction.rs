use core::fmt;

use crate::block::{Block, BlockId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Allocate(usize),
    Release(BlockId),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Allocate(size) => write!(f, "S {size}"),
            Instruction::Release(id) => write!(f, "L {id}"),
        }
    }
}

/// Result of a successful release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Released {
    pub block: Block,
    /// Pending requests granted by the drain that followed the release.
    pub granted: Vec<Block>,
}

/// What a successful instruction did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Allocated(Block),
    Released(Released),
}
