use core::fmt;

use collections::Interval;

pub type BlockId = usize;

/// An allocated region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub start: usize,
    pub end: usize,
}

impl Block {
    pub fn new(id: BlockId, start: usize, end: usize) -> Self {
        debug_assert!(start < end, "block [{start}, {end}) is empty");
        Block { id, start, end }
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }
}

impl Interval for Block {
    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}

/// An unallocated region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FreeRegion {
    pub start: usize,
    pub end: usize,
}

impl FreeRegion {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start < end, "free region [{start}, {end}) is empty");
        FreeRegion { start, end }
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn fits(&self, size: usize) -> bool {
        self.size() >= size
    }
}

impl Interval for FreeRegion {
    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}

impl From<&Block> for FreeRegion {
    fn from(block: &Block) -> Self {
        FreeRegion::new(block.start, block.end)
    }
}

/// Either kind of region, as listed in a memory map.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Region {
    Allocated(Block),
    Free(FreeRegion),
}

impl Region {
    pub fn is_free(&self) -> bool {
        matches!(self, Region::Free(_))
    }
}

impl Interval for Region {
    fn start(&self) -> usize {
        match self {
            Region::Allocated(block) => block.start,
            Region::Free(region) => region.start,
        }
    }

    fn end(&self) -> usize {
        match self {
            Region::Allocated(block) => block.end,
            Region::Free(region) => region.end,
        }
    }
}

impl From<Block> for Region {
    fn from(block: Block) -> Self {
        Region::Allocated(block)
    }
}

impl From<FreeRegion> for Region {
    fn from(region: FreeRegion) -> Self {
        Region::Free(region)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = format!("{}-{}", self.start, self.end);
        write!(f, "{span:<9}    Block {}", self.id)
    }
}

impl fmt::Display for FreeRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = format!("{}-{}", self.start, self.end);
        write!(f, "{span:<9}    Free")
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Allocated(block) => fmt::Display::fmt(block, f),
            Region::Free(region) => fmt::Display::fmt(region, f),
        }
    }
}
