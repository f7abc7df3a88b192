use std::collections::VecDeque;

use crate::block::BlockId;

/// An allocation that failed and waits for a release.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: BlockId,
    pub size: usize,
}

impl PendingRequest {
    pub fn new(id: BlockId, size: usize) -> Self {
        PendingRequest { id, size }
    }
}

/// FIFO of pending requests.
#[derive(Debug, Default)]
pub struct PendingQueue {
    requests: VecDeque<PendingRequest>,
}

impl PendingQueue {
    pub fn new() -> Self {
        PendingQueue {
            requests: VecDeque::with_capacity(5),
        }
    }

    pub fn offer(&mut self, request: PendingRequest) {
        self.requests.push_back(request);
    }

    pub fn take_next(&mut self) -> Option<PendingRequest> {
        self.requests.pop_front()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingRequest> {
        self.requests.iter()
    }

    pub fn list_requests(&self) -> Vec<PendingRequest> {
        self.requests.iter().copied().collect()
    }
}
