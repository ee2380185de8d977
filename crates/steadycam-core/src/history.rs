use std::collections::VecDeque;

use crate::transform::Transform;

/// Bounded FIFO of accepted inter-frame transforms, oldest first.
#[derive(Clone, Debug)]
pub struct TransformHistory {
    entries: VecDeque<Transform>,
    capacity: usize,
}

impl TransformHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the bound, evicting the oldest entries if it shrank.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn push(&mut self, transform: Transform) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(transform);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&Transform> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Contiguous view, oldest first.
    pub fn as_slice(&mut self) -> &[Transform] {
        self.entries.make_contiguous()
    }

    pub fn to_vec(&self) -> Vec<Transform> {
        self.entries.iter().copied().collect()
    }
}
