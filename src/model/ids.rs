//! Deterministic id allocation for synthetic nodes and edges.

use std::marker::PhantomData;

/// Hands out `max + 1, max + 2, …` in call order.
///
/// One allocator is created per nodeset run and threaded through every stage
/// that creates nodes (or edges), so numbering depends only on creation order.
#[derive(Debug, Clone)]
pub struct IdAllocator<T> {
    next: u64,
    _marker: PhantomData<T>,
}

impl<T: From<u64>> IdAllocator<T> {
    /// Start right after `max`; `None` starts at 1.
    pub fn after(max: Option<u64>) -> Self {
        Self {
            next: max.map_or(1, |m| m + 1),
            _marker: PhantomData,
        }
    }

    pub fn allocate(&mut self) -> T {
        let id = self.next;
        self.next += 1;
        T::from(id)
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}
