//! Id minting for feeds and posts.

use std::sync::atomic::{AtomicU64, Ordering};

/// Produces a fresh identifier on every call. Values are never reused.
pub trait IdGenerator {
    fn next_id(&self) -> u64;
}

/// Monotonic counter starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
