//! Shared security primitives for contract modules
//!
//! A reentrancy guard for the factory's multi-step request flow and a
//! replay set for settled order ids.

use std::collections::HashSet;

/// Reentrancy guard preventing nested calls into protected functions.
///
/// A contract function acquires the guard before executing state-changing
/// logic and releases it on completion. Any nested call attempt fails.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    /// Create a new unlocked guard.
    pub fn new() -> Self {
        Self { locked: false }
    }

    /// Acquire the guard. Returns `false` if already locked.
    pub fn acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    /// Release the guard.
    pub fn release(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Set of order ids that have already been settled.
///
/// An id can be marked exactly once.
#[derive(Debug, Clone, Default)]
pub struct FilledOrders {
    filled: HashSet<Vec<u8>>,
}

impl FilledOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_filled(&self, uid: &[u8]) -> bool {
        self.filled.contains(uid)
    }

    /// Mark an id as filled. Returns `false` if it already was (replay).
    pub fn mark_filled(&mut self, uid: Vec<u8>) -> bool {
        self.filled.insert(uid)
    }

    pub fn count(&self) -> usize {
        self.filled.len()
    }
}
