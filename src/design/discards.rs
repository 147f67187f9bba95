//! Shared discard pool.
//!
//! Designs that are no longer part of a population but may still be useful
//! (as clone partners whose responses can be reused, or as Pareto candidates
//! to reclaim) are parked here instead of being released. Algorithm
//! instances that solve the same problem share one pool through `Arc`.
//!
//! Access goes through [`DiscardPool::checkout`], which locks the pool and
//! hands out a [`DiscardCheckout`] guard. The guard dereferences to the
//! underlying [`DesignGroup`] and returns it to the pool when dropped, so
//! every checkout is paired with a check-in.

use super::group::DesignGroup;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A lock-protected group of discarded designs.
#[derive(Debug, Default)]
pub struct DiscardPool {
    designs: Mutex<DesignGroup>,
}

/// Exclusive access to a [`DiscardPool`]. Checked back in on drop.
#[derive(Debug)]
pub struct DiscardCheckout<'a> {
    guard: MutexGuard<'a, DesignGroup>,
}

impl DiscardPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the pool for exclusive use.
    pub fn checkout(&self) -> DiscardCheckout<'_> {
        DiscardCheckout {
            guard: self.designs.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn len(&self) -> usize {
        self.checkout().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases every pooled design.
    pub fn clear(&self) -> usize {
        self.checkout().take_all().len()
    }
}

impl Deref for DiscardCheckout<'_> {
    type Target = DesignGroup;

    fn deref(&self) -> &DesignGroup {
        &self.guard
    }
}

impl DerefMut for DiscardCheckout<'_> {
    fn deref_mut(&mut self) -> &mut DesignGroup {
        &mut self.guard
    }
}
