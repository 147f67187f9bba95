//! Candidate solutions and their collections.
//!
//! - [`Design`]: one candidate solution with identity and clone-ring state
//! - [`CloneRegistry`]: out-of-line storage for clone rings
//! - [`DesignGroup`] / [`DesignGroupVector`]: ordered collections and
//!   read-only views over several of them
//! - [`DiscardPool`]: shared, lock-protected pool of discarded designs
//! - [`FitnessRecord`]: per-generation fitness values with statistics
//! - [`BitManipulator`]: fixed-width binary encoding of variables

mod bits;
mod clones;
mod discards;
mod fitness;
mod group;
mod types;

pub use bits::{BitManipulator, MAX_BITS_PER_VARIABLE};
pub use clones::CloneRegistry;
pub use discards::{DiscardCheckout, DiscardPool};
pub use fitness::FitnessRecord;
pub use group::{lexical_cmp, DesignGroup, DesignGroupVector, GroupOrder};
pub use types::{Design, DesignAttributes, DesignId};
