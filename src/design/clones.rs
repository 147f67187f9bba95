//! Clone ring bookkeeping.
//!
//! Every live design that is an exact duplicate (same variable
//! representation) of another live design belongs to a *clone ring*: a
//! circular, doubly linked chain of design ids. Rings never own designs;
//! they are stored out-of-line in a [`CloneRegistry`] keyed by
//! [`DesignId`], so designs can move freely between groups while their ring
//! membership stays intact.
//!
//! Singletons (designs with no clones) have no entry at all.
//!
//! # Complexity
//!
//! - [`merge`](CloneRegistry::merge): O(ring size) to detect that both ids
//!   already share a ring, O(1) splice otherwise
//! - [`detach`](CloneRegistry::detach): O(1)
//! - [`count_clones`](CloneRegistry::count_clones): O(ring size)

use super::types::DesignId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Links {
    prev: DesignId,
    next: DesignId,
}

/// Out-of-line storage for clone rings.
#[derive(Debug, Default)]
pub struct CloneRegistry {
    links: HashMap<DesignId, Links>,
}

impl CloneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the rings of `a` and `b`.
    ///
    /// Returns how many designs were newly linked:
    ///
    /// - `0` if `a` and `b` already share a ring
    /// - `2` if both were singletons and now form a ring of two
    /// - `1` if exactly one of them was a singleton and joined the other's ring
    /// - the size of `b`'s former ring when two multi-member rings are merged
    ///
    /// # Panics
    /// Panics if `a == b`; a design cannot be its own clone.
    pub fn merge(&mut self, a: DesignId, b: DesignId) -> usize {
        assert_ne!(a, b, "a design cannot be tagged as a clone of itself");

        let a_linked = self.links.contains_key(&a);
        let b_linked = self.links.contains_key(&b);

        match (a_linked, b_linked) {
            (false, false) => {
                self.links.insert(a, Links { prev: b, next: b });
                self.links.insert(b, Links { prev: a, next: a });
                2
            }
            (true, false) => {
                self.insert_after(a, b);
                1
            }
            (false, true) => {
                self.insert_after(b, a);
                1
            }
            (true, true) => {
                if self.are_linked(a, b) {
                    return 0;
                }
                let absorbed = self.ring_size(b);
                // Splice: a -> b_next ... b -> a_next
                let a_next = self.links[&a].next;
                let b_next = self.links[&b].next;
                self.set_next(a, b_next);
                self.set_prev(b_next, a);
                self.set_next(b, a_next);
                self.set_prev(a_next, b);
                absorbed
            }
        }
    }

    /// Removes `id` from its ring, closing the gap.
    ///
    /// Returns `false` if `id` was a singleton. A ring of two collapses into
    /// two singletons.
    pub fn detach(&mut self, id: DesignId) -> bool {
        let Some(links) = self.links.remove(&id) else {
            return false;
        };
        if links.prev == links.next {
            // Ring of two: the partner becomes a singleton.
            self.links.remove(&links.next);
        } else {
            self.set_next(links.prev, links.next);
            self.set_prev(links.next, links.prev);
        }
        true
    }

    /// Number of other designs sharing `id`'s ring (ring size - 1).
    pub fn count_clones(&self, id: DesignId) -> usize {
        self.ring_size(id) - 1
    }

    /// Whether `id` has at least one clone.
    pub fn is_cloned(&self, id: DesignId) -> bool {
        self.links.contains_key(&id)
    }

    /// Whether `a` and `b` share a ring.
    pub fn are_linked(&self, a: DesignId, b: DesignId) -> bool {
        if a == b {
            return true;
        }
        if !self.links.contains_key(&a) || !self.links.contains_key(&b) {
            return false;
        }
        self.walk(a).any(|id| id == b)
    }

    /// Next design in `id`'s ring.
    pub fn next(&self, id: DesignId) -> Option<DesignId> {
        self.links.get(&id).map(|l| l.next)
    }

    /// Previous design in `id`'s ring.
    pub fn prev(&self, id: DesignId) -> Option<DesignId> {
        self.links.get(&id).map(|l| l.prev)
    }

    /// All members of `id`'s ring, starting at `id`.
    pub fn ring_members(&self, id: DesignId) -> Vec<DesignId> {
        if !self.links.contains_key(&id) {
            return vec![id];
        }
        std::iter::once(id).chain(self.walk(id)).collect()
    }

    /// Number of designs currently linked into some ring.
    pub fn linked_count(&self) -> usize {
        self.links.len()
    }

    fn ring_size(&self, id: DesignId) -> usize {
        if !self.links.contains_key(&id) {
            return 1;
        }
        1 + self.walk(id).count()
    }

    /// Iterates the ring forward from `start`, excluding `start` itself.
    fn walk(&self, start: DesignId) -> impl Iterator<Item = DesignId> + '_ {
        let mut cursor = self.links.get(&start).map(|l| l.next);
        std::iter::from_fn(move || {
            let current = cursor?;
            if current == start {
                return None;
            }
            cursor = self.links.get(&current).map(|l| l.next);
            Some(current)
        })
    }

    /// Links singleton `id` into the ring right after `anchor`.
    fn insert_after(&mut self, anchor: DesignId, id: DesignId) {
        let anchor_next = self.links[&anchor].next;
        self.links.insert(
            id,
            Links {
                prev: anchor,
                next: anchor_next,
            },
        );
        self.set_next(anchor, id);
        self.set_prev(anchor_next, id);
    }

    fn set_next(&mut self, id: DesignId, next: DesignId) {
        if let Some(l) = self.links.get_mut(&id) {
            l.next = next;
        }
    }

    fn set_prev(&mut self, id: DesignId, prev: DesignId) {
        if let Some(l) = self.links.get_mut(&id) {
            l.prev = prev;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Checks symmetry of the links and that every member reaches every other.
    fn assert_ring_consistent(reg: &CloneRegistry, ids: &[DesignId]) {
        for &id in ids {
            if let Some(next) = reg.next(id) {
                assert_eq!(reg.prev(next), Some(id), "next/prev asymmetry at {id}");
            }
            if let Some(prev) = reg.prev(id) {
                assert_eq!(reg.next(prev), Some(id), "prev/next asymmetry at {id}");
            }
            let members = reg.ring_members(id);
            assert_eq!(reg.count_clones(id), members.len() - 1);
            for &m in &members {
                assert!(reg.are_linked(m, id));
                assert_eq!(reg.ring_members(m).len(), members.len());
            }
        }
    }

    // ---- merge ----

    #[test]
    fn test_merge_two_singletons() {
        let mut reg = CloneRegistry::new();
        assert_eq!(reg.merge(1, 2), 2);
        assert_eq!(reg.count_clones(1), 1);
        assert_eq!(reg.next(1), Some(2));
        assert_eq!(reg.prev(1), Some(2));
        assert_ring_consistent(&reg, &[1, 2]);
    }

    #[test]
    fn test_merge_singleton_into_ring() {
        let mut reg = CloneRegistry::new();
        reg.merge(1, 2);
        assert_eq!(reg.merge(3, 1), 1);
        assert_eq!(reg.count_clones(2), 2);
        assert_ring_consistent(&reg, &[1, 2, 3]);
    }

    #[test]
    fn test_merge_already_linked() {
        let mut reg = CloneRegistry::new();
        reg.merge(1, 2);
        reg.merge(2, 3);
        assert_eq!(reg.merge(1, 3), 0);
        assert_eq!(reg.count_clones(1), 2);
    }

    #[test]
    fn test_merge_two_rings() {
        let mut reg = CloneRegistry::new();
        reg.merge(1, 2);
        reg.merge(3, 4);
        reg.merge(4, 5);
        assert_eq!(reg.merge(1, 4), 3);
        assert_eq!(reg.count_clones(5), 4);
        assert_ring_consistent(&reg, &[1, 2, 3, 4, 5]);
    }

    #[test]
    #[should_panic(expected = "cannot be tagged as a clone of itself")]
    fn test_merge_self_panics() {
        CloneRegistry::new().merge(7, 7);
    }

    // ---- detach ----

    #[test]
    fn test_detach_from_pair() {
        let mut reg = CloneRegistry::new();
        reg.merge(1, 2);
        assert!(reg.detach(1));
        assert!(!reg.is_cloned(1));
        assert!(!reg.is_cloned(2));
        assert_eq!(reg.linked_count(), 0);
    }

    #[test]
    fn test_detach_middle() {
        let mut reg = CloneRegistry::new();
        reg.merge(1, 2);
        reg.merge(1, 3);
        reg.merge(1, 4);
        assert!(reg.detach(3));
        assert_eq!(reg.count_clones(1), 2);
        assert!(!reg.are_linked(1, 3));
        assert_ring_consistent(&reg, &[1, 2, 4]);
    }

    #[test]
    fn test_detach_singleton() {
        let mut reg = CloneRegistry::new();
        assert!(!reg.detach(9));
        assert_eq!(reg.count_clones(9), 0);
        assert_eq!(reg.ring_members(9), vec![9]);
    }

    // ---- invariants under random operation sequences ----

    #[derive(Debug, Clone)]
    enum Op {
        Merge(u64, u64),
        Detach(u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..12, 1u64..12)
                .prop_filter("distinct ids", |(a, b)| a != b)
                .prop_map(|(a, b)| Op::Merge(a, b)),
            (1u64..12).prop_map(Op::Detach),
        ]
    }

    proptest! {
        #[test]
        fn prop_rings_stay_consistent(ops in proptest::collection::vec(op_strategy(), 1..60)) {
            let mut reg = CloneRegistry::new();
            // Reference model: each id maps to a set label.
            let mut group: HashMap<u64, u64> = (1..12).map(|i| (i, i)).collect();
            let mut next_label = 100;

            for op in ops {
                match op {
                    Op::Merge(a, b) => {
                        let (ga, gb) = (group[&a], group[&b]);
                        let added = reg.merge(a, b);
                        if ga == gb {
                            prop_assert_eq!(added, 0);
                        } else {
                            prop_assert!(added >= 1);
                            for v in group.values_mut() {
                                if *v == gb {
                                    *v = ga;
                                }
                            }
                        }
                    }
                    Op::Detach(a) => {
                        reg.detach(a);
                        group.insert(a, next_label);
                        next_label += 1;
                    }
                }
            }

            let ids: Vec<u64> = (1..12).collect();
            assert_ring_consistent(&reg, &ids);
            for &a in &ids {
                let expected = ids.iter().filter(|&&b| group[&b] == group[&a]).count();
                prop_assert_eq!(reg.count_clones(a), expected - 1);
            }
        }
    }
}
