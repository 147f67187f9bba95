//! Design collections.
//!
//! A [`DesignGroup`] owns an ordered collection of designs: a population,
//! an offspring set, or a discard pool. Inserting a design into a group
//! moves it there; moving it elsewhere removes it. A design therefore lives
//! in exactly one group at a time.
//!
//! Groups keep insertion order. Sorted views by variables or by objectives
//! ([`sorted_indices`](DesignGroup::sorted_indices)) are computed on demand
//! and drive the O(n log n) clone tests.
//!
//! A [`DesignGroupVector`] is a read-only list of group references for
//! operators that consider several pools together.

use super::types::{Design, DesignId};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Sort key for a sorted view of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrder {
    /// Lexicographic by variable representations.
    ByVariables,
    /// Lexicographic by raw objective values.
    ByObjectives,
}

/// Lexicographic total order on value slices.
pub fn lexical_cmp(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.total_cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// An owned, ordered collection of designs.
#[derive(Debug, Default)]
pub struct DesignGroup {
    designs: Vec<Design>,
}

impl DesignGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            designs: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.designs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }

    /// Takes ownership of a design.
    pub fn insert(&mut self, design: Design) {
        self.designs.push(design);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Design> {
        self.designs.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Design> {
        self.designs.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Design> {
        self.designs.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Design> {
        self.designs.get_mut(index)
    }

    pub fn as_slice(&self) -> &[Design] {
        &self.designs
    }

    pub fn position(&self, id: DesignId) -> Option<usize> {
        self.designs.iter().position(|d| d.id() == id)
    }

    pub fn find(&self, id: DesignId) -> Option<&Design> {
        self.designs.iter().find(|d| d.id() == id)
    }

    pub fn contains(&self, id: DesignId) -> bool {
        self.position(id).is_some()
    }

    /// Removes and returns the design with the given id.
    pub fn remove(&mut self, id: DesignId) -> Option<Design> {
        self.position(id).map(|i| self.designs.remove(i))
    }

    /// Removes every design matching `pred`, preserving the order of both
    /// the removed and the remaining designs.
    pub fn take_where<F: FnMut(&Design) -> bool>(&mut self, mut pred: F) -> Vec<Design> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.designs.len());
        for d in self.designs.drain(..) {
            if pred(&d) {
                taken.push(d);
            } else {
                kept.push(d);
            }
        }
        self.designs = kept;
        taken
    }

    /// Removes the designs with the given ids.
    pub fn take_ids(&mut self, ids: &HashSet<DesignId>) -> Vec<Design> {
        self.take_where(|d| ids.contains(&d.id()))
    }

    /// Removes and returns all designs.
    pub fn take_all(&mut self) -> Vec<Design> {
        std::mem::take(&mut self.designs)
    }

    /// Moves every design of `other` into this group.
    pub fn absorb(&mut self, other: &mut DesignGroup) {
        self.designs.append(&mut other.designs);
    }

    /// Moves a single design into `dest`. Returns `false` if it is not here.
    pub fn move_to(&mut self, id: DesignId, dest: &mut DesignGroup) -> bool {
        match self.remove(id) {
            Some(d) => {
                dest.insert(d);
                true
            }
            None => false,
        }
    }

    /// Independent (unlinked) copies of every design.
    pub fn copy_designs(&self) -> DesignGroup {
        DesignGroup {
            designs: self.designs.clone(),
        }
    }

    /// Indices of the designs in sorted order.
    pub fn sorted_indices(&self, order: GroupOrder) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.designs.len()).collect();
        match order {
            GroupOrder::ByVariables => idx.sort_by(|&a, &b| {
                lexical_cmp(self.designs[a].variables(), self.designs[b].variables())
            }),
            GroupOrder::ByObjectives => idx.sort_by(|&a, &b| {
                lexical_cmp(self.designs[a].objectives(), self.designs[b].objectives())
            }),
        }
        idx
    }

    /// Whether any member has exactly these variable representations.
    pub fn contains_variables(&self, reps: &[f64]) -> bool {
        self.designs
            .iter()
            .any(|d| lexical_cmp(d.variables(), reps) == Ordering::Equal)
    }

    // ------------------------------------------------------------------
    // Clone testing
    // ------------------------------------------------------------------

    /// Links every design of this group with each design of `other` that
    /// has identical variables.
    ///
    /// When one side of a match is evaluated and the other is not, the
    /// unevaluated one receives a copy of the responses, so it need not be
    /// evaluated again.
    ///
    /// Returns the number of newly linked designs.
    ///
    /// # Complexity
    /// O((n + m) log(n + m)) plus the size of the matching runs.
    pub fn test_for_clones(&mut self, other: &mut DesignGroup) -> usize {
        if self.is_empty() || other.is_empty() {
            return 0;
        }
        let mine = self.sorted_indices(GroupOrder::ByVariables);
        let theirs = other.sorted_indices(GroupOrder::ByVariables);

        let mut linked = 0;
        let (mut i, mut j) = (0, 0);
        while i < mine.len() && j < theirs.len() {
            let a = &self.designs[mine[i]];
            let b = &other.designs[theirs[j]];
            match lexical_cmp(a.variables(), b.variables()) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    let run_a = run_end(&self.designs, &mine, i);
                    let run_b = run_end(&other.designs, &theirs, j);
                    for &ia in &mine[i..run_a] {
                        for &jb in &theirs[j..run_b] {
                            linked += Design::tag_as_clones(&self.designs[ia], &other.designs[jb]);
                            sync_pair(&mut self.designs[ia], &mut other.designs[jb]);
                        }
                    }
                    i = run_a;
                    j = run_b;
                }
            }
        }
        linked
    }

    /// Links designs of this group that have identical variables.
    ///
    /// Returns the number of newly linked designs.
    ///
    /// # Complexity
    /// O(n log n) plus the size of the matching runs.
    pub fn test_within_list_for_clones(&mut self) -> usize {
        let order = self.sorted_indices(GroupOrder::ByVariables);
        let mut linked = 0;
        let mut start = 0;
        while start < order.len() {
            let end = run_end(&self.designs, &order, start);
            if end - start > 1 {
                for w in order[start..end].windows(2) {
                    linked += Design::tag_as_clones(&self.designs[w[0]], &self.designs[w[1]]);
                }
                self.sync_run(&order[start..end]);
            }
            start = end;
        }
        linked
    }

    /// Copies responses from the first evaluated member of a run of clones
    /// into its unevaluated members.
    fn sync_run(&mut self, run: &[usize]) {
        let Some(&source) = run.iter().find(|&&i| self.designs[i].is_evaluated()) else {
            return;
        };
        for &i in run {
            if !self.designs[i].is_evaluated() {
                self.share_responses(source, i);
            }
        }
    }

    /// Copies the responses of the member at `from` into the member at `to`.
    ///
    /// Returns `false` if either index is out of range or they are equal.
    pub fn share_responses(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.designs.len() || to >= self.designs.len() {
            return false;
        }
        let (dest, source) = if to < from {
            let (head, tail) = self.designs.split_at_mut(from);
            (&mut head[to], &tail[0])
        } else {
            let (head, tail) = self.designs.split_at_mut(to);
            (&mut tail[0], &head[from])
        };
        dest.copy_responses(source);
        true
    }

    // ------------------------------------------------------------------
    // Hygiene
    // ------------------------------------------------------------------

    /// Removes and returns every illconditioned design.
    pub fn take_illconditioned(&mut self) -> Vec<Design> {
        self.take_where(Design::is_illconditioned)
    }

    /// Removes and releases every illconditioned design.
    ///
    /// Returns how many were removed.
    pub fn flush_illconditioned(&mut self) -> usize {
        self.take_illconditioned().len()
    }

    /// Number of evaluated members.
    pub fn evaluated_count(&self) -> usize {
        self.designs.iter().filter(|d| d.is_evaluated()).count()
    }
}

impl Extend<Design> for DesignGroup {
    fn extend<T: IntoIterator<Item = Design>>(&mut self, iter: T) {
        self.designs.extend(iter);
    }
}

impl FromIterator<Design> for DesignGroup {
    fn from_iter<T: IntoIterator<Item = Design>>(iter: T) -> Self {
        Self {
            designs: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for DesignGroup {
    type Item = Design;
    type IntoIter = std::vec::IntoIter<Design>;

    fn into_iter(mut self) -> Self::IntoIter {
        std::mem::take(&mut self.designs).into_iter()
    }
}

impl<'a> IntoIterator for &'a DesignGroup {
    type Item = &'a Design;
    type IntoIter = std::slice::Iter<'a, Design>;

    fn into_iter(self) -> Self::IntoIter {
        self.designs.iter()
    }
}

/// End (exclusive) of the run of equal-variable designs starting at `start`.
fn run_end(designs: &[Design], order: &[usize], start: usize) -> usize {
    let head = designs[order[start]].variables();
    let mut end = start + 1;
    while end < order.len() && lexical_cmp(designs[order[end]].variables(), head) == Ordering::Equal {
        end += 1;
    }
    end
}

fn sync_pair(a: &mut Design, b: &mut Design) {
    match (a.is_evaluated(), b.is_evaluated()) {
        (true, false) => b.copy_responses(a),
        (false, true) => a.copy_responses(b),
        _ => {}
    }
}

/// A read-only list of groups considered together.
#[derive(Debug, Default, Clone)]
pub struct DesignGroupVector<'a> {
    groups: Vec<&'a DesignGroup>,
}

impl<'a> DesignGroupVector<'a> {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn push(&mut self, group: &'a DesignGroup) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[&'a DesignGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of designs across all groups.
    pub fn total_design_count(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    /// Iterates every design of every group, group by group.
    pub fn designs(&self) -> impl Iterator<Item = &'a Design> + '_ {
        self.groups.iter().flat_map(|g| g.iter())
    }
}

impl<'a> FromIterator<&'a DesignGroup> for DesignGroupVector<'a> {
    fn from_iter<T: IntoIterator<Item = &'a DesignGroup>>(iter: T) -> Self {
        Self {
            groups: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{DesignTarget, DesignVariableInfo, ObjectiveFunctionInfo};
    use std::sync::Arc;

    fn target() -> Arc<DesignTarget> {
        DesignTarget::builder()
            .variable(DesignVariableInfo::continuous("x", 0.0, 10.0))
            .variable(DesignVariableInfo::continuous("y", 0.0, 10.0))
            .objective(ObjectiveFunctionInfo::minimize("f"))
            .build()
            .unwrap()
    }

    fn design(t: &Arc<DesignTarget>, x: f64, y: f64) -> Design {
        let mut d = t.new_design();
        d.set_variables(&[x, y]);
        d
    }

    // ---- ordering ----

    #[test]
    fn test_lexical_cmp() {
        assert_eq!(lexical_cmp(&[1.0, 2.0], &[1.0, 3.0]), Ordering::Less);
        assert_eq!(lexical_cmp(&[2.0], &[1.0, 9.0]), Ordering::Greater);
        assert_eq!(lexical_cmp(&[1.0, 2.0], &[1.0, 2.0]), Ordering::Equal);
    }

    #[test]
    fn test_sorted_indices() {
        let t = target();
        let mut g = DesignGroup::new();
        g.insert(design(&t, 3.0, 0.0));
        g.insert(design(&t, 1.0, 5.0));
        g.insert(design(&t, 1.0, 2.0));
        assert_eq!(g.sorted_indices(GroupOrder::ByVariables), vec![2, 1, 0]);

        g.get_mut(0).unwrap().set_objective(0, 0.5);
        g.get_mut(1).unwrap().set_objective(0, 9.0);
        g.get_mut(2).unwrap().set_objective(0, 4.0);
        assert_eq!(g.sorted_indices(GroupOrder::ByObjectives), vec![0, 2, 1]);
    }

    // ---- ownership hand-off ----

    #[test]
    fn test_move_between_groups() {
        let t = target();
        let mut a = DesignGroup::new();
        let mut b = DesignGroup::new();
        let d = design(&t, 1.0, 1.0);
        let id = d.id();
        a.insert(d);
        assert!(a.move_to(id, &mut b));
        assert!(a.is_empty());
        assert!(b.contains(id));
        assert!(!a.move_to(id, &mut b));
    }

    #[test]
    fn test_absorb_and_take() {
        let t = target();
        let mut a: DesignGroup = (0..3).map(|i| design(&t, i as f64, 0.0)).collect();
        let mut b: DesignGroup = (0..2).map(|i| design(&t, 0.0, i as f64)).collect();
        a.absorb(&mut b);
        assert_eq!(a.len(), 5);
        assert!(b.is_empty());

        let big = a.take_where(|d| d.variable_rep(0) >= 1.0);
        assert_eq!(big.len(), 2);
        assert_eq!(a.len(), 3);
    }

    // ---- clone testing ----

    #[test]
    fn test_clone_detection_across_groups() {
        let t = target();
        let mut pop = DesignGroup::new();
        let mut kids = DesignGroup::new();

        let mut evaluated = design(&t, 1.0, 2.0);
        evaluated.set_objective(0, 42.0);
        evaluated.set_evaluated(true);
        pop.insert(evaluated);
        pop.insert(design(&t, 5.0, 5.0));

        kids.insert(design(&t, 1.0, 2.0));
        kids.insert(design(&t, 9.0, 9.0));

        assert_eq!(kids.test_for_clones(&mut pop), 2);
        let kid = kids.get(0).unwrap();
        assert!(kid.is_clone_of(pop.get(0).unwrap()));
        assert!(kid.is_evaluated());
        assert_eq!(kid.objectives(), &[42.0]);
        assert!(!kids.get(1).unwrap().is_cloned());

        // Running again links nothing new.
        assert_eq!(kids.test_for_clones(&mut pop), 0);
    }

    #[test]
    fn test_flush_does_not_corrupt_partner() {
        let t = target();
        let mut a = DesignGroup::new();
        let mut b = DesignGroup::new();
        a.insert(design(&t, 3.0, 3.0));
        b.insert(design(&t, 3.0, 3.0));
        b.insert(design(&t, 3.0, 3.0));
        a.test_for_clones(&mut b);
        assert_eq!(a.get(0).unwrap().count_clones(), 2);

        b.get_mut(0).unwrap().set_illconditioned(true);
        assert_eq!(b.flush_illconditioned(), 1);
        let survivor = a.get(0).unwrap();
        assert_eq!(survivor.count_clones(), 1);
        assert!(survivor.is_clone_of(b.get(0).unwrap()));
    }

    #[test]
    fn test_within_list_clones() {
        let t = target();
        let mut g = DesignGroup::new();
        g.insert(design(&t, 2.0, 2.0));
        g.insert(design(&t, 1.0, 1.0));
        g.insert(design(&t, 2.0, 2.0));
        g.insert(design(&t, 2.0, 2.0));
        let mut evaluated = design(&t, 1.0, 1.0);
        evaluated.set_objective(0, 3.0);
        evaluated.set_evaluated(true);
        g.insert(evaluated);

        // Pair (1,1) links 2, triple (2,2) links 2 + 1.
        assert_eq!(g.test_within_list_for_clones(), 5);
        assert_eq!(g.get(0).unwrap().count_clones(), 2);
        assert!(g.get(1).unwrap().is_evaluated());
        assert_eq!(g.get(1).unwrap().objectives(), &[3.0]);
        assert!(!g.get(0).unwrap().is_evaluated());
    }

    #[test]
    fn test_within_list_sync_mints_no_designs() {
        let t = target();
        let mut g = DesignGroup::new();
        let mut evaluated = design(&t, 4.0, 4.0);
        evaluated.set_objective(0, 1.5);
        evaluated.set_evaluated(true);
        g.insert(design(&t, 4.0, 4.0));
        g.insert(evaluated);
        g.insert(design(&t, 4.0, 4.0));

        let before = t.new_design().id();
        g.test_within_list_for_clones();
        let after = t.new_design().id();
        assert_eq!(after, before + 1, "syncing clones consumed design ids");
        assert!(g.iter().all(|d| d.is_evaluated() && d.objectives() == [1.5]));
    }

    #[test]
    fn test_share_responses() {
        let t = target();
        let mut g = DesignGroup::new();
        g.insert(design(&t, 1.0, 1.0));
        let mut src = design(&t, 2.0, 2.0);
        src.set_objective(0, 7.0);
        src.set_evaluated(true);
        g.insert(src);

        assert!(g.share_responses(1, 0));
        assert_eq!(g.get(0).unwrap().objectives(), &[7.0]);
        assert!(g.get(0).unwrap().is_evaluated());
        assert_eq!(g.get(0).unwrap().variables(), &[1.0, 1.0]);
        assert!(!g.share_responses(0, 0));
        assert!(!g.share_responses(0, 5));
    }

    #[test]
    fn test_flush_illconditioned_counts() {
        let t = target();
        let mut g: DesignGroup = (0..6).map(|i| design(&t, i as f64, 0.0)).collect();
        for d in g.iter_mut().filter(|d| d.variable_rep(0) < 2.0) {
            d.set_illconditioned(true);
        }
        assert_eq!(g.flush_illconditioned(), 2);
        assert_eq!(g.len(), 4);
        assert!(g.iter().all(|d| !d.is_illconditioned()));
    }

    // ---- group vector ----

    #[test]
    fn test_group_vector_totals() {
        let t = target();
        let a: DesignGroup = (0..3).map(|i| design(&t, i as f64, 0.0)).collect();
        let b: DesignGroup = (0..4).map(|i| design(&t, 0.0, i as f64)).collect();
        let empty = DesignGroup::new();
        let v: DesignGroupVector = [&a, &b, &empty].into_iter().collect();
        assert_eq!(v.len(), 3);
        assert_eq!(v.total_design_count(), 7);
        assert_eq!(v.designs().count(), 7);
    }
}
