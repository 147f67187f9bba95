//! The candidate solution type.
//!
//! A [`Design`] holds one point of the design space: variable
//! representations, objective values and constraint values, stored in a
//! single contiguous buffer sized once from the target's dimensions. It also
//! carries a small attribute set, an operator-owned tag, a unique id, and a
//! reference to the [`DesignTarget`] that created it.
//!
//! # Clone semantics
//!
//! Two designs are *clones* when their variable representations are equal.
//! Clone relationships are tracked in rings stored by the target (see
//! [`CloneRegistry`](super::CloneRegistry)):
//!
//! - [`Design::tag_as_clones`] merges two rings
//! - [`Design::remove_as_clone`] leaves the ring
//! - [`Design::assign_from`] copies another design's values and joins its ring
//! - changing a variable representation leaves the ring, since the design is
//!   no longer a duplicate
//! - dropping a design leaves the ring and notifies the target's dispose hook
//!
//! `Clone::clone` produces an independent copy with a fresh id that is *not*
//! linked; use [`Design::duplicate`] for a linked copy.

use crate::space::DesignTarget;
use std::fmt;
use std::sync::Arc;

/// Unique design identifier. Ids increase monotonically per target.
pub type DesignId = u64;

/// Bookkeeping flags of a design.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DesignAttributes {
    pub evaluated: bool,
    pub illconditioned: bool,
    pub feasible: bool,
}

/// One candidate solution.
pub struct Design {
    id: DesignId,
    target: Arc<DesignTarget>,
    /// `[variables | objectives | constraints]`
    values: Box<[f64]>,
    attributes: DesignAttributes,
    tag: Option<u64>,
}

impl Design {
    /// Creates a blank design. Use [`DesignTarget::new_design`].
    pub(crate) fn new(target: Arc<DesignTarget>) -> Self {
        let len = target.ndv() + target.nof() + target.ncn();
        Self {
            id: target.next_id(),
            values: vec![0.0; len].into_boxed_slice(),
            target,
            attributes: DesignAttributes::default(),
            tag: None,
        }
    }

    pub fn id(&self) -> DesignId {
        self.id
    }

    pub fn target(&self) -> &Arc<DesignTarget> {
        &self.target
    }

    /// Whether both designs belong to the same target.
    pub fn same_target(&self, other: &Design) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    pub fn variables(&self) -> &[f64] {
        &self.values[..self.target.ndv()]
    }

    pub fn objectives(&self) -> &[f64] {
        let ndv = self.target.ndv();
        &self.values[ndv..ndv + self.target.nof()]
    }

    pub fn constraints(&self) -> &[f64] {
        &self.values[self.target.ndv() + self.target.nof()..]
    }

    pub fn variable_rep(&self, index: usize) -> f64 {
        self.variables()[index]
    }

    pub fn objective(&self, index: usize) -> f64 {
        self.objectives()[index]
    }

    pub fn constraint(&self, index: usize) -> f64 {
        self.constraints()[index]
    }

    /// Sets a variable representation.
    ///
    /// If the value actually changes, the design leaves its clone ring and
    /// its responses are marked stale (not evaluated).
    pub fn set_variable_rep(&mut self, index: usize, rep: f64) {
        assert!(index < self.target.ndv(), "variable index out of range");
        if self.values[index].to_bits() == rep.to_bits() {
            return;
        }
        self.values[index] = rep;
        self.remove_as_clone();
        self.attributes.evaluated = false;
    }

    /// Replaces all variable representations.
    pub fn set_variables(&mut self, reps: &[f64]) {
        assert_eq!(reps.len(), self.target.ndv(), "variable count mismatch");
        for (i, &rep) in reps.iter().enumerate() {
            self.set_variable_rep(i, rep);
        }
    }

    pub fn set_objective(&mut self, index: usize, value: f64) {
        assert!(index < self.target.nof(), "objective index out of range");
        self.values[self.target.ndv() + index] = value;
    }

    pub fn set_constraint(&mut self, index: usize, value: f64) {
        assert!(index < self.target.ncn(), "constraint index out of range");
        self.values[self.target.ndv() + self.target.nof() + index] = value;
    }

    // ------------------------------------------------------------------
    // Attributes and tag
    // ------------------------------------------------------------------

    pub fn attributes(&self) -> DesignAttributes {
        self.attributes
    }

    pub fn is_evaluated(&self) -> bool {
        self.attributes.evaluated
    }

    pub fn set_evaluated(&mut self, evaluated: bool) {
        self.attributes.evaluated = evaluated;
    }

    pub fn is_illconditioned(&self) -> bool {
        self.attributes.illconditioned
    }

    pub fn set_illconditioned(&mut self, illconditioned: bool) {
        self.attributes.illconditioned = illconditioned;
    }

    pub fn is_feasible(&self) -> bool {
        self.attributes.feasible
    }

    pub fn set_feasible(&mut self, feasible: bool) {
        self.attributes.feasible = feasible;
    }

    /// Operator-owned scratch slot.
    pub fn tag(&self) -> Option<u64> {
        self.tag
    }

    pub fn set_tag(&mut self, tag: Option<u64>) {
        self.tag = tag;
    }

    // ------------------------------------------------------------------
    // Copying
    // ------------------------------------------------------------------

    /// Copies objective and constraint values plus the evaluation-related
    /// attributes from `other`.
    ///
    /// # Panics
    /// Panics if the designs belong to different targets.
    pub fn copy_responses(&mut self, other: &Design) {
        assert!(self.same_target(other), "designs belong to different targets");
        let ndv = self.target.ndv();
        self.values[ndv..].copy_from_slice(&other.values[ndv..]);
        self.attributes.evaluated = other.attributes.evaluated;
        self.attributes.illconditioned = other.attributes.illconditioned;
        self.attributes.feasible = other.attributes.feasible;
    }

    /// Makes `self` a value-duplicate of `other` and links the two as clones.
    ///
    /// # Panics
    /// Panics if the designs belong to different targets or are the same design.
    pub fn assign_from(&mut self, other: &Design) {
        assert!(self.same_target(other), "designs belong to different targets");
        assert_ne!(self.id, other.id, "cannot assign a design to itself");
        self.remove_as_clone();
        self.values.copy_from_slice(&other.values);
        self.attributes = other.attributes;
        Design::tag_as_clones(self, other);
    }

    /// A copy with a fresh id, linked into `self`'s clone ring.
    pub fn duplicate(&self) -> Design {
        let copy = self.clone();
        Design::tag_as_clones(&copy, self);
        copy
    }

    // ------------------------------------------------------------------
    // Clone ring
    // ------------------------------------------------------------------

    /// Merges the clone rings of `a` and `b`.
    ///
    /// Returns the number of newly linked designs (see
    /// [`CloneRegistry::merge`](super::CloneRegistry::merge)).
    ///
    /// # Panics
    /// Panics if `a` and `b` are the same design or belong to different targets.
    pub fn tag_as_clones(a: &Design, b: &Design) -> usize {
        assert!(a.same_target(b), "designs belong to different targets");
        a.target.clones().merge(a.id, b.id)
    }

    /// Leaves the clone ring. Returns `false` if the design had no clones.
    pub fn remove_as_clone(&self) -> bool {
        self.target.clones().detach(self.id)
    }

    /// Number of live clones of this design.
    pub fn count_clones(&self) -> usize {
        self.target.clones().count_clones(self.id)
    }

    pub fn is_cloned(&self) -> bool {
        self.target.clones().is_cloned(self.id)
    }

    /// Whether `self` and `other` share a clone ring.
    pub fn is_clone_of(&self, other: &Design) -> bool {
        self.same_target(other) && self.target.clones().are_linked(self.id, other.id)
    }
}

impl Clone for Design {
    fn clone(&self) -> Self {
        Self {
            id: self.target.next_id(),
            target: Arc::clone(&self.target),
            values: self.values.clone(),
            attributes: self.attributes,
            tag: None,
        }
    }
}

impl Drop for Design {
    fn drop(&mut self) {
        self.target.dispose(self);
    }
}

impl fmt::Debug for Design {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Design")
            .field("id", &self.id)
            .field("variables", &self.variables())
            .field("objectives", &self.objectives())
            .field("constraints", &self.constraints())
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{DesignVariableInfo, ObjectiveFunctionInfo};

    fn target() -> Arc<DesignTarget> {
        DesignTarget::builder()
            .variable(DesignVariableInfo::continuous("x", 0.0, 10.0))
            .variable(DesignVariableInfo::continuous("y", 0.0, 10.0))
            .objective(ObjectiveFunctionInfo::minimize("f"))
            .build()
            .unwrap()
    }

    // ---- values ----

    #[test]
    fn test_layout() {
        let t = target();
        let mut d = t.new_design();
        d.set_variables(&[1.0, 2.0]);
        d.set_objective(0, 3.0);
        assert_eq!(d.variables(), &[1.0, 2.0]);
        assert_eq!(d.objectives(), &[3.0]);
        assert!(d.constraints().is_empty());
    }

    #[test]
    fn test_variable_change_resets_evaluated() {
        let t = target();
        let mut d = t.new_design();
        d.set_evaluated(true);
        d.set_variable_rep(0, 0.0); // unchanged
        assert!(d.is_evaluated());
        d.set_variable_rep(0, 4.0);
        assert!(!d.is_evaluated());
    }

    #[test]
    fn test_clone_is_independent() {
        let t = target();
        let mut d = t.new_design();
        d.set_variables(&[1.0, 1.0]);
        d.set_tag(Some(5));
        let c = d.clone();
        assert_ne!(c.id(), d.id());
        assert_eq!(c.variables(), d.variables());
        assert_eq!(c.tag(), None);
        assert!(!c.is_clone_of(&d));
    }

    // ---- clone rings ----

    #[test]
    fn test_tag_and_count() {
        let t = target();
        let a = t.new_design();
        let b = t.new_design();
        let c = t.new_design();
        assert_eq!(Design::tag_as_clones(&a, &b), 2);
        assert_eq!(Design::tag_as_clones(&c, &a), 1);
        assert_eq!(Design::tag_as_clones(&b, &c), 0);
        assert_eq!(a.count_clones(), 2);
        assert!(b.is_clone_of(&c));
    }

    #[test]
    fn test_drop_leaves_ring() {
        let t = target();
        let a = t.new_design();
        let b = t.new_design();
        {
            let c = a.duplicate();
            Design::tag_as_clones(&b, &c);
            assert_eq!(a.count_clones(), 2);
        }
        assert_eq!(a.count_clones(), 1);
        assert!(a.is_clone_of(&b));
    }

    #[test]
    fn test_variable_change_leaves_ring() {
        let t = target();
        let a = t.new_design();
        let mut b = a.duplicate();
        assert!(b.is_cloned());
        b.set_variable_rep(1, 9.0);
        assert!(!b.is_cloned());
        assert!(!a.is_cloned());
    }

    #[test]
    fn test_assign_from() {
        let t = target();
        let mut src = t.new_design();
        src.set_variables(&[2.0, 3.0]);
        src.set_objective(0, 7.0);
        src.set_evaluated(true);

        let mut dst = t.new_design();
        dst.assign_from(&src);
        assert_eq!(dst.variables(), src.variables());
        assert_eq!(dst.objectives(), &[7.0]);
        assert!(dst.is_evaluated());
        assert!(dst.is_clone_of(&src));
        assert_ne!(dst.id(), src.id());
    }

    #[test]
    fn test_copy_responses() {
        let t = target();
        let mut src = t.new_design();
        src.set_objective(0, 1.5);
        src.set_evaluated(true);
        src.set_feasible(true);
        let mut dst = t.new_design();
        dst.set_variables(&[4.0, 4.0]);
        dst.copy_responses(&src);
        assert_eq!(dst.objectives(), &[1.5]);
        assert_eq!(dst.variables(), &[4.0, 4.0]);
        assert!(dst.is_evaluated() && dst.is_feasible());
    }

    #[test]
    #[should_panic(expected = "different targets")]
    fn test_cross_target_assign_panics() {
        let a = target().new_design();
        let mut b = target().new_design();
        b.assign_from(&a);
    }

    #[test]
    #[should_panic(expected = "clone of itself")]
    fn test_self_tag_panics() {
        let t = target();
        let a = t.new_design();
        Design::tag_as_clones(&a, &a);
    }
}
