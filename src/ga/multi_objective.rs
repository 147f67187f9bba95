//! Pareto dominance utilities.
//!
//! Domain-agnostic building blocks for Pareto-based fitness assessment and
//! solution extraction. All objectives are **minimized**; designs are first
//! mapped into minimization-adjusted space by [`DominanceKey::of`].
//!
//! # Algorithms
//!
//! - [`dominance_cmp`]: pairwise Pareto comparison of objective vectors
//! - [`layered_sort`]: fast non-dominated sorting over any dominance relation
//! - [`non_dominated_sort`]: the same over plain objective vectors
//! - [`domination_counts`]: number of dominators per solution
//! - [`DominanceKey`]: constraint-aware dominance between designs
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II"
//! - Fonseca & Fleming (1993), "Genetic Algorithms for Multiobjective
//!   Optimization: Formulation, Discussion and Generalization"
//! - Deb (2000), "An efficient constraint handling method for genetic algorithms"

use crate::design::Design;
use crate::space::DesignTarget;

/// Result of non-dominated sorting.
///
/// Each element of `ranks` corresponds to the Pareto layer of the solution
/// at the same index. Layer 0 is the Pareto front (non-dominated solutions).
#[derive(Debug, Clone)]
pub struct NondominatedSortResult {
    /// Pareto layer for each solution (0 = front).
    pub ranks: Vec<usize>,

    /// Indices grouped by layer: `fronts[0]` contains layer-0 indices, etc.
    pub fronts: Vec<Vec<usize>>,
}

/// Dominance comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// Left dominates right.
    Left,
    /// Right dominates left.
    Right,
    /// Neither dominates the other.
    Neither,
}

/// Compares two objective vectors for Pareto dominance (minimization).
///
/// Equal vectors are mutually non-dominated.
pub fn dominance_cmp(a: &[f64], b: &[f64]) -> Dominance {
    let mut a_better_in_some = false;
    let mut b_better_in_some = false;

    for (&va, &vb) in a.iter().zip(b.iter()) {
        if va < vb {
            a_better_in_some = true;
        } else if vb < va {
            b_better_in_some = true;
        }
    }

    match (a_better_in_some, b_better_in_some) {
        (true, false) => Dominance::Left,
        (false, true) => Dominance::Right,
        _ => Dominance::Neither,
    }
}

/// Fast non-dominated sorting over an arbitrary dominance relation.
///
/// `cmp(i, j)` compares solutions `i` and `j`. Returns an empty result for
/// `n == 0`.
///
/// # Complexity
///
/// O(n²) comparisons.
pub fn layered_sort<F>(n: usize, cmp: F) -> NondominatedSortResult
where
    F: Fn(usize, usize) -> Dominance,
{
    if n == 0 {
        return NondominatedSortResult {
            ranks: Vec::new(),
            fronts: Vec::new(),
        };
    }

    let mut domination_count = vec![0usize; n];
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut ranks = vec![0usize; n];
    let mut front_0 = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            match cmp(i, j) {
                Dominance::Left => {
                    dominated_by[i].push(j);
                    domination_count[j] += 1;
                }
                Dominance::Right => {
                    dominated_by[j].push(i);
                    domination_count[i] += 1;
                }
                Dominance::Neither => {}
            }
        }

        // Every pair involving i has been compared by now.
        if domination_count[i] == 0 {
            front_0.push(i);
        }
    }

    let mut fronts = vec![front_0];
    loop {
        let Some(current) = fronts.last() else {
            break;
        };
        let mut next_front = Vec::new();

        for &i in current {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    ranks[j] = fronts.len();
                    next_front.push(j);
                }
            }
        }

        if next_front.is_empty() {
            break;
        }
        fronts.push(next_front);
    }

    NondominatedSortResult { ranks, fronts }
}

/// Fast non-dominated sorting of plain objective vectors (minimization).
///
/// # Panics
///
/// Panics if `objectives` is empty.
///
/// # Example
///
/// ```
/// use u_evolve::ga::multi_objective::non_dominated_sort;
///
/// let objectives = vec![
///     vec![1.0, 5.0],  // A
///     vec![3.0, 3.0],  // B
///     vec![5.0, 1.0],  // C
///     vec![4.0, 4.0],  // D, dominated by B
/// ];
///
/// let result = non_dominated_sort(&objectives);
/// assert_eq!(result.ranks, vec![0, 0, 0, 1]);
/// ```
pub fn non_dominated_sort(objectives: &[Vec<f64>]) -> NondominatedSortResult {
    assert!(!objectives.is_empty(), "objectives must not be empty");
    layered_sort(objectives.len(), |i, j| dominance_cmp(&objectives[i], &objectives[j]))
}

/// Number of solutions dominating each solution.
///
/// # Complexity
///
/// O(n²) comparisons.
pub fn domination_counts<F>(n: usize, cmp: F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Dominance,
{
    let mut counts = vec![0usize; n];
    for i in 0..n {
        for j in (i + 1)..n {
            match cmp(i, j) {
                Dominance::Left => counts[j] += 1,
                Dominance::Right => counts[i] += 1,
                Dominance::Neither => {}
            }
        }
    }
    counts
}

// ============================================================================
// Design dominance
// ============================================================================

/// Precomputed dominance data of one design.
///
/// Constraint handling follows the feasibility-first rule:
///
/// 1. a feasible design dominates an infeasible one
/// 2. between infeasible designs, the smaller total violation dominates
/// 3. otherwise Pareto dominance on minimization-adjusted objectives applies
#[derive(Debug, Clone, PartialEq)]
pub struct DominanceKey {
    pub violation: f64,
    pub objectives: Vec<f64>,
}

impl DominanceKey {
    pub fn of(target: &DesignTarget, design: &Design) -> Self {
        let mut violation = target.total_violation(design);
        if violation.is_nan() {
            violation = f64::INFINITY;
        }
        Self {
            violation,
            objectives: target.adjusted_objectives(design),
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.violation == 0.0
    }

    pub fn compare(&self, other: &DominanceKey) -> Dominance {
        if self.violation < other.violation {
            return Dominance::Left;
        }
        if other.violation < self.violation {
            return Dominance::Right;
        }
        dominance_cmp(&self.objectives, &other.objectives)
    }

    pub fn dominates(&self, other: &DominanceKey) -> bool {
        self.compare(other) == Dominance::Left
    }
}

/// Constraint-aware dominance between two designs of `target`.
pub fn design_dominance(target: &DesignTarget, a: &Design, b: &Design) -> Dominance {
    DominanceKey::of(target, a).compare(&DominanceKey::of(target, b))
}

/// Layer-0 indices of a set of keys.
pub fn pareto_front(keys: &[DominanceKey]) -> Vec<usize> {
    let counts = domination_counts(keys.len(), |i, j| keys[i].compare(&keys[j]));
    counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c == 0)
        .map(|(i, _)| i)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
