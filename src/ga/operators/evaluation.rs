//! Evaluators.
//!
//! An [`Evaluator`] fills in the objective and constraint values of every
//! unevaluated design of a group. A design it cannot score is marked
//! illconditioned; the main loop flushes those. Evaluators may also hand
//! back already-evaluated designs produced out of band (for example by an
//! asynchronous worker), which the main loop merges into the offspring.

use crate::design::{lexical_cmp, Design, DesignGroup};
use crate::space::DesignTarget;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Responses of one design.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Evaluation {
    pub objectives: Vec<f64>,
    pub constraints: Vec<f64>,
}

impl Evaluation {
    pub fn new(objectives: Vec<f64>) -> Self {
        Self {
            objectives,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<f64>) -> Self {
        self.constraints = constraints;
        self
    }

    fn is_usable(&self, target: &DesignTarget) -> bool {
        self.objectives.len() == target.nof()
            && self.constraints.len() == target.ncn()
            && self.objectives.iter().chain(&self.constraints).all(|v| v.is_finite())
    }
}

/// Writes an evaluation result into a design.
///
/// A missing, mis-sized or non-finite result marks the design
/// illconditioned. Returns whether the design was scored.
pub fn record_evaluation(target: &DesignTarget, design: &mut Design, result: Option<Evaluation>) -> bool {
    match result {
        Some(eval) if eval.is_usable(target) => {
            for (i, &f) in eval.objectives.iter().enumerate() {
                design.set_objective(i, f);
            }
            for (i, &g) in eval.constraints.iter().enumerate() {
                design.set_constraint(i, g);
            }
            design.set_evaluated(true);
            design.set_illconditioned(false);
            target.update_feasibility(design);
            true
        }
        _ => {
            design.set_illconditioned(true);
            false
        }
    }
}

/// Scores designs.
pub trait Evaluator: Send {
    /// Evaluates every design of `group` not yet evaluated.
    ///
    /// Returns the number of evaluations performed.
    fn evaluate(&mut self, target: &Arc<DesignTarget>, group: &mut DesignGroup) -> usize;

    /// Designs evaluated out of band since the last call.
    fn take_injections(&mut self, _target: &Arc<DesignTarget>) -> Vec<Design> {
        Vec::new()
    }

    /// Total evaluations performed so far.
    fn evaluations(&self) -> usize;
}

// ============================================================================
// Injection queue
// ============================================================================

/// Thread-safe handle for submitting externally evaluated points.
///
/// Points are given in user-facing variable values.
#[derive(Debug, Clone, Default)]
pub struct InjectionQueue {
    inner: Arc<Mutex<Vec<(Vec<f64>, Evaluation)>>>,
}

impl InjectionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, values: Vec<f64>, evaluation: Evaluation) {
        self.lock().push((values, evaluation));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn drain(&self) -> Vec<(Vec<f64>, Evaluation)> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Vec<f64>, Evaluation)>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Closure evaluator
// ============================================================================

/// Adapts a closure over user-facing variable values into an [`Evaluator`].
///
/// The closure returns `None` for points it cannot score.
///
/// # Examples
///
/// ```
/// use u_evolve::ga::operators::{Evaluation, FnEvaluator};
///
/// let eval = FnEvaluator::new(|x: &[f64]| {
///     Some(Evaluation::new(vec![x[0] * x[0], (x[0] - 2.0).powi(2)]))
/// });
/// assert_eq!(u_evolve::ga::operators::Evaluator::evaluations(&eval), 0);
/// ```
pub struct FnEvaluator<F> {
    func: F,
    parallel: bool,
    evaluations: usize,
    queue: InjectionQueue,
}

impl<F> fmt::Debug for FnEvaluator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvaluator")
            .field("parallel", &self.parallel)
            .field("evaluations", &self.evaluations)
            .field("pending_injections", &self.queue.len())
            .finish()
    }
}

impl<F> FnEvaluator<F>
where
    F: Fn(&[f64]) -> Option<Evaluation> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            parallel: false,
            evaluations: 0,
            queue: InjectionQueue::new(),
        }
    }

    /// Evaluates designs with rayon. Ignored without the `parallel` feature.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Handle through which out-of-band results are submitted.
    pub fn injection_queue(&self) -> InjectionQueue {
        self.queue.clone()
    }

    fn score(&self, inputs: &[Vec<f64>]) -> Vec<Option<Evaluation>> {
        #[cfg(feature = "parallel")]
        if self.parallel {
            return inputs.par_iter().map(|x| (self.func)(x)).collect();
        }
        inputs.iter().map(|x| (self.func)(x)).collect()
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(&[f64]) -> Option<Evaluation> + Send + Sync,
{
    /// Scores every pending design once per distinct variable vector.
    ///
    /// Pending designs with identical variables (clones linked by the clone
    /// tests, or simply equal) share one call; the remaining members of the
    /// run receive the representative's responses.
    fn evaluate(&mut self, target: &Arc<DesignTarget>, group: &mut DesignGroup) -> usize {
        let designs = group.as_slice();
        let mut pending: Vec<usize> = (0..designs.len())
            .filter(|&i| !designs[i].is_evaluated() && !designs[i].is_illconditioned())
            .collect();
        if pending.is_empty() {
            return 0;
        }
        pending.sort_by(|&a, &b| lexical_cmp(designs[a].variables(), designs[b].variables()));

        let mut runs: Vec<Vec<usize>> = Vec::new();
        for i in pending {
            let same = runs
                .last()
                .is_some_and(|run| lexical_cmp(designs[run[0]].variables(), designs[i].variables()).is_eq());
            if same {
                if let Some(run) = runs.last_mut() {
                    run.push(i);
                    continue;
                }
            }
            runs.push(vec![i]);
        }
        let inputs: Vec<Vec<f64>> = runs.iter().map(|run| target.variable_values(&designs[run[0]])).collect();
        let results = self.score(&inputs);

        let mut failed = 0usize;
        let mut shared = 0usize;
        for (run, result) in runs.iter().zip(results) {
            let Some(rep) = group.get_mut(run[0]) else {
                continue;
            };
            if !record_evaluation(target, rep, result) {
                failed += run.len();
            }
            for &i in &run[1..] {
                if group.share_responses(run[0], i) {
                    shared += 1;
                }
            }
        }
        let performed = runs.len();
        self.evaluations += performed;
        if shared > 0 {
            log::debug!("evaluator: {shared} duplicate designs reused a single evaluation");
        }
        if failed > 0 {
            log::debug!("evaluator: {failed} of {} designs could not be scored", performed + shared);
        }
        performed
    }

    fn take_injections(&mut self, target: &Arc<DesignTarget>) -> Vec<Design> {
        let submitted = self.queue.drain();
        let total = submitted.len();
        let accepted: Vec<Design> = submitted
            .into_iter()
            .filter(|(values, _)| values.len() == target.ndv())
            .filter_map(|(values, eval)| {
                let mut d = target.design_from_values(&values);
                record_evaluation(target, &mut d, Some(eval)).then_some(d)
            })
            .collect();
        if accepted.len() < total {
            log::info!("evaluator: rejected {} of {total} injected designs", total - accepted.len());
        }
        accepted
    }

    fn evaluations(&self) -> usize {
        self.evaluations
    }
}
