//! Shared machinery for the scheduling propagator families: disjunctive, cumulative, reservoir
//! and 2-D no-overlap (spec §3-§4, §8.2).
//!
//! Every family is built from the same small vocabulary: an [`AffineExpr`] for things that may
//! carry a coefficient (demand), a [`Task`] for an optional interval, and a [`TaskHelper`] that
//! caches bounds for a set of tasks and knows how to push bound updates / build explanations in
//! either time direction (spec §8.2's "process forward, then mirror" trick, generalized so every
//! propagator is written once and run twice).

pub mod config;
pub mod demand;
pub mod task_set;
pub mod theta_lambda_tree;
pub mod windows;

pub use config::{OppConfig, SchedulingConfig};
pub use demand::DemandHelper;
pub use task_set::{TaskSet, TaskSetEntry};
pub use theta_lambda_tree::{EventId, ThetaLambdaTree};

use num_integer::Integer;

use crate::core::state::{Cause, Domains, DomainsSnapshot};
use crate::core::{IntCst, Lit, VarRef};
use crate::model::lang::{IAtom, IVar};

/// An affine expression `coeff * var + constant` (spec §3.1).
///
/// Generalizes [IAtom] (which is restricted to `coeff == 1`) to represent demands and other
/// quantities that scale with a variable, e.g. a per-unit-of-resource cost.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AffineExpr {
    pub var: IVar,
    pub coeff: IntCst,
    pub constant: IntCst,
}

impl AffineExpr {
    pub fn new(var: IVar, coeff: IntCst, constant: IntCst) -> Self {
        debug_assert_ne!(coeff, 0);
        AffineExpr { var, coeff, constant }
    }

    pub fn constant(value: IntCst) -> Self {
        AffineExpr {
            var: IVar::ZERO,
            coeff: 1,
            constant: value,
        }
    }

    pub fn lb(&self, domains: &Domains) -> IntCst {
        let atom = IAtom::from(self.var);
        let (a, b) = (domains.lb(atom), domains.ub(atom));
        self.eval_bound(a, b, true)
    }

    pub fn ub(&self, domains: &Domains) -> IntCst {
        let atom = IAtom::from(self.var);
        let (a, b) = (domains.lb(atom), domains.ub(atom));
        self.eval_bound(a, b, false)
    }

    fn eval_bound(&self, var_lb: IntCst, var_ub: IntCst, want_lb: bool) -> IntCst {
        if self.coeff > 0 {
            let v = if want_lb { var_lb } else { var_ub };
            self.coeff.saturating_mul(v).saturating_add(self.constant)
        } else {
            let v = if want_lb { var_ub } else { var_lb };
            self.coeff.saturating_mul(v).saturating_add(self.constant)
        }
    }

    /// Literal asserting that this expression's value is `>= lb`, i.e. a bound on the underlying
    /// variable (rounded towards feasibility for non-unit coefficients).
    pub fn ge_lit(&self, lb: IntCst) -> Lit {
        let needed = lb.saturating_sub(self.constant);
        if self.coeff > 0 {
            let bound = needed.div_ceil(&self.coeff);
            IAtom::from(self.var).ge_lit(bound)
        } else {
            let bound = needed.div_floor(&self.coeff);
            IAtom::from(self.var).le_lit(bound)
        }
    }

    /// Literal asserting that this expression's value is `<= ub`.
    pub fn le_lit(&self, ub: IntCst) -> Lit {
        let allowed = ub.saturating_sub(self.constant);
        if self.coeff > 0 {
            let bound = allowed.div_floor(&self.coeff);
            IAtom::from(self.var).le_lit(bound)
        } else {
            let bound = allowed.div_ceil(&self.coeff);
            IAtom::from(self.var).ge_lit(bound)
        }
    }

    /// The negated expression `-coeff * var - constant`, e.g. for mirroring a min-level
    /// constraint into a max-level one by negating every delta.
    pub fn negated(&self) -> Self {
        AffineExpr {
            var: self.var,
            coeff: -self.coeff,
            constant: -self.constant,
        }
    }

    /// Lower bound read from a historical [DomainsSnapshot] rather than a live [Domains] (for use
    /// from `explain`, see [task_bounds_from_snapshot]).
    pub fn lb_snapshot(&self, state: &DomainsSnapshot) -> IntCst {
        let (a, b) = (snapshot_lb(state, IAtom::from(self.var)), snapshot_ub(state, IAtom::from(self.var)));
        if self.coeff > 0 {
            self.coeff.saturating_mul(a).saturating_add(self.constant)
        } else {
            self.coeff.saturating_mul(b).saturating_add(self.constant)
        }
    }

    pub fn ub_snapshot(&self, state: &DomainsSnapshot) -> IntCst {
        let (a, b) = (snapshot_lb(state, IAtom::from(self.var)), snapshot_ub(state, IAtom::from(self.var)));
        if self.coeff > 0 {
            self.coeff.saturating_mul(b).saturating_add(self.constant)
        } else {
            self.coeff.saturating_mul(a).saturating_add(self.constant)
        }
    }
}

impl From<IAtom> for AffineExpr {
    fn from(a: IAtom) -> Self {
        AffineExpr {
            var: a.var,
            coeff: 1,
            constant: a.shift,
        }
    }
}
impl From<IVar> for AffineExpr {
    fn from(v: IVar) -> Self {
        AffineExpr::from(IAtom::from(v))
    }
}
impl From<IntCst> for AffineExpr {
    fn from(c: IntCst) -> Self {
        AffineExpr::constant(c)
    }
}

/// An optional task: a start/end/size triple of [IAtom]s guarded by a presence literal (spec
/// §3.2). Size is kept separate from `end - start` since several propagators need `size_min`
/// independently of the currently-inferred bounds on `start`/`end`.
#[derive(Copy, Clone, Debug)]
pub struct Task {
    pub start: IAtom,
    pub size: IAtom,
    pub end: IAtom,
    pub presence: Lit,
}

impl Task {
    pub fn new(start: impl Into<IAtom>, size: impl Into<IAtom>, end: impl Into<IAtom>, presence: Lit) -> Self {
        Task {
            start: start.into(),
            size: size.into(),
            end: end.into(),
            presence,
        }
    }

    pub fn variables(&self) -> [VarRef; 3] {
        [self.start.var.into(), self.size.var.into(), self.end.var.into()]
    }
}

/// Whether a propagator is running on the tasks as given, or on the mirror image obtained by
/// negating every time point (spec §8.2): running the forward-only variant of an algorithm twice,
/// once in each direction, gives the "symmetric" propagation (e.g. edge-finding on both ends)
/// without duplicating the algorithm.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Cached bounds for one task, refreshed by [TaskHelper::synchronize_and_set_time_direction].
/// All fields are already expressed in the *current* direction, so propagators never need to
/// branch on [Direction] themselves.
#[derive(Copy, Clone, Debug, Default)]
pub struct CachedBounds {
    pub start_min: IntCst,
    pub start_max: IntCst,
    pub end_min: IntCst,
    pub end_max: IntCst,
    pub size_min: IntCst,
    pub size_max: IntCst,
}

impl CachedBounds {
    pub fn shifted_start_min(&self) -> IntCst {
        std::cmp::max(self.start_min, self.end_min - self.size_min)
    }
    pub fn shifted_end_max(&self) -> IntCst {
        std::cmp::min(self.end_max, self.start_max + self.size_min)
    }
}

/// Shared bound-caching, push, and reason-building logic for a set of tasks (spec §4.1).
///
/// Every propagator in the disjunctive/cumulative/2-D families owns one `TaskHelper` per
/// constraint instance and calls [Self::synchronize_and_set_time_direction] at the start of each
/// `propagate`, then reads bounds through [Self::bounds] and pushes updates through
/// [Self::increase_start_min] / [Self::decrease_end_max] / [Self::push_task_absence].
pub struct TaskHelper {
    direction: Direction,
    bounds: Vec<CachedBounds>,
}

impl TaskHelper {
    pub fn new(num_tasks: usize) -> Self {
        TaskHelper {
            direction: Direction::Forward,
            bounds: vec![CachedBounds::default(); num_tasks],
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn bounds(&self, t: usize) -> &CachedBounds {
        &self.bounds[t]
    }

    pub fn num_tasks(&self) -> usize {
        self.bounds.len()
    }

    /// Refreshes every cached bound from `domains`, expressed in `direction` (negating start/end
    /// roles when `Backward`). Must be called once at the top of every `propagate` before any
    /// other method on this helper is used.
    pub fn synchronize_and_set_time_direction(&mut self, tasks: &[Task], domains: &Domains, direction: Direction) {
        self.direction = direction;
        for (t, task) in tasks.iter().enumerate() {
            let b = match direction {
                Direction::Forward => CachedBounds {
                    start_min: domains.lb(task.start),
                    start_max: domains.ub(task.start),
                    end_min: domains.lb(task.end),
                    end_max: domains.ub(task.end),
                    size_min: domains.lb(task.size),
                    size_max: domains.ub(task.size),
                },
                Direction::Backward => CachedBounds {
                    start_min: -domains.ub(task.end),
                    start_max: -domains.lb(task.end),
                    end_min: -domains.ub(task.start),
                    end_max: -domains.lb(task.start),
                    size_min: domains.lb(task.size),
                    size_max: domains.ub(task.size),
                },
            };
            self.bounds[t] = b;
        }
    }

    pub fn is_present(&self, tasks: &[Task], domains: &Domains, t: usize) -> bool {
        domains.entails(tasks[t].presence)
    }

    pub fn is_absent(&self, tasks: &[Task], domains: &Domains, t: usize) -> bool {
        domains.entails(!tasks[t].presence)
    }

    // ---- pushes ----

    pub fn increase_start_min(
        &self,
        tasks: &[Task],
        t: usize,
        new_bound: IntCst,
        domains: &mut Domains,
        cause: Cause,
    ) -> Result<bool, crate::core::state::InvalidUpdate> {
        let lit = match self.direction {
            Direction::Forward => tasks[t].start.ge_lit(new_bound),
            Direction::Backward => tasks[t].end.le_lit(-new_bound),
        };
        domains.set(lit, cause)
    }

    pub fn decrease_end_max(
        &self,
        tasks: &[Task],
        t: usize,
        new_bound: IntCst,
        domains: &mut Domains,
        cause: Cause,
    ) -> Result<bool, crate::core::state::InvalidUpdate> {
        let lit = match self.direction {
            Direction::Forward => tasks[t].end.le_lit(new_bound),
            Direction::Backward => tasks[t].start.ge_lit(-new_bound),
        };
        domains.set(lit, cause)
    }

    pub fn push_task_absence(
        &self,
        tasks: &[Task],
        t: usize,
        domains: &mut Domains,
        cause: Cause,
    ) -> Result<bool, crate::core::state::InvalidUpdate> {
        domains.set(!tasks[t].presence, cause)
    }
}

/// Reconstructs the (forward-direction) bounds a task had at the time described by `state`. Used
/// from `explain` implementations, which only have access to a [DomainsSnapshot] (propagators
/// never persist their [TaskHelper] across the `propagate`/`explain` boundary, since
/// [crate::reasoners::cp::Propagator::propagate] only takes `&self`).
///
/// Forward-direction bounds are always sound premises regardless of which [Direction] the
/// propagator was actually running in when it made the inference being explained: a backward-run
/// bound is just a relabeling of the corresponding forward one (`start_min` under `Backward` is
/// `-end_max` under `Forward`), so citing the tightest currently-true forward bounds is always at
/// least as strong as whatever the propagator actually used.
pub fn task_bounds_from_snapshot(task: &Task, state: &DomainsSnapshot) -> CachedBounds {
    CachedBounds {
        start_min: snapshot_lb(state, task.start),
        start_max: snapshot_ub(state, task.start),
        end_min: snapshot_lb(state, task.end),
        end_max: snapshot_ub(state, task.end),
        size_min: snapshot_lb(state, task.size),
        size_max: snapshot_ub(state, task.size),
    }
}

/// Builds a sound (not necessarily minimal) explanation for an inference made by reasoning about
/// `group` as a whole: cites the presence (when known true) and the start-min/end-max/size-min
/// bounds of every task in the group, as they were in `state`.
///
/// Every propagator in this crate reasons purely from such bound/presence facts about the tasks
/// it was given, so citing all of them is always a valid (if occasionally oversized) explanation;
/// see [Propagator::explain](crate::reasoners::cp::Propagator::explain)'s doc comment: minimality
/// helps the solver but is not required for correctness.
pub fn explain_group_conservatively(
    tasks: &[Task],
    group: &[usize],
    state: &DomainsSnapshot,
    out: &mut crate::core::state::Explanation,
) {
    for &t in group {
        let task = &tasks[t];
        if state.entails(task.presence) {
            out.push(task.presence);
        }
        let b = task_bounds_from_snapshot(task, state);
        out.push(task.start.ge_lit(b.start_min));
        out.push(task.end.le_lit(b.end_max));
        out.push(task.size.ge_lit(b.size_min));
    }
}

/// Reads a bound on `atom` out of a historical snapshot, for use inside `explain` where only a
/// [DomainsSnapshot] (not a live [Domains]) is available. [DomainsSnapshot] intentionally has no
/// `presence` accessor (absence/presence is never what `explain` needs to recover, only the
/// numeric bound that was true at inference time), so it is not given a [crate::core::views::Dom]
/// impl; these free functions cover the subset callers actually need.
pub fn snapshot_lb(state: &DomainsSnapshot, atom: IAtom) -> IntCst {
    state.lb(VarRef::from(atom.var)) + atom.shift
}

pub fn snapshot_ub(state: &DomainsSnapshot, atom: IAtom) -> IntCst {
    state.ub(VarRef::from(atom.var)) + atom.shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Domains;

    #[test]
    fn affine_expr_bounds_with_negative_coeff() {
        let mut m = Domains::new();
        let v = IVar::new(m.new_var(0, 10));
        let e = AffineExpr::new(v, -2, 5);
        // value = 5 - 2*v, v in [0, 10] => value in [-15, 5]
        assert_eq!(e.lb(&m), -15);
        assert_eq!(e.ub(&m), 5);
    }

    #[test]
    fn affine_expr_ge_lit_rounds_towards_feasibility() {
        let mut m = Domains::new();
        let v = IVar::new(m.new_var(0, 10));
        let e = AffineExpr::new(v, 3, 0); // value = 3*v
        // value >= 7  <=>  v >= ceil(7/3) = 3
        let lit = e.ge_lit(7);
        assert!(!m.entails(lit));
        m.set_lb(VarRef::from(v), 3, Cause::Decision).unwrap();
        assert!(m.entails(lit));
    }

    #[test]
    fn task_helper_mirrors_bounds_in_backward_direction() {
        let mut m = Domains::new();
        let s = IVar::new(m.new_var(0, 100));
        let sz = IVar::new(m.new_var(3, 3));
        let e = IVar::new(m.new_var(0, 100));
        let task = Task::new(s, sz, e, Lit::TRUE);
        let mut h = TaskHelper::new(1);
        h.synchronize_and_set_time_direction(&[task], &m, Direction::Forward);
        assert_eq!(h.bounds(0).start_min, 0);
        h.synchronize_and_set_time_direction(&[task], &m, Direction::Backward);
        // backward start_min = -end_max = -100
        assert_eq!(h.bounds(0).start_min, -100);
    }
}
