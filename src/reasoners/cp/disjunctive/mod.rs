//! The disjunctive (unary resource / "no two tasks overlap") constraint family (spec §4.4-§4.8).
//!
//! [NoOverlap] drives four increasingly expensive layers of reasoning over the same set of
//! [Task]s: the overload checker, detectable precedences, not-last, and edge finding. Each layer
//! is written once, against a forward-direction [TaskHelper], and run a second time against the
//! mirror image (spec §8.2) to get the symmetric deductions (e.g. edge-finding both "must start
//! after" and "must end before") without duplicating the algorithm. A [LevelZeroPrecedences]
//! registry is refreshed alongside them, recording permanent orderings for consumers outside this
//! family (see its own doc comment).

mod detectable_precedences;
mod edge_finding;
mod not_last;
mod overload;
mod precedences;

use itertools::Itertools;

use crate::core::state::{Cause, Domains, Explanation};
use crate::core::Lit;
use crate::reasoners::cp::scheduling::{explain_group_conservatively, Direction, SchedulingConfig, Task, TaskHelper};
use crate::reasoners::cp::{DynPropagator, Propagator, UserPropagator, Watches};
use crate::reasoners::Contradiction;

pub use precedences::LevelZeroPrecedences;

pub struct NoOverlap {
    tasks: Vec<Task>,
    precedences: LevelZeroPrecedences,
    config: SchedulingConfig,
}

impl Clone for NoOverlap {
    fn clone(&self) -> Self {
        // the precedence registry is a cache recomputable from the tasks; a clone starts empty
        // rather than paying to clone its contents.
        NoOverlap {
            tasks: self.tasks.clone(),
            precedences: LevelZeroPrecedences::new(),
            config: self.config.clone(),
        }
    }
}

impl NoOverlap {
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        NoOverlap {
            tasks: tasks.into_iter().collect(),
            precedences: LevelZeroPrecedences::new(),
            config: SchedulingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulingConfig) -> Self {
        self.config = config;
        self
    }

    fn run_one_direction(&self, helper: &mut TaskHelper, domains: &mut Domains, cause: Cause, direction: Direction) -> Result<(), Contradiction> {
        helper.synchronize_and_set_time_direction(&self.tasks, domains, direction);
        overload::propagate(&self.tasks, helper, domains, cause)?;
        helper.synchronize_and_set_time_direction(&self.tasks, domains, direction);
        detectable_precedences::propagate(&self.tasks, helper, domains, cause)?;
        helper.synchronize_and_set_time_direction(&self.tasks, domains, direction);
        not_last::propagate(&self.tasks, helper, domains, cause)?;
        helper.synchronize_and_set_time_direction(&self.tasks, domains, direction);
        edge_finding::propagate(&self.tasks, helper, domains, cause)?;
        Ok(())
    }
}

impl Propagator for NoOverlap {
    fn setup(&self, id: crate::reasoners::cp::PropagatorId, context: &mut Watches) {
        let mut vars = hashbrown::HashSet::with_capacity(64);
        for t in &self.tasks {
            for v in t.variables() {
                vars.insert(v);
            }
        }
        for var in vars {
            context.add_watch(var, id);
        }
    }

    fn propagate(&self, domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
        let mut helper = TaskHelper::new(self.tasks.len());
        self.run_one_direction(&mut helper, domains, cause, Direction::Forward)?;
        self.run_one_direction(&mut helper, domains, cause, Direction::Backward)?;
        if self.config.use_precedences_in_disjunctive {
            helper.synchronize_and_set_time_direction(&self.tasks, domains, Direction::Forward);
            self.precedences.refresh(&self.tasks, &helper, domains);
        }
        Ok(())
    }

    fn explain(&self, _literal: Lit, state: &crate::core::state::DomainsSnapshot, out_explanation: &mut Explanation) {
        let all: Vec<usize> = (0..self.tasks.len()).collect();
        explain_group_conservatively(&self.tasks, &all, state, out_explanation);
    }

    fn clone_box(&self) -> Box<dyn Propagator> {
        Box::new(self.clone())
    }
}

impl UserPropagator for NoOverlap {
    fn get_propagator(&self) -> DynPropagator {
        DynPropagator::from(self.clone())
    }

    fn satisfied(&self, dom: &Domains) -> bool {
        let itvs = self
            .tasks
            .iter()
            .filter_map(|t| {
                if dom.entails(!t.presence) {
                    None
                } else {
                    Some((dom.lb(t.start), dom.ub(t.end)))
                }
            })
            .collect_vec();
        for (i, (s1, e1)) in itvs.iter().enumerate() {
            for (s2, e2) in &itvs[(i + 1)..] {
                if !(e1 <= s2 || e2 <= s1) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Cause;
    use crate::model::lang::{IAtom, IVar};

    /// Scenario A (spec §8.4): two tasks that can be scheduled in either order shouldn't be
    /// touched.
    #[test]
    fn two_tasks_with_slack_are_left_alone() {
        let mut m = Domains::new();
        let a_start = IVar::new(m.new_var(0, 10));
        let a_size = IVar::new(m.new_var(5, 5));
        let a_end = IVar::new(m.new_var(5, 15));
        let b_start = IVar::new(m.new_var(0, 10));
        let b_size = IVar::new(m.new_var(5, 5));
        let b_end = IVar::new(m.new_var(5, 15));

        let no_overlap = NoOverlap::new([
            Task::new(a_start, a_size, a_end, Lit::TRUE),
            Task::new(b_start, b_size, b_end, Lit::TRUE),
        ]);
        no_overlap.propagate(&mut m, Cause::Decision).unwrap();

        assert_eq!(m.lb(IAtom::from(a_start)), 0);
        assert_eq!(m.lb(IAtom::from(b_start)), 0);
        assert_eq!(m.ub(IAtom::from(a_end)), 15);
        assert_eq!(m.ub(IAtom::from(b_end)), 15);
    }

    /// Scenario B (spec §8.4): with `a.start ∈ [0,3]`/`end ∈ [5,8]` and `b.start ∈ [2,4]`/
    /// `end ∈ [7,9]` (both size 5), the two mandatory parts `[3,5)` and `[4,7)` already overlap,
    /// so no push can save it: both present is a straight conflict.
    #[test]
    fn overlapping_mandatory_parts_conflict_when_both_present() {
        let mut m = Domains::new();
        let a_start = IVar::new(m.new_var(0, 3));
        let a_size = IVar::new(m.new_var(5, 5));
        let a_end = IVar::new(m.new_var(5, 8));
        let b_start = IVar::new(m.new_var(2, 4));
        let b_size = IVar::new(m.new_var(5, 5));
        let b_end = IVar::new(m.new_var(7, 9));

        let no_overlap = NoOverlap::new([
            Task::new(a_start, a_size, a_end, Lit::TRUE),
            Task::new(b_start, b_size, b_end, Lit::TRUE),
        ]);
        assert!(no_overlap.propagate(&mut m, Cause::Decision).is_err());
    }

    /// A variant of scenario B with enough room in `b`'s start-max to absorb the pushed
    /// precedence: here detectable precedences should push `b` after `a`'s mandatory part
    /// instead of conflicting.
    #[test]
    fn detectable_precedence_pushes_the_trailing_task() {
        let mut m = Domains::new();
        let a_start = IVar::new(m.new_var(0, 3));
        let a_size = IVar::new(m.new_var(5, 5));
        let a_end = IVar::new(m.new_var(5, 8));
        let b_start = IVar::new(m.new_var(2, 10));
        let b_size = IVar::new(m.new_var(5, 5));
        let b_end = IVar::new(m.new_var(7, 15));

        let no_overlap = NoOverlap::new([
            Task::new(a_start, a_size, a_end, Lit::TRUE),
            Task::new(b_start, b_size, b_end, Lit::TRUE),
        ]);
        no_overlap.propagate(&mut m, Cause::Decision).unwrap();

        // a's mandatory part [3,5) forces b to start at or after a's end-min.
        assert_eq!(m.lb(IAtom::from(b_start)), 5);
    }

    /// An optional task whose mandatory presence would overload a shared deadline is forced
    /// absent by the overload checker rather than reported as a conflict.
    #[test]
    fn optional_task_causing_overload_is_pushed_absent() {
        let mut m = Domains::new();
        let a_start = IVar::new(m.new_var(0, 0));
        let a_size = IVar::new(m.new_var(5, 5));
        let a_end = IVar::new(m.new_var(5, 5));
        let b_start = IVar::new(m.new_var(0, 0));
        let b_size = IVar::new(m.new_var(5, 5));
        let b_end = IVar::new(m.new_var(5, 5));
        let b_presence = Lit::geq(m.new_var(0, 1), 1);

        let no_overlap = NoOverlap::new([
            Task::new(a_start, a_size, a_end, Lit::TRUE),
            Task::new(b_start, b_size, b_end, b_presence),
        ]);
        no_overlap.propagate(&mut m, Cause::Decision).unwrap();

        assert!(m.entails(!b_presence), "the conflicting optional task should have been forced absent");
    }
}
