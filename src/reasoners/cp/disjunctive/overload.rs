//! Overload checker for the disjunctive (unary) resource (spec §4.4).
//!
//! Detects that a set of tasks cannot all fit on the resource, even ignoring their relative
//! order, by scanning them in order of increasing deadline (`end_max`) and maintaining a
//! theta-lambda tree keyed by `shifted_start_min` (spec §4.4, which accounts for minimum energy
//! footprint even when `start_min` trails `end_min - size_min`): a present task raises the
//! `envelope` (mandatory end-min if everything seen so far were packed back-to-back); an optional
//! task is inserted into the lambda set only, and is pushed absent the moment `envelope_opt` shows
//! that *its* presence would blow the deadline of whichever task is currently the latest one
//! processed.
//!
//! Grounded on `DisjunctiveOverloadChecker::Propagate` in `ortools/sat/disjunctive.cc`.

use crate::core::state::{Cause, Domains, Explanation};
use crate::reasoners::cp::scheduling::{windows, Task, TaskHelper, ThetaLambdaTree};
use crate::reasoners::Contradiction;

/// Runs the overload checker over one window (a set of task indices known not to interact with
/// anything outside it). Either detects an unconditional overload (returned as a contradiction)
/// or pushes at most one optional task absent per call (the caller's fixpoint loop re-enters on
/// the next propagation round to find further pushes).
fn propagate_window(
    tasks: &[Task],
    helper: &TaskHelper,
    window: &[usize],
    domains: &mut Domains,
    cause: Cause,
) -> Result<(), Contradiction> {
    let mut order: Vec<usize> = window.to_vec();
    order.sort_by_key(|&t| helper.bounds(t).end_max);

    let mut tree = ThetaLambdaTree::new(order.len());
    let mut leaf_task: Vec<usize> = Vec::with_capacity(order.len());

    for &t in &order {
        let b = *helper.bounds(t);
        let deadline = b.end_max;
        let present = domains.entails(tasks[t].presence);
        let maybe_present = !domains.entails(!tasks[t].presence);
        if !present && !maybe_present {
            continue;
        }

        let leaf = leaf_task.len();
        leaf_task.push(t);
        if present {
            tree.add_or_update_event(leaf, b.shifted_start_min(), b.size_min, b.size_min);
        } else {
            tree.add_or_update_optional_event(leaf, b.shifted_start_min(), b.size_min);
        }

        if tree.get_envelope() > deadline {
            let mut explanation = Explanation::with_capacity(leaf_task.len() * 3);
            for &tt in &leaf_task {
                if domains.entails(tasks[tt].presence) {
                    let bb = helper.bounds(tt);
                    explanation.push(tasks[tt].presence);
                    explanation.push(tasks[tt].start.ge_lit(bb.start_min));
                    explanation.push(tasks[tt].size.ge_lit(bb.size_min));
                    explanation.push(tasks[tt].end.le_lit(std::cmp::max(bb.end_max, deadline)));
                }
            }
            return Err(Contradiction::Explanation(explanation));
        }

        if tree.get_optional_envelope() > deadline {
            let (_critical, optional_leaf, _available) =
                tree.get_events_with_optional_envelope_greater_than(deadline);
            let optional_task = leaf_task[optional_leaf];
            debug_assert!(!domains.entails(tasks[optional_task].presence));
            tree.remove_event(optional_leaf);
            helper
                .push_task_absence(tasks, optional_task, domains, cause)
                .map_err(Contradiction::from)?;
        }
    }
    Ok(())
}

/// Runs the overload checker over the whole instance, splitting it into independent windows
/// first (spec §4.4's window-splitting optimization).
pub fn propagate(tasks: &[Task], helper: &TaskHelper, domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
    let bounds: Vec<_> = (0..helper.num_tasks()).map(|t| *helper.bounds(t)).collect();
    for window in windows::split_into_windows(&bounds) {
        if window.len() < 2 {
            continue;
        }
        propagate_window(tasks, helper, &window, domains, cause)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IntCst, Lit};
    use crate::model::lang::IVar;
    use crate::reasoners::cp::scheduling::Direction;

    fn task(m: &mut Domains, start: (IntCst, IntCst), size: IntCst, end: (IntCst, IntCst), presence: Lit) -> Task {
        let s = IVar::new(m.new_var(start.0, start.1));
        let sz = IVar::new(m.new_var(size, size));
        let e = IVar::new(m.new_var(end.0, end.1));
        Task::new(s, sz, e, presence)
    }

    /// Two fixed tasks that both need `[0,5)` cannot possibly both fit before the shared
    /// deadline of 5: the envelope (0+5+5=10) blows past it unconditionally.
    #[test]
    fn two_tasks_whose_mandatory_parts_overload_the_deadline_conflict() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 0), 5, (5, 5), Lit::TRUE);
        let b = task(&mut m, (0, 0), 5, (5, 5), Lit::TRUE);
        let tasks = [a, b];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        assert!(propagate(&tasks, &helper, &mut m, Cause::Decision).is_err());
    }

    /// With `b`'s presence unknown, the overload is avoidable by forcing `b` absent rather than
    /// reported as an unconditional conflict.
    #[test]
    fn optional_task_is_pushed_absent_before_overload() {
        let mut m = Domains::new();
        let b_presence = Lit::geq(m.new_var(0, 1), 1);
        let a = task(&mut m, (0, 0), 5, (5, 5), Lit::TRUE);
        let b = task(&mut m, (0, 0), 5, (5, 5), b_presence);
        let tasks = [a, b];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        propagate(&tasks, &helper, &mut m, Cause::Decision).unwrap();

        assert!(m.entails(!b_presence));
    }

    /// Two tasks with enough combined slack to both fit before their deadlines are left alone.
    #[test]
    fn tasks_with_slack_do_not_overload() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 10), 5, (5, 15), Lit::TRUE);
        let b = task(&mut m, (0, 10), 5, (5, 15), Lit::TRUE);
        let tasks = [a, b];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        propagate(&tasks, &helper, &mut m, Cause::Decision).unwrap();
    }
}
