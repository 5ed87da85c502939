//! Edge finding (spec §4.7): the strongest (and most expensive) of the disjunctive propagators.
//!
//! Processes (entailed-present) tasks in decreasing deadline order, moving each one out of the
//! theta (mandatory) set and into the lambda (optional) set in turn: once a task `j` is in
//! lambda, the tree's optional envelope captures "what if `j` were scheduled after everything with
//! a smaller deadline than it". Before moving `j`, a plain theta-envelope overload check against
//! `j`'s own deadline catches the case where the still-mandatory tasks alone cannot fit. Whenever
//! the lambda hypothesis exceeds `j`'s deadline, *some* task really cannot start before the theta
//! mass that caused the excess — that task's start-min gets pushed forward to the envelope value
//! responsible, and the loop repeats since extracting it may reveal another. Events are keyed by
//! `shifted_start_min`, as spec §4.7 prescribes (consistent with the overload checker, §4.4).
//!
//! Tasks with unknown presence are seeded as lambda events from the start (never theta): they can
//! still be the one pushed, just like any other gray task, but never contribute guaranteed mass.
//!
//! Grounded on `EdgeFinding` in `ortools/sat/disjunctive.cc`.

use crate::core::state::{Cause, Domains, Explanation};
use crate::reasoners::cp::scheduling::{Task, TaskHelper, ThetaLambdaTree};
use crate::reasoners::Contradiction;

pub fn propagate(tasks: &[Task], helper: &TaskHelper, domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
    let n = helper.num_tasks();
    // Only entailed-absent tasks are excluded entirely (per `disjunctive.cc`'s edge finder, which
    // only skips `IsAbsent` tasks): an unknown-presence task still belongs in the tree, just as an
    // optional (lambda) event from the start, since it can never be part of the guaranteed
    // (theta) mass but may still be the task whose start-min gets pushed.
    let mut order: Vec<usize> = (0..n).filter(|&t| !domains.entails(!tasks[t].presence)).collect();
    order.sort_by_key(|&t| helper.bounds(t).end_max);

    // Candidates to move from theta into lambda (gray), in increasing end_max order: only
    // entailed-present tasks start out in theta, so only they can be "grayed".
    let present_positions: Vec<usize> = (0..order.len())
        .filter(|&i| domains.entails(tasks[order[i]].presence))
        .collect();
    if present_positions.len() < 2 {
        return Ok(());
    }

    let mut tree = ThetaLambdaTree::new(order.len());
    for (leaf, &t) in order.iter().enumerate() {
        let b = helper.bounds(t);
        if domains.entails(tasks[t].presence) {
            tree.add_or_update_event(leaf, b.shifted_start_min(), b.size_min, b.size_min);
        } else {
            tree.add_or_update_optional_event(leaf, b.shifted_start_min(), b.size_min);
        }
    }

    for &idx in present_positions.iter().rev() {
        let j = order[idx];
        let deadline_j = helper.bounds(j).end_max;

        if tree.get_envelope() > deadline_j {
            let mut explanation = Explanation::with_capacity(order.len() * 3);
            for &t in order.iter().take(idx + 1) {
                if domains.entails(tasks[t].presence) {
                    let b = helper.bounds(t);
                    explanation.push(tasks[t].presence);
                    explanation.push(tasks[t].start.ge_lit(b.start_min));
                    explanation.push(tasks[t].size.ge_lit(b.size_min));
                    explanation.push(tasks[t].end.le_lit(std::cmp::max(b.end_max, deadline_j)));
                }
            }
            return Err(Contradiction::Explanation(explanation));
        }

        while tree.get_optional_envelope() > deadline_j {
            let (critical_leaf, opt_leaf, _available) = tree.get_events_with_optional_envelope_greater_than(deadline_j);
            let k = order[opt_leaf];
            if domains.entails(!tasks[k].presence) {
                tree.remove_event(opt_leaf);
                continue;
            }
            let new_start_min = tree.get_envelope_of(critical_leaf);
            if new_start_min > helper.bounds(k).start_min {
                helper
                    .increase_start_min(tasks, k, new_start_min, domains, cause)
                    .map_err(Contradiction::from)?;
            }
            tree.remove_event(opt_leaf);
        }

        // `j` becomes gray for the remaining (smaller-deadline) iterations.
        let bj = helper.bounds(j);
        tree.add_or_update_optional_event(idx, bj.shifted_start_min(), bj.size_min);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IntCst, Lit};
    use crate::model::lang::{IAtom, IVar};
    use crate::reasoners::cp::scheduling::Direction;

    fn task(m: &mut Domains, start: (IntCst, IntCst), size: IntCst, end: (IntCst, IntCst)) -> Task {
        let s = IVar::new(m.new_var(start.0, start.1));
        let sz = IVar::new(m.new_var(size, size));
        let e = IVar::new(m.new_var(end.0, end.1));
        Task::new(s, sz, e, Lit::TRUE)
    }

    /// Neither `t0` (size 3) nor `t1` (size 4) alone conflicts with `t2`'s tight deadline of 4,
    /// but if `t1` were to start at its current earliest time (0), the combined mass of `t1` and
    /// `t2` (sizes 4 and 2) packed from time 0 would reach 6, past `t2`'s deadline: `t1` must
    /// start after `t2`'s own envelope of 2. `t0` is uninvolved and left untouched. This is the
    /// kind of push detectable precedences/not-last cannot make: it requires reasoning about the
    /// combined size of two tasks together, not a single pairwise precedence.
    #[test]
    fn combined_mass_of_two_tasks_pushes_the_largest_deadline_one() {
        let mut m = Domains::new();
        let t0 = task(&mut m, (0, 10), 3, (3, 10));
        let t1 = task(&mut m, (0, 10), 4, (4, 10));
        let t2 = task(&mut m, (0, 10), 2, (2, 4));
        let tasks = [t0, t1, t2];

        let mut helper = TaskHelper::new(3);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        propagate(&tasks, &helper, &mut m, Cause::Decision).unwrap();

        assert_eq!(m.lb(IAtom::from(t1.start)), 2, "t1 must be pushed past t2's envelope");
        assert_eq!(m.lb(IAtom::from(t0.start)), 0, "t0 is not part of the overload and must be untouched");
        assert_eq!(m.lb(IAtom::from(t2.start)), 0, "t2 itself has enough room and is untouched");
    }

    /// Two tasks whose mandatory parts already overlap are reported as a conflict even though
    /// neither pairwise precedence check alone would see both at once.
    #[test]
    fn overlapping_mandatory_parts_conflict() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 0), 5, (5, 5));
        let b = task(&mut m, (0, 0), 5, (5, 5));
        let tasks = [a, b];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        assert!(propagate(&tasks, &helper, &mut m, Cause::Decision).is_err());
    }
}
