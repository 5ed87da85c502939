//! Detectable precedences (spec §4.5): for each task `j`, finds every task `i` whose mandatory
//! part is guaranteed to start early enough that, combined with the no-overlap requirement, `i`
//! must finish before `j` can start — then pushes `start_min(j)` to the packed-left end-min of
//! that detected set.
//!
//! Grounded on `DetectablePrecedences`/`DisjunctivePrecedences` in `ortools/sat/disjunctive.cc`:
//! tasks are swept in increasing `end_min` order (the task that may get pushed, `j`), while a
//! second pointer walks tasks in increasing `start_max` order, feeding a [TaskSet] with every task
//! `i` whose `start_max` is strictly below the current `j`'s `end_min` (spec §4.5's
//! `start_max(i) < end_min(j)` condition) — the textbook two-pointer formulation of Vilim's
//! detectable-precedences test. Both pointers are shared across the whole sweep (amortized
//! `O(n log n)`): since `end_min(j)` only grows as `j` advances, a task once eligible for some `j`
//! stays eligible for every later one.
//!
//! `j` itself may transiently satisfy the membership condition against its own `end_min` (when it
//! has a mandatory part); [TaskSet::compute_end_min_ignoring] discounts `j`'s own entry rather
//! than special-casing it out of the sweep, so it is harmless to add to `theta` unconditionally.

use crate::core::state::{Cause, Domains};
use crate::reasoners::cp::scheduling::{Task, TaskHelper, TaskSet, TaskSetEntry};
use crate::reasoners::Contradiction;

pub fn propagate(tasks: &[Task], helper: &TaskHelper, domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
    let n = helper.num_tasks();

    // Only entailed-present tasks contribute mandatory mass to the theta set: an unknown-presence
    // task has no guaranteed footprint to pack against. The outer sweep (`by_end_min`, the task
    // that may get pushed) is not restricted this way: per `disjunctive.cc`'s
    // `DisjunctiveDetectablePrecedences::Push` ("this works as well when IsPresent(t) is false"),
    // a task with unknown presence can still be pushed — only entailed-absent tasks are excluded.
    let mut by_start_max: Vec<usize> = (0..n).filter(|&t| domains.entails(tasks[t].presence)).collect();
    by_start_max.sort_by_key(|&t| helper.bounds(t).start_max);
    let mut by_end_min: Vec<usize> = (0..n).filter(|&t| !domains.entails(!tasks[t].presence)).collect();
    by_end_min.sort_by_key(|&t| helper.bounds(t).end_min);

    let mut theta = TaskSet::new();
    let mut start_max_ptr = 0;

    for &j in &by_end_min {
        let end_min_j = helper.bounds(j).end_min;
        while start_max_ptr < by_start_max.len() {
            let i = by_start_max[start_max_ptr];
            let bi = helper.bounds(i);
            if bi.start_max < end_min_j {
                theta.add_entry(TaskSetEntry {
                    task: i,
                    start_min: bi.start_min,
                    size_min: bi.size_min,
                });
                start_max_ptr += 1;
            } else {
                break;
            }
        }
        let new_min = theta.compute_end_min_ignoring(j);
        if new_min > helper.bounds(j).start_min {
            helper
                .increase_start_min(tasks, j, new_min, domains, cause)
                .map_err(Contradiction::from)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IntCst, Lit};
    use crate::model::lang::{IAtom, IVar};
    use crate::reasoners::cp::scheduling::Direction;

    fn present_task(m: &mut Domains, start: (IntCst, IntCst), size: IntCst, end: (IntCst, IntCst)) -> Task {
        let s = IVar::new(m.new_var(start.0, start.1));
        let sz = IVar::new(m.new_var(size, size));
        let e = IVar::new(m.new_var(end.0, end.1));
        Task::new(s, sz, e, Lit::TRUE)
    }

    /// Two tasks with enough slack that either order remains possible must not be pushed (spec
    /// §8.4 scenario A) — regression test for an earlier version of this sweep that spuriously
    /// added every task satisfying `est + size <= lst` instead of `start_max < end_min`.
    #[test]
    fn symmetric_slack_tasks_are_left_alone() {
        let mut m = Domains::new();
        let a = present_task(&mut m, (0, 10), 5, (5, 15));
        let b = present_task(&mut m, (0, 10), 5, (5, 15));
        let tasks = [a, b];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        propagate(&tasks, &helper, &mut m, Cause::Decision).unwrap();

        assert_eq!(m.lb(IAtom::from(a.start)), 0);
        assert_eq!(m.lb(IAtom::from(b.start)), 0);
    }

    /// `a`'s mandatory part `[3,5)` forces `b` to start no earlier than `a`'s end-min, since
    /// `start_max(a) = 3 < end_min(b) = 7`.
    #[test]
    fn mandatory_part_pushes_the_following_task() {
        let mut m = Domains::new();
        let a = present_task(&mut m, (0, 3), 5, (5, 8));
        let b = present_task(&mut m, (2, 10), 5, (7, 15));
        let tasks = [a, b];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        propagate(&tasks, &helper, &mut m, Cause::Decision).unwrap();

        assert_eq!(m.lb(IAtom::from(b.start)), 5);
        assert_eq!(m.lb(IAtom::from(a.start)), 0);
    }

    /// When both tasks' mandatory parts already overlap, no push can resolve it: the attempted
    /// push collapses a domain and is reported as a conflict.
    #[test]
    fn overlapping_mandatory_parts_conflict() {
        let mut m = Domains::new();
        let a = present_task(&mut m, (0, 3), 5, (5, 8));
        let b = present_task(&mut m, (2, 4), 5, (7, 9));
        let tasks = [a, b];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        assert!(propagate(&tasks, &helper, &mut m, Cause::Decision).is_err());
    }
}
