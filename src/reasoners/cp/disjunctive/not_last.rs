//! Not-last (spec §4.6): detects that a task cannot be the last one scheduled among a set of
//! tasks that must not overlap, and tightens its deadline accordingly.
//!
//! For task `j`, restrict attention to the tasks `i` that are forced to start early enough that
//! they *could* need to run before `j`'s current deadline (`start_max(i) < end_max(j)`); if even
//! those, packed back-to-back, finish after `j`'s latest permissible start, `j` cannot possibly be
//! scheduled after all of them — some other task must come after `j`, so `j`'s deadline can be
//! tightened down to the latest `start_max` among the tasks that could still follow it.
//!
//! Grounded on `CombinedNotLast`/`DisjunctiveNotLast` in `ortools/sat/disjunctive.cc`: the
//! membership filter (`start_max(i) < end_max(j)`) and the trigger comparison (against
//! `start_max(j)`, not `end_max(j)`) are two distinct thresholds — conflating them (or skipping
//! the filter) lets tasks that are free to run after `j` inflate the packed-left estimate and
//! either miss or over-tighten the push.

use crate::core::state::{Cause, Domains};
use crate::reasoners::cp::scheduling::{Task, TaskHelper, TaskSet, TaskSetEntry};
use crate::reasoners::Contradiction;

pub fn propagate(tasks: &[Task], helper: &TaskHelper, domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
    let n = helper.num_tasks();
    // Only entailed-present tasks contribute mandatory mass to the packed-left set: an
    // unknown-presence task has no guaranteed footprint. The outer sweep (`j`, the task whose
    // deadline may get tightened) only excludes entailed-absent tasks, matching the grounding
    // source's "works as well when IsPresent(t) is false" note (see `detectable_precedences.rs`).
    let mut present: Vec<usize> = (0..n).filter(|&t| domains.entails(tasks[t].presence)).collect();
    present.sort_by_key(|&t| helper.bounds(t).start_max);
    let mut candidates: Vec<usize> = (0..n).filter(|&t| !domains.entails(!tasks[t].presence)).collect();
    candidates.sort_by_key(|&t| helper.bounds(t).end_max);

    let mut theta = TaskSet::new();
    let mut start_max_ptr = 0;

    for &j in &candidates {
        let end_max_j = helper.bounds(j).end_max;
        while start_max_ptr < present.len() {
            let i = present[start_max_ptr];
            let bi = helper.bounds(i);
            if bi.start_max < end_max_j {
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
        let start_max_j = helper.bounds(j).start_max;
        if theta.compute_end_min_ignoring(j) <= start_max_j {
            continue; // j could still be scheduled last: nothing to deduce
        }
        let new_end_max = theta
            .iter()
            .filter(|e| e.task != j)
            .map(|e| helper.bounds(e.task).start_max)
            .max();
        if let Some(new_end_max) = new_end_max {
            if new_end_max < end_max_j {
                helper
                    .decrease_end_max(tasks, j, new_end_max, domains, cause)
                    .map_err(Contradiction::from)?;
            }
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

    /// A task flexible enough to run well after `j`'s deadline must not be forced into `j`'s
    /// critical block just because it happens to have an early `start_min`: regression test for
    /// an earlier version that built the packed-left set from every present task unconditionally.
    #[test]
    fn a_flexible_decoy_does_not_force_a_push() {
        let mut m = Domains::new();
        // j: must finish by 5 at the latest.
        let j = present_task(&mut m, (0, 2), 3, (3, 5));
        // decoy: free to start anywhere in [0,20], so it is not forced to precede j
        // (start_max(decoy) = 20 is not < end_max(j) = 5) even though its start_min is 0.
        let decoy = present_task(&mut m, (0, 20), 3, (3, 23));
        let tasks = [j, decoy];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        propagate(&tasks, &helper, &mut m, Cause::Decision).unwrap();

        assert_eq!(m.ub(IAtom::from(j.end)), 5, "a flexible decoy must not tighten j's deadline");
    }

    /// `ct`'s mandatory part `[4,10)` leaves `j` no room to be scheduled after it within `j`'s own
    /// `start_max` (8 < 10): `j` must finish by `ct`'s `start_max` instead, so its deadline is
    /// pulled down to 4. `ct` itself is untouched: ignoring `ct`, `j`'s own contribution packs to
    /// `start_min + size_min = 4`, which does not exceed `ct`'s `start_max` of 4.
    #[test]
    fn forced_predecessor_tightens_end_max() {
        let mut m = Domains::new();
        let ct = present_task(&mut m, (0, 4), 10, (10, 10));
        let j = present_task(&mut m, (0, 8), 4, (4, 1000));
        let tasks = [ct, j];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        propagate(&tasks, &helper, &mut m, Cause::Decision).unwrap();

        assert_eq!(m.ub(IAtom::from(j.end)), 4, "j's end-max should be pulled down to ct's start-max (4)");
        assert_eq!(m.ub(IAtom::from(ct.end)), 10, "ct has a single fixed end and must not be touched");
    }
}
