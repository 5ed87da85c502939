//! Cumulative energy / overload checking (spec §4.10): a capacity-aware generalization of the
//! disjunctive overload checker. Instead of asking "do these tasks fit on one machine", it asks
//! "does the total mandatory energy of these tasks, restricted to some time window, exceed what
//! the resource can deliver over that window".
//!
//! Uses the classical `O(n^2)` formulation over candidate windows bounded by task `start_min`s and
//! `end_max`s (every tight window has both endpoints at such a bound), rather than the
//! theta-tree-based `O(n log n)` sweep: simpler to get right, and `n` is the number of tasks on
//! one resource, not the instance size. Optionally strengthened by one dual-feasible function
//! (spec §4.13's `f0`) when [conservative scale](CumulativeEnergyConfig) is enabled, following the
//! "conservative scale" extension in `ortools/sat/cumulative_energy.cc`.

use crate::core::state::{Cause, Domains, Explanation};
use crate::core::IntCst;
use crate::reasoners::cp::scheduling::{DemandHelper, Task, TaskHelper};
use crate::reasoners::Contradiction;

fn window_energy_min(
    tasks: &[Task],
    helper: &TaskHelper,
    demands: &[DemandHelper],
    domains: &Domains,
    lo: IntCst,
    hi: IntCst,
) -> (IntCst, Vec<usize>) {
    let mut total = 0;
    let mut contributors = Vec::new();
    for t in 0..helper.num_tasks() {
        if domains.entails(!tasks[t].presence) {
            continue;
        }
        let b = helper.bounds(t);
        let overlap_lo = std::cmp::max(lo, b.start_max);
        let overlap_hi = std::cmp::min(hi, b.end_min);
        if overlap_hi > overlap_lo {
            let demand_min = demands[t].demand_min(domains);
            total += demand_min * (overlap_hi - overlap_lo);
            contributors.push(t);
        }
    }
    (total, contributors)
}

/// Applies the dual-feasible function `f0(u, C) = ceil(u*k/C)` to every contributor's demand
/// before re-summing, which can reveal an overload that a direct area comparison misses when
/// several tasks each use a little more than a clean fraction of the capacity (spec §4.13).
fn conservative_scale_violation(
    demands_at_window: &[(IntCst, IntCst)], // (demand_min, duration_in_window)
    capacity: IntCst,
    window_len: IntCst,
    ks: &[i64],
) -> bool {
    for &k in ks {
        if k <= 0 {
            continue;
        }
        let mut scaled_total: i64 = 0;
        for &(d, dur) in demands_at_window {
            let u = d as i64;
            let scaled = (u * k + capacity as i64 - 1) / capacity as i64; // ceil(u*k/C)
            scaled_total += scaled * dur as i64;
        }
        // f0(C, C) = ceil(C*k/C) = k, so the scaled capacity over the window is `k * window_len`,
        // not `k * capacity`: the latter under-scales by a factor of `window_len / capacity` and
        // fires on windows whose plain area already fits (f0 must preserve feasibility, spec §7).
        if scaled_total > (k as i64) * (window_len as i64) {
            return true;
        }
    }
    false
}

pub fn propagate(
    tasks: &[Task],
    helper: &TaskHelper,
    demands: &[DemandHelper],
    capacity: IntCst,
    use_conservative_scale: bool,
    domains: &mut Domains,
    cause: Cause,
) -> Result<(), Contradiction> {
    // This layer only ever reports a conflict: unlike the theta-lambda formulation in spec §4.10,
    // the `O(n^2)` window scan here has no optional envelope to extract an energy-max push from,
    // so `cause` is unused (no push is ever made). Narrower than the spec in that one respect.
    let _ = cause;
    let n = helper.num_tasks();
    let mut times: Vec<IntCst> = Vec::with_capacity(2 * n);
    for t in 0..n {
        if domains.entails(!tasks[t].presence) {
            continue;
        }
        let b = helper.bounds(t);
        times.push(b.start_min);
        times.push(b.end_max);
    }
    times.sort_unstable();
    times.dedup();

    for (i, &lo) in times.iter().enumerate() {
        for &hi in &times[i + 1..] {
            let (energy, contributors) = window_energy_min(tasks, helper, demands, domains, lo, hi);
            let window_capacity = capacity.saturating_mul(hi - lo);
            let overloaded = energy > window_capacity
                || (use_conservative_scale && {
                    let per_task: Vec<(IntCst, IntCst)> = contributors
                        .iter()
                        .map(|&t| {
                            let b = helper.bounds(t);
                            let ov_lo = std::cmp::max(lo, b.start_max);
                            let ov_hi = std::cmp::min(hi, b.end_min);
                            (demands[t].demand_min(domains), (ov_hi - ov_lo).max(0))
                        })
                        .collect();
                    conservative_scale_violation(&per_task, capacity, hi - lo, &[2, 3, 4, 5, 8])
                });
            if overloaded {
                let mut explanation = Explanation::with_capacity(contributors.len() * 3);
                for &t in &contributors {
                    let b = helper.bounds(t);
                    explanation.push(tasks[t].presence);
                    explanation.push(tasks[t].start.le_lit(b.start_max));
                    explanation.push(tasks[t].end.ge_lit(b.end_min));
                }
                return Err(Contradiction::Explanation(explanation));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Cause;
    use crate::core::Lit;
    use crate::model::lang::IVar;
    use crate::reasoners::cp::scheduling::{Direction, TaskHelper};

    fn task(m: &mut Domains, start: (IntCst, IntCst), size: IntCst, end: (IntCst, IntCst)) -> Task {
        let s = IVar::new(m.new_var(start.0, start.1));
        let sz = IVar::new(m.new_var(size, size));
        let e = IVar::new(m.new_var(end.0, end.1));
        Task::new(s, sz, e, Lit::TRUE)
    }

    /// Two fully mandatory tasks of demand 2 over `[0,5)` on a resource of capacity 3: the window
    /// `[0,5)` alone has energy `20` against a capacity of `15`.
    #[test]
    fn overlapping_mandatory_energy_exceeds_capacity() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 0), 5, (5, 5));
        let b = task(&mut m, (0, 0), 5, (5, 5));
        let tasks = [a, b];
        let demands = [DemandHelper::constant(2), DemandHelper::constant(2)];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        assert!(propagate(&tasks, &helper, &demands, 3, true, &mut m, Cause::Decision).is_err());
    }

    /// The same two tasks at demand 1 each fit exactly within capacity 2.
    #[test]
    fn mandatory_energy_within_capacity_is_not_a_conflict() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 0), 5, (5, 5));
        let b = task(&mut m, (0, 0), 5, (5, 5));
        let tasks = [a, b];
        let demands = [DemandHelper::constant(1), DemandHelper::constant(1)];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        assert!(propagate(&tasks, &helper, &demands, 2, true, &mut m, Cause::Decision).is_ok());
    }

    /// Tasks with enough slack not to share any mandatory window are left alone regardless of
    /// demand.
    #[test]
    fn tasks_without_a_shared_mandatory_window_are_left_alone() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 10), 5, (5, 15));
        let b = task(&mut m, (0, 10), 5, (5, 15));
        let tasks = [a, b];
        let demands = [DemandHelper::constant(3), DemandHelper::constant(3)];

        let mut helper = TaskHelper::new(2);
        helper.synchronize_and_set_time_direction(&tasks, &m, Direction::Forward);
        assert!(propagate(&tasks, &helper, &demands, 3, true, &mut m, Cause::Decision).is_ok());
    }
}
