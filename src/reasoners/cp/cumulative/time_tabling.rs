//! Time-tabling-per-task (spec §4.9): builds the profile of resource usage that is mandatory no
//! matter how the remaining flexibility in each task's start time is resolved, then checks every
//! task against that profile, pushing its bounds away from any point where squeezing it in would
//! overflow the capacity.
//!
//! Grounded on `TimeTablingPerTask` in `ortools/sat/timetable.cc`: a task contributes a
//! "mandatory part" `[start_max, end_min)` to the profile whenever that range is non-empty (i.e.
//! it cannot avoid occupying the resource there), the profile is built as a sorted sweep of
//! `+demand`/`-demand` events, and a task whose *flexible* range intersects a profile segment
//! whose usage plus the task's own demand would exceed capacity gets pushed past it.

use crate::core::state::{Cause, Domains};
use crate::core::IntCst;
use crate::reasoners::cp::scheduling::{DemandHelper, Task, TaskHelper};
use crate::reasoners::Contradiction;

/// One maximal interval of constant mandatory usage.
#[derive(Copy, Clone, Debug)]
struct Segment {
    start: IntCst,
    end: IntCst,
    usage: IntCst,
}

fn build_profile(tasks: &[Task], helper: &TaskHelper, demands: &[DemandHelper], domains: &Domains) -> Vec<Segment> {
    let mut events: Vec<(IntCst, IntCst)> = Vec::new(); // (time, signed delta)
    for (t, _) in tasks.iter().enumerate() {
        if domains.entails(!tasks[t].presence) {
            continue;
        }
        let b = helper.bounds(t);
        if b.start_max < b.end_min {
            let demand_min = demands[t].demand_min(domains);
            if demand_min > 0 {
                events.push((b.start_max, demand_min));
                events.push((b.end_min, -demand_min));
            }
        }
    }
    events.sort_by_key(|&(time, _)| time);

    let mut segments = Vec::new();
    let mut usage = 0;
    let mut idx = 0;
    let mut prev_time: Option<IntCst> = None;
    while idx < events.len() {
        let time = events[idx].0;
        if let Some(prev) = prev_time {
            if usage > 0 && prev < time {
                segments.push(Segment { start: prev, end: time, usage });
            }
        }
        while idx < events.len() && events[idx].0 == time {
            usage += events[idx].1;
            idx += 1;
        }
        prev_time = Some(time);
    }
    segments
}

/// Checks `t` against the profile built from every *other* task. `segments` was built from every
/// present task's mandatory part including `t`'s own (if it has one); since `t` can never
/// conflict with itself, its own contribution to any overlapping segment is subtracted back out
/// before comparing against `capacity - demand_min(t)` (`TimeTablingPerTask` in `timetable.cc`).
fn propagate_task(
    tasks: &[Task],
    helper: &TaskHelper,
    demands: &[DemandHelper],
    capacity: IntCst,
    segments: &[Segment],
    t: usize,
    domains: &mut Domains,
    cause: Cause,
) -> Result<(), Contradiction> {
    if domains.entails(!tasks[t].presence) {
        return Ok(());
    }
    let b = helper.bounds(t);
    let demand_min = demands[t].demand_min(domains);
    if demand_min == 0 || b.size_min == 0 {
        return Ok(());
    }
    let available = capacity - demand_min;
    let own_mandatory_part = (b.start_max < b.end_min).then_some((b.start_max, b.end_min));

    for seg in segments {
        if seg.end <= b.start_min || seg.start >= b.end_max {
            continue;
        }
        let own_contribution = match own_mandatory_part {
            Some((own_start, own_end)) if own_start < seg.end && seg.start < own_end => demand_min,
            _ => 0,
        };
        let other_usage = seg.usage - own_contribution;
        if other_usage <= available {
            continue; // t fits alongside this segment
        }
        // t cannot overlap this segment at all: push it entirely before or entirely after.
        let before_gap = seg.start - b.start_min;
        let after_gap = b.end_max - seg.end;
        if before_gap >= b.size_min && before_gap >= after_gap {
            helper
                .decrease_end_max(tasks, t, seg.start, domains, cause)
                .map_err(Contradiction::from)?;
        } else if after_gap >= b.size_min {
            helper
                .increase_start_min(tasks, t, seg.end, domains, cause)
                .map_err(Contradiction::from)?;
        } else {
            // neither side has room: no placement is possible regardless of the rest of the
            // search, so the task (if optional) must be absent, or the instance is infeasible.
            helper
                .push_task_absence(tasks, t, domains, cause)
                .map_err(Contradiction::from)?;
        }
    }
    Ok(())
}

pub fn propagate(
    tasks: &[Task],
    helper: &TaskHelper,
    demands: &[DemandHelper],
    capacity: IntCst,
    domains: &mut Domains,
    cause: Cause,
) -> Result<(), Contradiction> {
    let segments = build_profile(tasks, helper, demands, domains);
    if segments.is_empty() {
        return Ok(());
    }
    for t in 0..helper.num_tasks() {
        propagate_task(tasks, helper, demands, capacity, &segments, t, domains, cause)?;
    }
    Ok(())
}
