//! Reservoir time-tabling (spec §4.11): a set of timestamped level changes that must keep a
//! running sum ("level") inside `[min_level, max_level]` at every instant.
//!
//! Events are not tasks — each is a single instant `time_i` with a (possibly variable) `delta_i`
//! and an optional presence literal — so this family doesn't route through [Task]/[TaskHelper] at
//! all. `delta` is an [AffineExpr] rather than a plain [IAtom] so it can be negated wholesale when
//! mirroring (an [IAtom] is restricted to coefficient `1`). [Reservoir] builds the profile
//! directly from [ReservoirEvent]s, following the "mirror a max-bound propagator into a min-bound
//! one" shape the teacher already uses for the disjunctive family's forward/backward split,
//! generalized here to mirroring the whole event stream (negate every delta and the level bound)
//! rather than just a time direction.

use crate::core::state::{Cause, Domains, DomainsSnapshot, Explanation};
use crate::core::{IntCst, Lit, VarRef};
use crate::model::lang::IAtom;
use crate::reasoners::cp::scheduling::{snapshot_lb, snapshot_ub, AffineExpr};
use crate::reasoners::cp::{DynPropagator, Propagator, PropagatorId, UserPropagator, Watches};
use crate::reasoners::Contradiction;

/// One level-changing event: at `time`, the level changes by `delta` if `presence` holds.
#[derive(Copy, Clone, Debug)]
pub struct ReservoirEvent {
    pub time: IAtom,
    pub delta: AffineExpr,
    pub presence: Lit,
}

impl ReservoirEvent {
    pub fn new(time: impl Into<IAtom>, delta: impl Into<AffineExpr>, presence: Lit) -> Self {
        ReservoirEvent {
            time: time.into(),
            delta: delta.into(),
            presence,
        }
    }

    fn mirrored(&self) -> ReservoirEvent {
        ReservoirEvent {
            time: self.time,
            delta: self.delta.negated(),
            presence: self.presence,
        }
    }
}

struct EventBounds {
    time_min: IntCst,
    time_max: IntCst,
    delta_min: IntCst,
}

fn event_bounds(e: &ReservoirEvent, domains: &Domains) -> EventBounds {
    EventBounds {
        time_min: domains.lb(e.time),
        time_max: domains.ub(e.time),
        delta_min: e.delta.lb(domains),
    }
}

/// One maximal interval of constant mandatory level, relative to the initial level.
#[derive(Copy, Clone, Debug)]
struct Segment {
    start: IntCst,
    end: IntCst,
    level: IntCst,
}

/// Builds the minimum-possible level profile (spec §4.11 step 1-2): an event with positive
/// `delta_min` contributes only if present, counted as happening no earlier than `time_max`
/// (the latest it could still be delayed to); an event with negative `delta_min` contributes
/// unless known absent, counted as happening no later than `time_min` (the earliest it could
/// happen), since in both cases that is the placement that keeps the running level *lowest*.
fn build_min_profile(events: &[ReservoirEvent], bounds: &[EventBounds], domains: &Domains) -> Vec<Segment> {
    let mut ticks: Vec<(IntCst, IntCst)> = Vec::with_capacity(events.len());
    for (e, b) in events.iter().zip(bounds) {
        if b.delta_min > 0 {
            if domains.entails(e.presence) {
                ticks.push((b.time_max, b.delta_min));
            }
        } else if b.delta_min < 0 && !domains.entails(!e.presence) {
            ticks.push((b.time_min, b.delta_min));
        }
    }
    ticks.sort_by_key(|&(t, _)| t);

    let mut segments = Vec::new();
    let mut level = 0;
    let mut idx = 0;
    let mut prev_time: Option<IntCst> = None;
    while idx < ticks.len() {
        let time = ticks[idx].0;
        if let Some(prev) = prev_time {
            if prev < time {
                segments.push(Segment { start: prev, end: time, level });
            }
        }
        while idx < ticks.len() && ticks[idx].0 == time {
            level += ticks[idx].1;
            idx += 1;
        }
        prev_time = Some(time);
    }
    if let Some(prev) = prev_time {
        segments.push(Segment {
            start: prev,
            end: IntCst::MAX,
            level,
        });
    }
    segments
}

/// Pushes `e`'s bounds (or its presence) to respect `max_level`, given the profile built from
/// every event with positive `delta_min`.
fn propagate_event(
    events: &[ReservoirEvent],
    bounds: &[EventBounds],
    max_level: IntCst,
    segments: &[Segment],
    idx: usize,
    domains: &mut Domains,
    cause: Cause,
) -> Result<(), Contradiction> {
    let e = &events[idx];
    if domains.entails(!e.presence) {
        return Ok(());
    }
    let b = &bounds[idx];
    if b.delta_min <= 0 {
        return Ok(());
    }
    for seg in segments {
        if seg.level + b.delta_min <= max_level {
            continue;
        }
        if seg.start >= b.time_max || seg.end <= b.time_min {
            continue;
        }
        // e cannot land inside this segment: push its time past the segment's end, or make it
        // absent if that is infeasible given its own time bounds.
        if seg.end <= b.time_max {
            domains.set(e.time.ge_lit(seg.end), cause).map_err(Contradiction::from)?;
        } else {
            domains.set(!e.presence, cause).map_err(Contradiction::from)?;
        }
    }
    Ok(())
}

fn propagate_max_bound(
    events: &[ReservoirEvent],
    max_level: IntCst,
    domains: &mut Domains,
    cause: Cause,
) -> Result<(), Contradiction> {
    let bounds: Vec<EventBounds> = events.iter().map(|e| event_bounds(e, domains)).collect();
    let segments = build_min_profile(events, &bounds, domains);
    for seg in &segments {
        if seg.level > max_level {
            let mut explanation = Explanation::with_capacity(events.len() * 2);
            for (e, b) in events.iter().zip(&bounds) {
                if b.delta_min > 0 && domains.entails(e.presence) {
                    explanation.push(e.presence);
                    explanation.push(e.time.le_lit(b.time_max));
                    explanation.push(e.delta.ge_lit(b.delta_min));
                } else if b.delta_min < 0 && !domains.entails(!e.presence) {
                    explanation.push(e.time.ge_lit(b.time_min));
                    explanation.push(e.delta.ge_lit(b.delta_min));
                }
            }
            return Err(Contradiction::Explanation(explanation));
        }
    }
    for idx in 0..events.len() {
        propagate_event(events, &bounds, max_level, &segments, idx, domains, cause)?;
    }
    Ok(())
}

/// A reservoir constraint over a fixed set of events (spec §4.11). Internally instantiates the
/// max-bound logic twice: once directly (against `max_level`), once against the mirrored event
/// stream and `-min_level` (which is exactly a max-bound check on the negated level).
#[derive(Clone)]
pub struct Reservoir {
    events: Vec<ReservoirEvent>,
    mirrored_events: Vec<ReservoirEvent>,
    min_level: IntCst,
    max_level: IntCst,
}

impl Reservoir {
    pub fn new(events: impl IntoIterator<Item = ReservoirEvent>, min_level: IntCst, max_level: IntCst) -> Self {
        let events: Vec<ReservoirEvent> = events.into_iter().collect();
        let mirrored_events = events.iter().map(ReservoirEvent::mirrored).collect();
        Reservoir {
            events,
            mirrored_events,
            min_level,
            max_level,
        }
    }
}

impl Propagator for Reservoir {
    fn setup(&self, id: PropagatorId, context: &mut Watches) {
        let mut vars = hashbrown::HashSet::with_capacity(64);
        for e in &self.events {
            vars.insert(VarRef::from(e.time.var));
            vars.insert(VarRef::from(e.delta.var));
        }
        for var in vars {
            context.add_watch(var, id);
        }
    }

    fn propagate(&self, domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
        propagate_max_bound(&self.events, self.max_level, domains, cause)?;
        propagate_max_bound(&self.mirrored_events, -self.min_level, domains, cause)?;
        Ok(())
    }

    fn explain(&self, _literal: Lit, state: &DomainsSnapshot, out_explanation: &mut Explanation) {
        for e in &self.events {
            if state.entails(e.presence) {
                out_explanation.push(e.presence);
            }
            out_explanation.push(e.time.ge_lit(snapshot_lb(state, e.time)));
            out_explanation.push(e.time.le_lit(snapshot_ub(state, e.time)));
            out_explanation.push(e.delta.ge_lit(e.delta.lb_snapshot(state)));
            out_explanation.push(e.delta.le_lit(e.delta.ub_snapshot(state)));
        }
    }

    fn clone_box(&self) -> Box<dyn Propagator> {
        Box::new(self.clone())
    }
}

impl UserPropagator for Reservoir {
    fn get_propagator(&self) -> DynPropagator {
        DynPropagator::from(self.clone())
    }

    fn satisfied(&self, dom: &Domains) -> bool {
        let mut ticks: Vec<(IntCst, IntCst)> = Vec::new();
        for e in &self.events {
            if dom.entails(!e.presence) {
                continue;
            }
            ticks.push((dom.lb(e.time), e.delta.lb(dom)));
        }
        ticks.sort_by_key(|&(t, _)| t);
        let mut level = 0;
        for (_, d) in ticks {
            level += d;
            if level < self.min_level || level > self.max_level {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Cause;
    use crate::model::lang::IVar;

    #[test]
    fn overload_on_fixed_events_is_rejected() {
        let mut m = Domains::new();
        let t1 = IVar::new(m.new_var(0, 0));
        let d1 = IVar::new(m.new_var(5, 5));
        let t2 = IVar::new(m.new_var(1, 1));
        let d2 = IVar::new(m.new_var(5, 5));
        let reservoir = Reservoir::new(
            [
                ReservoirEvent::new(t1, AffineExpr::from(d1), Lit::TRUE),
                ReservoirEvent::new(t2, AffineExpr::from(d2), Lit::TRUE),
            ],
            0,
            8,
        );
        let result = reservoir.propagate(&mut m, Cause::Decision);
        assert!(result.is_err());
    }

    #[test]
    fn within_capacity_events_propagate_cleanly() {
        let mut m = Domains::new();
        let t1 = IVar::new(m.new_var(0, 0));
        let d1 = IVar::new(m.new_var(3, 3));
        let t2 = IVar::new(m.new_var(1, 1));
        let d2 = IVar::new(m.new_var(3, 3));
        let reservoir = Reservoir::new(
            [
                ReservoirEvent::new(t1, AffineExpr::from(d1), Lit::TRUE),
                ReservoirEvent::new(t2, AffineExpr::from(d2), Lit::TRUE),
            ],
            0,
            8,
        );
        assert!(reservoir.propagate(&mut m, Cause::Decision).is_ok());
    }
}
