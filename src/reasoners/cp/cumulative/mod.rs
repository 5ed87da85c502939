//! The cumulative (renewable resource) constraint family (spec §4.9-§4.10): a generalization of
//! the disjunctive family where several tasks may run at once, as long as the sum of their
//! demands never exceeds a fixed capacity.
//!
//! [Cumulative] runs two complementary layers over the same tasks: time-tabling-per-task (cheap,
//! catches conflicts against the profile of already-forced usage) and an energy/overload check
//! (more expensive, catches conflicts no single mandatory-part profile reveals). Neither layer
//! needs the mirror-image trick the disjunctive family uses: both already reason symmetrically
//! about start and end.

mod energy;
mod time_tabling;

use crate::core::state::{Cause, Domains, Explanation};
use crate::core::{IntCst, Lit};
use crate::reasoners::cp::scheduling::{explain_group_conservatively, Direction, DemandHelper, SchedulingConfig, Task, TaskHelper};
use crate::reasoners::cp::{DynPropagator, Propagator, PropagatorId, UserPropagator, Watches};
use crate::reasoners::Contradiction;

#[derive(Clone)]
pub struct Cumulative {
    tasks: Vec<Task>,
    demands: Vec<DemandHelper>,
    capacity: IntCst,
    config: SchedulingConfig,
}

impl Cumulative {
    pub fn new(tasks: impl IntoIterator<Item = (Task, DemandHelper)>, capacity: IntCst) -> Self {
        let (tasks, demands): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        Cumulative {
            tasks,
            demands,
            capacity,
            config: SchedulingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulingConfig) -> Self {
        self.config = config;
        self
    }

    /// Disables the dual-feasible-function strengthening of the energy check (spec §4.10's
    /// optional conservative-scale extension), e.g. for comparing against a plain-area baseline.
    pub fn without_conservative_scale(mut self) -> Self {
        self.config.use_conservative_scale_overload_checker = false;
        self
    }
}

impl Propagator for Cumulative {
    fn setup(&self, id: PropagatorId, context: &mut Watches) {
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
        helper.synchronize_and_set_time_direction(&self.tasks, domains, Direction::Forward);
        time_tabling::propagate(&self.tasks, &helper, &self.demands, self.capacity, domains, cause)?;
        if self.config.use_overload_checker {
            helper.synchronize_and_set_time_direction(&self.tasks, domains, Direction::Forward);
            energy::propagate(
                &self.tasks,
                &helper,
                &self.demands,
                self.capacity,
                self.config.use_conservative_scale_overload_checker,
                domains,
                cause,
            )?;
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

impl UserPropagator for Cumulative {
    fn get_propagator(&self) -> DynPropagator {
        DynPropagator::from(self.clone())
    }

    fn satisfied(&self, dom: &Domains) -> bool {
        // Checks every integer instant at which some task may start or end: between two
        // consecutive such instants usage is constant, so it suffices to sum demands of tasks
        // covering each such instant.
        let mut times: Vec<IntCst> = Vec::new();
        for t in &self.tasks {
            if dom.entails(!t.presence) {
                continue;
            }
            times.push(dom.lb(t.start));
            times.push(dom.ub(t.end));
        }
        times.sort_unstable();
        times.dedup();
        for &time in &times {
            let mut usage = 0;
            for (i, t) in self.tasks.iter().enumerate() {
                if dom.entails(!t.presence) {
                    continue;
                }
                if dom.lb(t.start) <= time && time < dom.ub(t.end) {
                    usage += self.demands[i].demand_min(dom);
                }
            }
            if usage > self.capacity {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IntCst;
    use crate::model::lang::{IAtom, IVar};

    fn task(m: &mut Domains, start: (IntCst, IntCst), size: IntCst, end: (IntCst, IntCst), presence: Lit) -> Task {
        let s = IVar::new(m.new_var(start.0, start.1));
        let sz = IVar::new(m.new_var(size, size));
        let e = IVar::new(m.new_var(end.0, end.1));
        Task::new(s, sz, e, presence)
    }

    /// Spec §8.4 scenario C: three unit-demand tasks on a resource of capacity 3, one of them
    /// with enough slack to be scheduled around the other two, must be left alone. (Capacity 3 is
    /// exactly enough for all three to overlap at once; with capacity 2, `a` and `b` alone already
    /// saturate it and `c` would correctly have to be pushed out of their mandatory window.)
    #[test]
    fn three_tasks_fit_within_capacity() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 0), 4, (4, 4), Lit::TRUE);
        let b = task(&mut m, (0, 0), 4, (4, 4), Lit::TRUE);
        let c = task(&mut m, (0, 10), 4, (4, 14), Lit::TRUE);

        let cumulative = Cumulative::new(
            [
                (a, DemandHelper::constant(1)),
                (b, DemandHelper::constant(1)),
                (c, DemandHelper::constant(1)),
            ],
            3,
        );
        cumulative.propagate(&mut m, Cause::Decision).unwrap();

        assert_eq!(m.lb(IAtom::from(c.start)), 0, "c has enough slack and must not be pushed");
    }

    /// Two mandatory tasks whose demand already exceeds capacity while fully overlapping are an
    /// unconditional conflict.
    #[test]
    fn overlapping_demand_exceeding_capacity_conflicts() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 0), 5, (5, 5), Lit::TRUE);
        let b = task(&mut m, (0, 0), 5, (5, 5), Lit::TRUE);

        let cumulative = Cumulative::new([(a, DemandHelper::constant(2)), (b, DemandHelper::constant(2))], 3);
        assert!(cumulative.propagate(&mut m, Cause::Decision).is_err());
    }

    /// Spec §8.4 scenario D/E: an optional task whose presence would overload the resource is
    /// forced absent instead of reported as a conflict.
    #[test]
    fn optional_task_causing_overload_is_pushed_absent() {
        let mut m = Domains::new();
        let b_presence = Lit::geq(m.new_var(0, 1), 1);
        let a = task(&mut m, (0, 0), 5, (5, 5), Lit::TRUE);
        let b = task(&mut m, (0, 0), 5, (5, 5), b_presence);

        let cumulative = Cumulative::new([(a, DemandHelper::constant(2)), (b, DemandHelper::constant(2))], 3);
        cumulative.propagate(&mut m, Cause::Decision).unwrap();

        assert!(m.entails(!b_presence));
    }

    /// `satisfied` must sum demand across every instant an entailed-present task may be active,
    /// not just at task boundaries that coincide across tasks.
    #[test]
    fn satisfied_detects_overload_mid_interval() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 0), 5, (5, 5), Lit::TRUE);
        let b = task(&mut m, (2, 2), 5, (7, 7), Lit::TRUE);

        let cumulative = Cumulative::new([(a, DemandHelper::constant(2)), (b, DemandHelper::constant(2))], 3);
        assert!(!cumulative.satisfied(&m), "usage is 4 > capacity 3 during [2,5)");
    }

    #[test]
    fn satisfied_accepts_sequential_tasks() {
        let mut m = Domains::new();
        let a = task(&mut m, (0, 0), 5, (5, 5), Lit::TRUE);
        let b = task(&mut m, (5, 5), 5, (10, 10), Lit::TRUE);

        let cumulative = Cumulative::new([(a, DemandHelper::constant(2)), (b, DemandHelper::constant(2))], 3);
        assert!(cumulative.satisfied(&m));
    }
}
