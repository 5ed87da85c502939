//! Per-task resource demand (spec §3.3), used by cumulative and reservoir propagators.
//!
//! Demand is kept as an [AffineExpr] rather than a plain [crate::model::lang::IAtom] so that a
//! demand that scales with a decision variable (e.g. "this task uses `k` units, where `k` is
//! itself a variable") can be represented without a separate code path; the common case of a
//! constant demand is just `AffineExpr::constant(d)`.
//!
//! Energy bounds are computed by bracketing `demand * size` with `demand_min*size_min` /
//! `demand_max*size_max` rather than a fully decomposed (piecewise-linear) energy variable: the
//! product of two bounded variables is not itself affine, and a tight decomposition is not
//! pursued here (see the corresponding Open Question resolution in SPEC_FULL.md §D).

use crate::core::state::Domains;
use crate::core::IntCst;

use super::AffineExpr;

/// The demand a task places on a resource while it executes.
#[derive(Copy, Clone, Debug)]
pub struct DemandHelper {
    pub demand: AffineExpr,
}

impl DemandHelper {
    pub fn new(demand: impl Into<AffineExpr>) -> Self {
        DemandHelper { demand: demand.into() }
    }

    pub fn constant(value: IntCst) -> Self {
        DemandHelper {
            demand: AffineExpr::constant(value),
        }
    }

    pub fn demand_min(&self, domains: &Domains) -> IntCst {
        self.demand.lb(domains)
    }

    pub fn demand_max(&self, domains: &Domains) -> IntCst {
        self.demand.ub(domains)
    }

    /// Lower bound on `demand * size`, using the demand/size bracketing described above.
    pub fn energy_min(&self, domains: &Domains, size_min: IntCst) -> IntCst {
        self.demand_min(domains).saturating_mul(size_min)
    }

    /// Upper bound on `demand * size`.
    pub fn energy_max(&self, domains: &Domains, size_max: IntCst) -> IntCst {
        self.demand_max(domains).saturating_mul(size_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Cause;
    use crate::core::VarRef;
    use crate::model::lang::IVar;

    #[test]
    fn constant_demand_energy_bounds() {
        let domains = Domains::new();
        let d = DemandHelper::constant(3);
        assert_eq!(d.energy_min(&domains, 4), 12);
        assert_eq!(d.energy_max(&domains, 4), 12);
    }

    #[test]
    fn variable_demand_brackets_energy() {
        let mut domains = Domains::new();
        let v = IVar::new(domains.new_var(1, 5));
        let d = DemandHelper::new(AffineExpr::from(v));
        assert_eq!(d.energy_min(&domains, 10), 10);
        assert_eq!(d.energy_max(&domains, 10), 50);
        domains.set_lb(VarRef::from(v), 2, Cause::Decision).unwrap();
        assert_eq!(d.energy_min(&domains, 10), 20);
    }
}
