//! Non-overlap of axis-aligned rectangles on a 2-D plane (spec §4.12), built from the same
//! [Task]/[TaskHelper] vocabulary as the 1-D families: every [Rectangle] is just a pair of
//! [Task]s, one per axis, sharing a presence literal.
//!
//! [NoOverlap2D] layers four kinds of reasoning, cheapest first, reusing the 1-D propagators
//! wherever the geometry reduces to them rather than re-deriving their algorithms:
//! - **disjunctive-on-line**: a horizontal (resp. vertical) line crossing the mandatory y-part
//!   (resp. x-part) of several boxes forces their x-intervals (resp. y-intervals) to behave like
//!   a 1-D disjunctive resource, so [crate::reasoners::cp::disjunctive::NoOverlap] is invoked
//!   directly on the induced task subset.
//! - **cumulative relaxation**: projecting the y-extent of every box onto a virtual capacity
//!   bounded by the bin's height turns "boxes don't overlap in y" into "x-intervals don't exceed
//!   capacity", reusing [crate::reasoners::cp::cumulative::Cumulative].
//! - **pairwise**: for small instances, a direct check that no two mandatory rectangles are
//!   forced to overlap.
//! - **energy (OPP)**: candidate high-density windows are checked with the orthogonal-packing
//!   infeasibility detector ([opp]).

pub mod opp;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::core::state::{Cause, Domains, DomainsSnapshot, Explanation};
use crate::core::{IntCst, Lit};
use crate::reasoners::cp::cumulative::Cumulative;
use crate::reasoners::cp::disjunctive::NoOverlap;
use crate::reasoners::cp::scheduling::{explain_group_conservatively, DemandHelper, SchedulingConfig, Task};
use crate::reasoners::cp::{DynPropagator, Propagator, PropagatorId, UserPropagator, Watches};
use crate::reasoners::Contradiction;

use opp::{Item, OrthogonalPackingResult};

/// A rectangle with an x-extent and a y-extent, present iff both are (by convention the two
/// tasks are built with the same presence literal; [Rectangle::new] enforces this).
#[derive(Copy, Clone, Debug)]
pub struct Rectangle {
    pub x: Task,
    pub y: Task,
}

impl Rectangle {
    pub fn new(x: Task, y: Task) -> Self {
        debug_assert_eq!(x.presence, y.presence, "a rectangle's two axes must share one presence literal");
        Rectangle { x, y }
    }

    fn presence(&self) -> Lit {
        self.x.presence
    }
}

/// How degenerate (zero-area) a rectangle currently is, per its size bounds (spec §4.12's
/// splitting of zero-area boxes, which restricts which pairwise tests are meaningful between
/// them).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Shape {
    /// Both extents possibly non-zero.
    NonDegenerate,
    /// `size_y` forced to zero: the box lives on a horizontal segment.
    Horizontal,
    /// `size_x` forced to zero: the box lives on a vertical segment.
    Vertical,
    /// Both extents forced to zero: the box is a single point.
    Point,
}

fn shape_of(rect: &Rectangle, domains: &Domains) -> Shape {
    let x_zero = domains.ub(rect.x.size) == 0;
    let y_zero = domains.ub(rect.y.size) == 0;
    match (x_zero, y_zero) {
        (true, true) => Shape::Point,
        (true, false) => Shape::Vertical,
        (false, true) => Shape::Horizontal,
        (false, false) => Shape::NonDegenerate,
    }
}

/// Whether a pairwise test between these two shapes is meaningful (spec §4.12): non-zero boxes
/// interact with everything; the three degenerate classes only interact with non-zero boxes and,
/// for vertical/horizontal, with each other (not with their own kind, since two boxes confined to
/// parallel lines of the same orientation never force an ordering on the other axis).
fn pairwise_applicable(a: Shape, b: Shape) -> bool {
    use Shape::*;
    match (a, b) {
        (NonDegenerate, _) | (_, NonDegenerate) => true,
        (Horizontal, Vertical) | (Vertical, Horizontal) => true,
        (Point, Point) => false,
        (Horizontal, Horizontal) | (Vertical, Vertical) => false,
        (Point, _) | (_, Point) => true,
    }
}

/// Extracts the x-intervals of every rectangle whose mandatory y-part (`[start_max_y,
/// end_min_y)`) contains `line`, used to build both the horizontal disjunctive-on-line subset and
/// the y-as-capacity cumulative relaxation's counterpart.
fn tasks_crossing_line(rectangles: &[Rectangle], domains: &Domains, line: IntCst, vertical_axis: bool) -> Vec<Task> {
    rectangles
        .iter()
        .filter(|r| !domains.entails(!r.presence()))
        .filter_map(|r| {
            let (cross, keep) = if vertical_axis { (&r.y, &r.x) } else { (&r.x, &r.y) };
            let start_max = domains.ub(cross.start);
            let end_min = domains.lb(cross.end);
            if start_max < end_min && start_max <= line && line < end_min {
                Some(*keep)
            } else {
                None
            }
        })
        .collect()
}

fn disjunctive_on_line(rectangles: &[Rectangle], domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
    let mut y_lines: Vec<IntCst> = rectangles
        .iter()
        .filter(|r| !domains.entails(!r.presence()))
        .map(|r| domains.ub(r.y.start))
        .collect();
    y_lines.sort_unstable();
    y_lines.dedup();
    for line in y_lines {
        let tasks = tasks_crossing_line(rectangles, domains, line, true);
        if tasks.len() >= 2 {
            NoOverlap::new(tasks).propagate(domains, cause)?;
        }
    }

    let mut x_lines: Vec<IntCst> = rectangles
        .iter()
        .filter(|r| !domains.entails(!r.presence()))
        .map(|r| domains.ub(r.x.start))
        .collect();
    x_lines.sort_unstable();
    x_lines.dedup();
    for line in x_lines {
        let tasks = tasks_crossing_line(rectangles, domains, line, false);
        if tasks.len() >= 2 {
            NoOverlap::new(tasks).propagate(domains, cause)?;
        }
    }
    Ok(())
}

fn present_extent(rectangles: &[Rectangle], domains: &Domains, vertical_axis: bool) -> IntCst {
    let mut lo = IntCst::MAX;
    let mut hi = IntCst::MIN;
    for r in rectangles.iter().filter(|r| !domains.entails(!r.presence())) {
        let t = if vertical_axis { &r.y } else { &r.x };
        lo = lo.min(domains.lb(t.start));
        hi = hi.max(domains.ub(t.end));
    }
    (hi - lo).max(0)
}

/// Treats the x-intervals as a cumulative resource whose demand is each box's y-size and whose
/// capacity is the height of the bounding box of every present rectangle (a virtual capacity
/// variable in the original; bounded here by the tightest currently-known bound on it), and
/// vice-versa. A present box must be present in this relaxation whenever it is present in the
/// full 2-D constraint, so a conflict here is a sound (if possibly weaker) 2-D conflict.
fn cumulative_relaxation(rectangles: &[Rectangle], domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
    let capacity_y = present_extent(rectangles, domains, true);
    if capacity_y > 0 {
        let tasks: Vec<(Task, DemandHelper)> = rectangles
            .iter()
            .filter(|r| !domains.entails(!r.presence()))
            .map(|r| (r.x, DemandHelper::new(r.y.size)))
            .collect();
        if tasks.len() >= 2 {
            Cumulative::new(tasks, capacity_y).propagate(domains, cause)?;
        }
    }

    let capacity_x = present_extent(rectangles, domains, false);
    if capacity_x > 0 {
        let tasks: Vec<(Task, DemandHelper)> = rectangles
            .iter()
            .filter(|r| !domains.entails(!r.presence()))
            .map(|r| (r.y, DemandHelper::new(r.x.size)))
            .collect();
        if tasks.len() >= 2 {
            Cumulative::new(tasks, capacity_x).propagate(domains, cause)?;
        }
    }
    Ok(())
}

/// Direct overlap check between two mandatory rectangles: if their mandatory parts (the ranges
/// they occupy no matter how remaining flexibility resolves) are forced to intersect on both
/// axes, the pair can never be placed without overlapping.
fn mandatory_parts_overlap(a: &Rectangle, b: &Rectangle, domains: &Domains) -> bool {
    let x_overlap = domains.ub(a.x.start).max(domains.ub(b.x.start)) < domains.lb(a.x.end).min(domains.lb(b.x.end));
    let y_overlap = domains.ub(a.y.start).max(domains.ub(b.y.start)) < domains.lb(a.y.end).min(domains.lb(b.y.end));
    x_overlap && y_overlap
}

fn push_conflict_or_absence(a_idx: usize, b_idx: usize, rectangles: &[Rectangle], domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
    let a = &rectangles[a_idx];
    let b = &rectangles[b_idx];
    let a_mandatory = domains.entails(a.presence());
    let b_mandatory = domains.entails(b.presence());
    if a_mandatory && b_mandatory {
        let mut explanation = Explanation::with_capacity(8);
        for r in [a, b] {
            explanation.push(r.presence());
            explanation.push(r.x.start.le_lit(domains.ub(r.x.start)));
            explanation.push(r.x.end.ge_lit(domains.lb(r.x.end)));
            explanation.push(r.y.start.le_lit(domains.ub(r.y.start)));
            explanation.push(r.y.end.ge_lit(domains.lb(r.y.end)));
        }
        return Err(Contradiction::Explanation(explanation));
    }
    // exactly one of the two can be made absent to resolve the conflict; prefer the one without
    // a determined presence, falling back to `a` if both are somehow still undetermined.
    let victim = if !a_mandatory { a } else { b };
    domains.set(!victim.presence(), cause).map_err(Contradiction::from)?;
    Ok(())
}

fn pairwise(rectangles: &[Rectangle], domains: &mut Domains, cause: Cause, max_pairs: usize) -> Result<(), Contradiction> {
    let n = rectangles.len();
    if n * n.saturating_sub(1) / 2 > max_pairs {
        return Ok(());
    }
    let shapes: Vec<Shape> = rectangles.iter().map(|r| shape_of(r, domains)).collect();
    for i in 0..n {
        if domains.entails(!rectangles[i].presence()) {
            continue;
        }
        for j in (i + 1)..n {
            if domains.entails(!rectangles[j].presence()) {
                continue;
            }
            if !pairwise_applicable(shapes[i], shapes[j]) {
                continue;
            }
            if mandatory_parts_overlap(&rectangles[i], &rectangles[j], domains) {
                push_conflict_or_absence(i, j, rectangles, domains, cause)?;
            }
        }
    }
    Ok(())
}

/// Samples candidate high-energy windows (spec §4.12's `find_rectangles_with_energy_conflict_mc`)
/// and runs the orthogonal-packing detector on each: a window is a sub-bin `[x0, x1) x [y0, y1)`
/// and the items are the mandatory parts of every rectangle overlapping it.
fn energy(rectangles: &[Rectangle], domains: &mut Domains, cause: Cause, config: &SchedulingConfig, num_samples: usize) -> Result<(), Contradiction> {
    let n = rectangles.len();
    if n < 2 {
        return Ok(());
    }
    let mut xs: Vec<IntCst> = Vec::with_capacity(2 * n);
    let mut ys: Vec<IntCst> = Vec::with_capacity(2 * n);
    for r in rectangles.iter().filter(|r| !domains.entails(!r.presence())) {
        xs.push(domains.lb(r.x.start));
        xs.push(domains.ub(r.x.end));
        ys.push(domains.lb(r.y.start));
        ys.push(domains.ub(r.y.end));
    }
    xs.sort_unstable();
    ys.sort_unstable();
    if xs.len() < 2 || ys.len() < 2 {
        return Ok(());
    }

    let mut rng = SmallRng::seed_from_u64(0xA11CE);
    for _ in 0..num_samples {
        let x0_idx = rng.gen_range(0..xs.len() - 1);
        let x1_idx = rng.gen_range(x0_idx + 1..xs.len());
        let y0_idx = rng.gen_range(0..ys.len() - 1);
        let y1_idx = rng.gen_range(y0_idx + 1..ys.len());
        let (x0, x1) = (xs[x0_idx], xs[x1_idx]);
        let (y0, y1) = (ys[y0_idx], ys[y1_idx]);
        if x1 <= x0 || y1 <= y0 {
            continue;
        }

        let mut items = Vec::new();
        let mut members = Vec::new();
        for (idx, r) in rectangles.iter().enumerate() {
            if domains.entails(!r.presence()) {
                continue;
            }
            let rx0 = domains.lb(r.x.start).max(x0);
            let rx1 = domains.ub(r.x.end).min(x1);
            let ry0 = domains.lb(r.y.start).max(y0);
            let ry1 = domains.ub(r.y.end).min(y1);
            if rx1 > rx0 && ry1 > ry0 {
                items.push(Item {
                    size_x: rx1 - rx0,
                    size_y: ry1 - ry0,
                });
                members.push(idx);
            }
        }
        if items.len() < 2 {
            continue;
        }
        if let OrthogonalPackingResult::Infeasible { items: conflicting } = opp::check(&items, x1 - x0, y1 - y0, &config.opp) {
            let mut explanation = Explanation::with_capacity(conflicting.len() * 5);
            for local in conflicting {
                let r = &rectangles[members[local]];
                explanation.push(r.presence());
                explanation.push(r.x.start.ge_lit(domains.lb(r.x.start)));
                explanation.push(r.x.end.le_lit(domains.ub(r.x.end)));
                explanation.push(r.y.start.ge_lit(domains.lb(r.y.start)));
                explanation.push(r.y.end.le_lit(domains.ub(r.y.end)));
            }
            return Err(Contradiction::Explanation(explanation));
        }
    }
    Ok(())
}

/// A geometric variant specialised for rectangles known to share a size on one axis (spec
/// §4.12's "try-edge"): if two boxes have the same `size_x` and together exceed the bin width on
/// x, they cannot both be placed without one forcing the other's position on y, which the plain
/// pairwise mandatory-overlap check above already detects once their x-mandatory-parts are
/// known tight; this layer widens the net to pairs whose x-mandatory-parts aren't yet tight but
/// whose shared size already forces the same conclusion.
fn try_edge(rectangles: &[Rectangle], domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
    let n = rectangles.len();
    for i in 0..n {
        if domains.entails(!rectangles[i].presence()) {
            continue;
        }
        for j in (i + 1)..n {
            if domains.entails(!rectangles[j].presence()) {
                continue;
            }
            let (a, b) = (&rectangles[i], &rectangles[j]);
            let same_x_size = domains.lb(a.x.size) == domains.lb(b.x.size) && domains.ub(a.x.size) == domains.ub(b.x.size);
            if !same_x_size {
                continue;
            }
            let min_span = domains.lb(a.x.start).min(domains.lb(b.x.start));
            let max_span = domains.ub(a.x.end).max(domains.ub(b.x.end));
            let combined_size = domains.lb(a.x.size).saturating_add(domains.lb(b.x.size));
            if combined_size > max_span - min_span && mandatory_parts_overlap(a, b, domains) {
                push_conflict_or_absence(i, j, rectangles, domains, cause)?;
            }
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct NoOverlap2D {
    rectangles: Vec<Rectangle>,
    config: SchedulingConfig,
}

impl NoOverlap2D {
    pub fn new(rectangles: impl IntoIterator<Item = Rectangle>) -> Self {
        NoOverlap2D {
            rectangles: rectangles.into_iter().collect(),
            config: SchedulingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulingConfig) -> Self {
        self.config = config;
        self
    }
}

impl Propagator for NoOverlap2D {
    fn setup(&self, id: PropagatorId, context: &mut Watches) {
        let mut vars = hashbrown::HashSet::with_capacity(64);
        for r in &self.rectangles {
            for v in r.x.variables() {
                vars.insert(v);
            }
            for v in r.y.variables() {
                vars.insert(v);
            }
        }
        for var in vars {
            context.add_watch(var, id);
        }
    }

    fn propagate(&self, domains: &mut Domains, cause: Cause) -> Result<(), Contradiction> {
        disjunctive_on_line(&self.rectangles, domains, cause)?;
        cumulative_relaxation(&self.rectangles, domains, cause)?;
        pairwise(
            &self.rectangles,
            domains,
            cause,
            self.config.max_pairs_pairwise_reasoning_in_no_overlap_2d,
        )?;
        if self.config.use_energetic_reasoning_in_no_overlap_2d {
            energy(&self.rectangles, domains, cause, &self.config, 32)?;
        }
        if self.config.use_try_edge_reasoning_in_no_overlap_2d {
            try_edge(&self.rectangles, domains, cause)?;
        }
        Ok(())
    }

    fn explain(&self, _literal: Lit, state: &DomainsSnapshot, out_explanation: &mut Explanation) {
        let mut tasks = Vec::with_capacity(self.rectangles.len() * 2);
        for r in &self.rectangles {
            tasks.push(r.x);
            tasks.push(r.y);
        }
        let all: Vec<usize> = (0..tasks.len()).collect();
        explain_group_conservatively(&tasks, &all, state, out_explanation);
    }

    fn clone_box(&self) -> Box<dyn Propagator> {
        Box::new(self.clone())
    }
}

impl UserPropagator for NoOverlap2D {
    fn get_propagator(&self) -> DynPropagator {
        DynPropagator::from(self.clone())
    }

    fn satisfied(&self, dom: &Domains) -> bool {
        for i in 0..self.rectangles.len() {
            if dom.entails(!self.rectangles[i].presence()) {
                continue;
            }
            for j in (i + 1)..self.rectangles.len() {
                if dom.entails(!self.rectangles[j].presence()) {
                    continue;
                }
                let a = &self.rectangles[i];
                let b = &self.rectangles[j];
                let x_sep = dom.ub(a.x.end) <= dom.lb(b.x.start) || dom.ub(b.x.end) <= dom.lb(a.x.start);
                let y_sep = dom.ub(a.y.end) <= dom.lb(b.y.start) || dom.ub(b.y.end) <= dom.lb(a.y.start);
                if !x_sep && !y_sep {
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
    use crate::model::lang::IVar;

    fn fixed_task(m: &mut Domains, start: IntCst, size: IntCst) -> Task {
        let s = IVar::new(m.new_var(start, start));
        let sz = IVar::new(m.new_var(size, size));
        let e = IVar::new(m.new_var(start + size, start + size));
        Task::new(s, sz, e, Lit::TRUE)
    }

    fn rectangle(m: &mut Domains, x: (IntCst, IntCst), y: (IntCst, IntCst)) -> Rectangle {
        Rectangle::new(fixed_task(m, x.0, x.1), fixed_task(m, y.0, y.1))
    }

    /// Spec §8.4 scenario F: two rectangles that fully occupy the same square on both axes can
    /// never be placed without overlapping.
    #[test]
    fn fully_overlapping_rectangles_conflict() {
        let mut m = Domains::new();
        let a = rectangle(&mut m, (0, 5), (0, 5));
        let b = rectangle(&mut m, (0, 5), (0, 5));

        let no_overlap = NoOverlap2D::new([a, b]);
        assert!(no_overlap.propagate(&mut m, Cause::Decision).is_err());
    }

    /// Two rectangles separated on the x-axis (adjacent, not overlapping) never conflict
    /// regardless of their y-extents.
    #[test]
    fn rectangles_separated_on_x_axis_are_left_alone() {
        let mut m = Domains::new();
        let a = rectangle(&mut m, (0, 5), (0, 5));
        let b = rectangle(&mut m, (5, 5), (0, 5));

        let no_overlap = NoOverlap2D::new([a, b]);
        no_overlap.propagate(&mut m, Cause::Decision).unwrap();
        assert!(no_overlap.satisfied(&m));
    }

    /// `satisfied` must consider both axes: separation on y alone also avoids overlap.
    #[test]
    fn satisfied_accepts_separation_on_either_axis() {
        let mut m = Domains::new();
        let a = rectangle(&mut m, (0, 5), (0, 5));
        let b = rectangle(&mut m, (0, 5), (5, 5));
        let no_overlap = NoOverlap2D::new([a, b]);
        assert!(no_overlap.satisfied(&m));
    }

    /// An optional rectangle whose only consistent placement overlaps a mandatory one is forced
    /// absent instead of reported as a conflict.
    #[test]
    fn optional_rectangle_causing_overlap_is_pushed_absent() {
        let mut m = Domains::new();
        let presence_b = Lit::geq(m.new_var(0, 1), 1);
        let a = rectangle(&mut m, (0, 5), (0, 5));
        let bx = fixed_task(&mut m, 0, 5);
        let by = fixed_task(&mut m, 0, 5);
        let b = Rectangle::new(Task::new(bx.start, bx.size, bx.end, presence_b), Task::new(by.start, by.size, by.end, presence_b));

        let no_overlap = NoOverlap2D::new([a, b]);
        no_overlap.propagate(&mut m, Cause::Decision).unwrap();
        assert!(m.entails(!presence_b));
    }
}
