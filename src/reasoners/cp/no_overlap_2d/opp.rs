//! Orthogonal-packing infeasibility detector (spec §4.13): given items `(size_x, size_y)` and a
//! bin `(W, H)`, proves that no axis-aligned, non-overlapping placement of all items inside the
//! bin exists — or fails to, which is not evidence of feasibility, only that this detector
//! couldn't show infeasibility.
//!
//! Layers run in increasing cost order with early exit, grounded on
//! `ortools/sat/2d_orthogonal_packing.h`: pairwise, dual-feasible-function `f0`, dual-feasible
//! function `f2`, then brute force for small instances.

use crate::core::IntCst;
use crate::reasoners::cp::scheduling::OppConfig;

#[derive(Copy, Clone, Debug)]
pub struct Item {
    pub size_x: IntCst,
    pub size_y: IntCst,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrthogonalPackingResult {
    Feasible,
    /// `items` indexes the subset of the input whose mutual incompatibility was established;
    /// always at least 2 items.
    Infeasible { items: Vec<usize> },
}

/// `f0(u, C) = ceil(u*K / C)`: a classical dual-feasible function (Fekete & Schepers). Projects
/// an item length onto a coarser scale while never making a feasible packing look infeasible.
fn f0(u: IntCst, capacity: IntCst, k: i64) -> i64 {
    let u = u as i64;
    let c = capacity as i64;
    (u * k + c - 1) / c
}

/// `f2_K(u, C)`: rounds `u` down to the nearest multiple of `K`, except that anything within `K`
/// of `C` is rounded up to `C` itself (Fekete & Schepers' second dual-feasible function family).
fn f2(u: IntCst, capacity: IntCst, k: IntCst) -> IntCst {
    if k <= 0 {
        return u;
    }
    if u > capacity - k {
        capacity
    } else {
        (u / k) * k
    }
}

fn pairwise_conflict(items: &[Item], bin_w: IntCst, bin_h: IntCst) -> Option<Vec<usize>> {
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let a = &items[i];
            let b = &items[j];
            if a.size_x.saturating_add(b.size_x) > bin_w && a.size_y.saturating_add(b.size_y) > bin_h {
                return Some(vec![i, j]);
            }
        }
    }
    None
}

/// Checks whether scaling every item's x-size by `f0`/`f2` (summed against `size_y`, as a strip
/// of height `bin_h`) or y-size (summed against `size_x`) proves the total footprint exceeds what
/// the bin can hold even after relaxing to a 1-D strip problem.
fn dff_conflict(items: &[Item], bin_w: IntCst, bin_h: IntCst, scale: impl Fn(IntCst, IntCst) -> i64) -> Option<Vec<usize>> {
    // x-axis projection: area becomes sum(scale(size_x_i) * size_y_i) vs scale-total-capacity * H
    let mut contributors = Vec::new();
    let mut total_x: i64 = 0;
    for (idx, it) in items.iter().enumerate() {
        let scaled = scale(it.size_x, bin_w);
        if scaled > 0 {
            total_x += scaled * it.size_y as i64;
            contributors.push(idx);
        }
    }
    if total_x > scale(bin_w, bin_w) * bin_h as i64 && contributors.len() >= 2 {
        return Some(contributors);
    }

    let mut contributors = Vec::new();
    let mut total_y: i64 = 0;
    for (idx, it) in items.iter().enumerate() {
        let scaled = scale(it.size_y, bin_h);
        if scaled > 0 {
            total_y += scaled * it.size_x as i64;
            contributors.push(idx);
        }
    }
    if total_y > scale(bin_h, bin_h) * bin_w as i64 && contributors.len() >= 2 {
        return Some(contributors);
    }
    None
}

/// Exact decision procedure for small instances: recursive corner-point placement search. Tries
/// placing unplaced items at the lowest-leftmost open corner of the current packing; if every
/// candidate corner fails for every remaining item, the instance is infeasible.
fn brute_force_feasible(items: &[Item], bin_w: IntCst, bin_h: IntCst) -> bool {
    fn overlaps(a: (IntCst, IntCst, IntCst, IntCst), b: (IntCst, IntCst, IntCst, IntCst)) -> bool {
        a.0 < b.0 + b.2 && b.0 < a.0 + a.2 && a.1 < b.1 + b.3 && b.1 < a.1 + a.3
    }

    // `placed` holds (item_idx, x, y) triples.
    fn search(items: &[Item], bin_w: IntCst, bin_h: IntCst, placed: &mut Vec<(usize, IntCst, IntCst)>, remaining: &mut Vec<usize>) -> bool {
        if remaining.is_empty() {
            return true;
        }
        let mut corners = vec![(0, 0)];
        for &(idx, px, py) in placed.iter() {
            let it = items[idx];
            corners.push((px + it.size_x, py));
            corners.push((px, py + it.size_y));
        }
        corners.sort_unstable();
        corners.dedup();

        let candidates = remaining.clone();
        for (ci, &item_idx) in candidates.iter().enumerate() {
            let it = items[item_idx];
            if it.size_x > bin_w || it.size_y > bin_h {
                continue;
            }
            for &(cx, cy) in &corners {
                if cx + it.size_x > bin_w || cy + it.size_y > bin_h {
                    continue;
                }
                let candidate_rect = (cx, cy, it.size_x, it.size_y);
                let conflicts = placed
                    .iter()
                    .any(|&(idx, px, py)| overlaps(candidate_rect, (px, py, items[idx].size_x, items[idx].size_y)));
                if conflicts {
                    continue;
                }
                placed.push((item_idx, cx, cy));
                remaining.remove(ci);
                if search(items, bin_w, bin_h, placed, remaining) {
                    return true;
                }
                remaining.insert(ci, item_idx);
                placed.pop();
            }
        }
        false
    }

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(items[i].size_x as i64 * items[i].size_y as i64));
    let mut placed = Vec::new();
    search(items, bin_w, bin_h, &mut placed, &mut order)
}

pub fn check(items: &[Item], bin_w: IntCst, bin_h: IntCst, config: &OppConfig) -> OrthogonalPackingResult {
    if config.use_pairwise {
        if let Some(conflict) = pairwise_conflict(items, bin_w, bin_h) {
            return OrthogonalPackingResult::Infeasible { items: conflict };
        }
    }
    if config.use_dff_f0 {
        for &k in &config.dff0_ks {
            if let Some(conflict) = dff_conflict(items, bin_w, bin_h, |u, c| f0(u, c, k)) {
                return OrthogonalPackingResult::Infeasible { items: conflict };
            }
        }
    }
    if config.use_dff_f2 {
        let mut ks: Vec<IntCst> = Vec::new();
        let mut k = 1;
        while ks.len() < config.dff2_max_number_of_parameters_to_check && k < bin_w.max(bin_h) {
            ks.push(k);
            k = k.saturating_mul(2).max(k + 1);
        }
        for k in ks {
            if let Some(conflict) = dff_conflict(items, bin_w, bin_h, |u, c| f2(u, c, k) as i64) {
                return OrthogonalPackingResult::Infeasible { items: conflict };
            }
        }
    }
    if items.len() <= config.brute_force_threshold && !brute_force_feasible(items, bin_w, bin_h) {
        return OrthogonalPackingResult::Infeasible {
            items: (0..items.len()).collect(),
        };
    }
    OrthogonalPackingResult::Feasible
}

/// Relaxes a reduced (DFF-scaled) item size back towards its true level-zero size as far as the
/// slack consumed by the detected conflict allows, so the caller can build a smaller, more
/// general explanation (spec §4.13's `try_use_slack_to_reduce_item_size`).
pub fn try_use_slack_to_reduce_item_size(reduced_size: IntCst, true_size: IntCst, available_slack: IntCst) -> IntCst {
    std::cmp::min(true_size, reduced_size.saturating_add(available_slack))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairwise_detects_two_oversized_items() {
        let items = [Item { size_x: 6, size_y: 6 }, Item { size_x: 6, size_y: 6 }];
        let result = check(&items, 10, 10, &OppConfig::default());
        assert!(matches!(result, OrthogonalPackingResult::Infeasible { .. }));
    }

    #[test]
    fn items_that_tile_exactly_are_feasible() {
        let items = [
            Item { size_x: 5, size_y: 10 },
            Item { size_x: 5, size_y: 10 },
        ];
        let result = check(&items, 10, 10, &OppConfig::default());
        assert_eq!(result, OrthogonalPackingResult::Feasible);
    }

    #[test]
    fn dff_f0_catches_a_fractional_overload() {
        // three items of width 4 in a bin of width 10: individually fine (4+4<=10 pairwise, with
        // a third they still fit by area if stacked), but three won't fit side by side, and a
        // well-chosen K reveals it even though no single pair triggers the pairwise check.
        let items = [
            Item { size_x: 4, size_y: 10 },
            Item { size_x: 4, size_y: 10 },
            Item { size_x: 4, size_y: 10 },
        ];
        let result = check(&items, 10, 10, &OppConfig::default());
        assert!(matches!(result, OrthogonalPackingResult::Infeasible { .. }));
    }
}
