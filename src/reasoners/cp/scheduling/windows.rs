//! Window / subwindow splitting (spec §4.4, §4.7, §4.8): tasks that cannot possibly interact
//! (their shifted time ranges fall in disjoint intervals) are partitioned into independent
//! windows before the expensive reasoning runs, so the cost of a propagation round scales with
//! the size of the tightest cluster of interacting tasks rather than with the whole instance.

use crate::core::IntCst;

use super::CachedBounds;

/// Splits `0..bounds.len()` into maximal windows `[lo, hi)` (half-open ranges over *task
/// indices*, not time) such that no task in one window can overlap a task in another: the tasks
/// are conceptually sorted by `shifted_start_min`, and a new window starts whenever a gap opens
/// between the running maximum of `shifted_end_max` seen so far and the next task's
/// `shifted_start_min`.
///
/// Returns groups of task indices, each already sorted by `shifted_start_min`.
pub fn split_into_windows(bounds: &[CachedBounds]) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..bounds.len()).collect();
    order.sort_by_key(|&t| bounds[t].shifted_start_min());

    let mut windows = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut running_max_end: IntCst = IntCst::MIN;

    for t in order {
        let smin = bounds[t].shifted_start_min();
        if !current.is_empty() && smin >= running_max_end {
            windows.push(std::mem::take(&mut current));
            running_max_end = IntCst::MIN;
        }
        running_max_end = std::cmp::max(running_max_end, bounds[t].shifted_end_max());
        current.push(t);
    }
    if !current.is_empty() {
        windows.push(current);
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(start_min: IntCst, end_max: IntCst, size_min: IntCst) -> CachedBounds {
        CachedBounds {
            start_min,
            start_max: end_max,
            end_min: start_min + size_min,
            end_max,
            size_min,
            size_max: size_min,
        }
    }

    #[test]
    fn disjoint_tasks_end_up_in_separate_windows() {
        let bounds = vec![b(0, 5, 5), b(100, 110, 10)];
        let windows = split_into_windows(&bounds);
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn overlapping_tasks_share_a_window() {
        let bounds = vec![b(0, 10, 5), b(3, 12, 4)];
        let windows = split_into_windows(&bounds);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 2);
    }
}
