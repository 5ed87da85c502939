//! Packed-left end-min computation over a set of tasks (spec §4.3).
//!
//! Used by detectable-precedences and not-last to compute, for a set of tasks that must not
//! overlap, the earliest time by which all of them can be finished if scheduled back-to-back in
//! increasing start-min order.

use crate::core::IntCst;

/// A task as seen by a [TaskSet]: its identity in the owning propagator plus the two bounds the
/// packed-left computation needs.
#[derive(Copy, Clone, Debug)]
pub struct TaskSetEntry {
    pub task: usize,
    pub start_min: IntCst,
    pub size_min: IntCst,
}

/// Packed-left end-min computation with critical-index tracking (spec §4.3 / §8.2).
#[derive(Clone, Debug, Default)]
pub struct TaskSet {
    /// Entries sorted by increasing `start_min`.
    entries: Vec<TaskSetEntry>,
    /// Index of the last entry re-examined on the previous `compute_end_min` call: since entries
    /// are only ever appended or left untouched between calls within a single propagation round,
    /// rescanning only needs to start from the smallest index whose critical status could have
    /// changed.
    optimized_restart: usize,
    /// Index (into `entries`) of the first task of the critical block, set by the last call to
    /// [Self::compute_end_min].
    critical_index: usize,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.optimized_restart = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskSetEntry> {
        self.entries.iter()
    }

    /// Inserts a new entry, keeping entries sorted by `start_min`.
    ///
    /// Invalidates `optimized_restart` only if the entry is inserted before the current restart
    /// point (the common case — appending the next task in a left-to-right scan — is `O(1)`).
    pub fn add_entry(&mut self, entry: TaskSetEntry) {
        let pos = self
            .entries
            .partition_point(|e| e.start_min <= entry.start_min);
        self.entries.insert(pos, entry);
        if pos < self.optimized_restart {
            self.optimized_restart = pos;
        }
    }

    /// Earliest time by which every task in the set can be finished, scheduled left-packed in
    /// increasing start-min order.
    pub fn compute_end_min(&mut self) -> IntCst {
        self.compute_end_min_impl()
    }

    /// Same as [Self::compute_end_min] but pretending `ignored` is not part of the set.
    ///
    /// Used by not-last, which needs "the end-min of everyone but me" for each task in turn.
    pub fn compute_end_min_ignoring(&self, ignored: usize) -> IntCst {
        // Ignoring a task may change which entry is critical, so this variant does not consult
        // (nor update) `optimized_restart`: it always does a fresh `O(n)` scan.
        let mut end_min = IntCst::MIN;
        for e in &self.entries {
            if e.task == ignored {
                continue;
            }
            if end_min == IntCst::MIN || e.start_min >= end_min {
                end_min = e.start_min + e.size_min;
            } else {
                end_min += e.size_min;
            }
        }
        if end_min == IntCst::MIN {
            0
        } else {
            end_min
        }
    }

    /// The suffix `[critical_index, len())` of tasks (in start-min order) whose end-min
    /// determines the computed value; the reason for the push only needs to reference the
    /// critical task's start-min together with the size-min of every task in the critical block.
    pub fn critical_block(&self) -> &[TaskSetEntry] {
        &self.entries[self.critical_index..]
    }

    fn compute_end_min_impl(&mut self) -> IntCst {
        if self.entries.is_empty() {
            self.optimized_restart = 0;
            self.critical_index = 0;
            return 0;
        }
        let start = if self.optimized_restart < self.entries.len() {
            self.optimized_restart
        } else {
            0
        };
        let (mut end_min, mut critical_index) = if start == 0 {
            (IntCst::MIN, 0)
        } else {
            // Recompute the running end-min up to (excluding) `start` from scratch: cheap because
            // this only happens once per propagation round, right after a backtrack invalidated
            // the cache.
            let mut e = IntCst::MIN;
            let mut ci = 0;
            for (i, entry) in self.entries[..start].iter().enumerate() {
                if e == IntCst::MIN || entry.start_min >= e {
                    e = entry.start_min + entry.size_min;
                    ci = i;
                } else {
                    e += entry.size_min;
                }
            }
            (e, ci)
        };
        for (i, entry) in self.entries.iter().enumerate().skip(start) {
            if end_min == IntCst::MIN || entry.start_min >= end_min {
                end_min = entry.start_min + entry.size_min;
                critical_index = i;
            } else {
                end_min += entry.size_min;
            }
        }
        self.optimized_restart = self.entries.len();
        self.critical_index = critical_index;
        end_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(task: usize, start_min: IntCst, size_min: IntCst) -> TaskSetEntry {
        TaskSetEntry {
            task,
            start_min,
            size_min,
        }
    }

    /// `O(n^2)` oracle used to cross-check `compute_end_min` (spec §8.2).
    fn oracle_end_min(entries: &[TaskSetEntry], ignore: Option<usize>) -> IntCst {
        let mut sorted: Vec<_> = entries.iter().filter(|e| Some(e.task) != ignore).collect();
        sorted.sort_by_key(|e| e.start_min);
        let mut end = IntCst::MIN;
        for e in sorted {
            end = if end == IntCst::MIN || e.start_min >= end {
                e.start_min + e.size_min
            } else {
                end + e.size_min
            };
        }
        if end == IntCst::MIN {
            0
        } else {
            end
        }
    }

    #[test]
    fn packed_left_no_gaps() {
        let mut ts = TaskSet::new();
        ts.add_entry(entry(0, 0, 3));
        ts.add_entry(entry(1, 1, 2));
        ts.add_entry(entry(2, 2, 4));
        assert_eq!(ts.compute_end_min(), oracle_end_min(ts.iter().copied().collect::<Vec<_>>().as_slice(), None));
        assert_eq!(ts.compute_end_min(), 9);
    }

    #[test]
    fn gap_resets_the_running_end() {
        let mut ts = TaskSet::new();
        ts.add_entry(entry(0, 0, 2));
        ts.add_entry(entry(1, 100, 5));
        assert_eq!(ts.compute_end_min(), 105);
    }

    #[test]
    fn ignoring_a_task_recomputes_without_it() {
        let mut ts = TaskSet::new();
        ts.add_entry(entry(0, 0, 3));
        ts.add_entry(entry(1, 1, 2));
        ts.add_entry(entry(2, 2, 4));
        let all: Vec<_> = ts.iter().copied().collect();
        assert_eq!(ts.compute_end_min_ignoring(1), oracle_end_min(&all, Some(1)));
    }

    #[test]
    fn insertion_out_of_order_keeps_sorted_invariant() {
        let mut ts = TaskSet::new();
        ts.add_entry(entry(2, 10, 1));
        ts.add_entry(entry(0, 0, 1));
        ts.add_entry(entry(1, 5, 1));
        let starts: Vec<_> = ts.iter().map(|e| e.start_min).collect();
        assert_eq!(starts, vec![0, 5, 10]);
    }
}
