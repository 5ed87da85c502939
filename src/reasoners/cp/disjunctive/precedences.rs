//! Disjunctive-with-precedences (spec §4.8): once a pair of mandatory tasks is found to be
//! permanently ordered at the root decision level, that fact is remembered for the rest of the
//! search. None of the sweep-based layers in this family re-derive orderings pairwise (they are
//! all `O(n log n)` theta-tree sweeps, not `O(n^2)` pairwise checks), so today this registry has
//! no in-crate consumer; it exists as the stable fact base a pairwise-style addition (or an
//! out-of-crate caller) would read from without recomputing.
//!
//! A discovered precedence can never be invalidated: domains only shrink during search, so once
//! `end_max(a) <= start_min(b)` holds for two tasks that are always present, it holds for the
//! remainder of the search. This mirrors the lifting step at the bottom of
//! `ortools/sat/disjunctive.cc`'s `DisjunctivePrecedences`, which promotes detected orderings into
//! permanent precedence literals.

use std::cell::RefCell;

use hashbrown::HashSet;

use crate::backtrack::{Backtrack, DecLvl};
use crate::core::state::Domains;
use crate::core::Lit;
use crate::reasoners::cp::scheduling::{Task, TaskHelper};

#[derive(Default)]
pub struct LevelZeroPrecedences {
    pairs: RefCell<HashSet<(u32, u32)>>,
}

impl LevelZeroPrecedences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the current bounds at the root decision level for newly-established orderings
    /// between two unconditionally-present tasks.
    pub fn refresh(&self, tasks: &[Task], helper: &TaskHelper, domains: &Domains) {
        if domains.current_decision_level() != DecLvl::ROOT {
            return;
        }
        let n = helper.num_tasks();
        let mandatory: Vec<usize> = (0..n).filter(|&t| tasks[t].presence == Lit::TRUE).collect();
        let mut pairs = self.pairs.borrow_mut();
        for &a in &mandatory {
            for &b in &mandatory {
                if a == b {
                    continue;
                }
                if helper.bounds(a).end_max <= helper.bounds(b).start_min {
                    pairs.insert((a as u32, b as u32));
                }
            }
        }
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.pairs.borrow().contains(&(a as u32, b as u32))
    }
}
