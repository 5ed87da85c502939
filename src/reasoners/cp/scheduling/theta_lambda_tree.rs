//! The Theta-Lambda tree (spec §4.2): a binary tree indexed by event, giving `O(log n)`
//! envelope queries over a set of "present" (theta) events, with a "lambda" extension that
//! tracks the envelope obtainable by letting exactly one additional (optional) event swap in
//! at its maximal energy.
//!
//! Composition rule and leaf formulas follow the classical Vilim/Nuijten theta-lambda tree used
//! throughout `or-tools`' `disjunctive.cc` overload-checker and edge-finder. The tree here is
//! implemented as a complete binary tree padded to the next power of two (as the teacher's
//! theta-only tree in `disjunctive/theta_tree.rs` already does); unused leaves are left in their
//! `Node::EMPTY` state, which is the identity element of [`Node::compose`], so padding never
//! changes the value of a query.

use crate::core::IntCst;

pub type EventId = usize;

fn add(a: IntCst, b: IntCst) -> IntCst {
    a.saturating_add(b)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Node {
    envelope: IntCst,
    envelope_opt: IntCst,
    sum_of_energy_min: IntCst,
    max_of_energy_delta: IntCst,
}

impl Node {
    const EMPTY: Node = Node {
        envelope: IntCst::MIN / 4,
        envelope_opt: IntCst::MIN / 4,
        sum_of_energy_min: 0,
        max_of_energy_delta: 0,
    };

    fn compose(left: Node, right: Node) -> Node {
        Node {
            envelope: std::cmp::max(right.envelope, add(left.envelope, right.sum_of_energy_min)),
            envelope_opt: std::cmp::max(
                right.envelope_opt,
                add(
                    right.sum_of_energy_min,
                    std::cmp::max(left.envelope_opt, add(left.envelope, right.max_of_energy_delta)),
                ),
            ),
            sum_of_energy_min: left.sum_of_energy_min + right.sum_of_energy_min,
            max_of_energy_delta: std::cmp::max(left.max_of_energy_delta, right.max_of_energy_delta),
        }
    }
}

/// `O(log n)` envelope / optional-envelope queries over an event set (spec §4.2).
#[derive(Clone, Debug, Default)]
pub struct ThetaLambdaTree {
    /// Number of leaves, always a power of two (`>= 2` once `reset` has been called).
    capacity: usize,
    tree: Vec<Node>,
}

impl ThetaLambdaTree {
    pub fn new(num_events: usize) -> Self {
        let mut t = ThetaLambdaTree {
            capacity: 0,
            tree: Vec::new(),
        };
        t.reset(num_events);
        t
    }

    /// Clears all leaves and resizes if necessary for `num_events` events.
    pub fn reset(&mut self, num_events: usize) {
        let leaves = std::cmp::max(2, num_events + (num_events & 1)).next_power_of_two();
        self.capacity = leaves;
        self.tree.clear();
        self.tree.resize(2 * leaves - 1, Node::EMPTY);
    }

    fn is_leaf(&self, node: usize) -> bool {
        node >= self.capacity - 1
    }
    fn leaf_node(&self, event: EventId) -> usize {
        self.capacity - 1 + event
    }
    fn leaf_event(&self, node: usize) -> EventId {
        node - (self.capacity - 1)
    }
    fn parent(node: usize) -> usize {
        (node - 1) / 2
    }
    fn left_child(node: usize) -> usize {
        2 * node + 1
    }
    fn right_child(node: usize) -> usize {
        2 * node + 2
    }

    fn recompute(&mut self, node: usize) {
        self.tree[node] = Node::compose(self.tree[Self::left_child(node)], self.tree[Self::right_child(node)]);
    }

    fn propagate_up(&mut self, mut node: usize) {
        while node != 0 {
            node = Self::parent(node);
            self.recompute(node);
        }
    }

    /// Places `event` in the present (theta) set.
    pub fn add_or_update_event(&mut self, event: EventId, initial_envelope: IntCst, energy_min: IntCst, energy_max: IntCst) {
        debug_assert!(energy_max >= energy_min);
        let n = self.leaf_node(event);
        self.tree[n] = Node {
            envelope: add(initial_envelope, energy_min),
            envelope_opt: add(initial_envelope, energy_max),
            sum_of_energy_min: energy_min,
            max_of_energy_delta: energy_max - energy_min,
        };
        self.propagate_up(n);
    }

    /// Places `event` only in the lambda (optional) set: it contributes to `envelope_opt` but not
    /// to `envelope`.
    pub fn add_or_update_optional_event(&mut self, event: EventId, initial_envelope_opt: IntCst, energy_max: IntCst) {
        let n = self.leaf_node(event);
        self.tree[n] = Node {
            envelope: Node::EMPTY.envelope,
            envelope_opt: add(initial_envelope_opt, energy_max),
            sum_of_energy_min: 0,
            max_of_energy_delta: energy_max,
        };
        self.propagate_up(n);
    }

    /// Removes `event` from both the theta and lambda sets.
    pub fn remove_event(&mut self, event: EventId) {
        let n = self.leaf_node(event);
        self.tree[n] = Node::EMPTY;
        self.propagate_up(n);
    }

    pub fn get_envelope(&self) -> IntCst {
        self.tree[0].envelope
    }

    pub fn get_optional_envelope(&self) -> IntCst {
        self.tree[0].envelope_opt
    }

    /// Envelope contributed by the prefix of events `0..=event` (in leaf order), ignoring every
    /// event placed after it in the tree. Used to reconstruct the reason for a critical event.
    pub fn get_envelope_of(&self, event: EventId) -> IntCst {
        let mut acc = Node::EMPTY;
        for e in 0..=event {
            acc = Node::compose(acc, self.tree[self.leaf_node(e)]);
        }
        acc.envelope
    }

    /// Returns the rightmost (in leaf/event order) theta event whose prefix envelope exceeds
    /// `target`, or `None` if the whole tree's envelope does not exceed it.
    pub fn get_max_event_with_envelope_greater_than(&self, target: IntCst) -> Option<EventId> {
        if self.tree[0].envelope <= target {
            return None;
        }
        let mut node = 0usize;
        let mut threshold = target;
        while !self.is_leaf(node) {
            let r = Self::right_child(node);
            if self.tree[r].envelope > threshold {
                node = r;
            } else {
                threshold -= self.tree[r].sum_of_energy_min;
                node = Self::left_child(node);
            }
        }
        Some(self.leaf_event(node))
    }

    /// Given `get_optional_envelope() > target`, locates the lambda event responsible for the
    /// excess and a theta event explaining the remaining (non-optional) part.
    ///
    /// Returns `(critical_event, optional_event, available_energy)`: `optional_event` is the
    /// event that should be extracted (pushed absent, or whose start should be pushed in
    /// edge-finding); `critical_event` is a theta event whose own envelope already explains
    /// `available_energy` units of the excess.
    pub fn get_events_with_optional_envelope_greater_than(&self, target: IntCst) -> (EventId, EventId, IntCst) {
        debug_assert!(self.get_optional_envelope() > target);
        let (opt_event, plain_envelope_reached) = self.descend_optional(0, target);
        let critical_event = self
            .get_max_event_with_envelope_greater_than(plain_envelope_reached - 1)
            .unwrap_or(opt_event);
        let available_energy = plain_envelope_reached.saturating_sub(target);
        (critical_event, opt_event, available_energy)
    }

    fn descend_optional(&self, node: usize, target: IntCst) -> (EventId, IntCst) {
        if self.is_leaf(node) {
            return (self.leaf_event(node), self.tree[node].envelope);
        }
        let l = Self::left_child(node);
        let r = Self::right_child(node);
        let left = self.tree[l];
        let right = self.tree[r];
        let a = right.envelope_opt;
        let b = add(right.sum_of_energy_min, left.envelope_opt);
        let c = add(add(right.sum_of_energy_min, left.envelope), right.max_of_energy_delta);
        if a >= b && a >= c {
            self.descend_optional(r, target)
        } else if b >= c {
            let (event, plain) = self.descend_optional(l, target - right.sum_of_energy_min);
            (event, add(plain, right.sum_of_energy_min))
        } else {
            let event = self.find_max_delta_leaf(r);
            (event, add(left.envelope, right.sum_of_energy_min))
        }
    }

    fn find_max_delta_leaf(&self, node: usize) -> EventId {
        if self.is_leaf(node) {
            return self.leaf_event(node);
        }
        let l = Self::left_child(node);
        let r = Self::right_child(node);
        if self.tree[r].max_of_energy_delta >= self.tree[l].max_of_energy_delta {
            self.find_max_delta_leaf(r)
        } else {
            self.find_max_delta_leaf(l)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_has_no_envelope() {
        let t = ThetaLambdaTree::new(4);
        assert_eq!(t.get_envelope(), Node::EMPTY.envelope);
    }

    #[test]
    fn single_event_envelope() {
        let mut t = ThetaLambdaTree::new(1);
        t.add_or_update_event(0, 10, 5, 5);
        assert_eq!(t.get_envelope(), 15);
        assert_eq!(t.get_optional_envelope(), 15);
    }

    #[test]
    fn optional_event_only_contributes_to_opt_envelope() {
        let mut t = ThetaLambdaTree::new(1);
        t.add_or_update_optional_event(0, 10, 7);
        assert_eq!(t.get_envelope(), Node::EMPTY.envelope);
        assert_eq!(t.get_optional_envelope(), 17);
    }

    #[test]
    fn composition_matches_manual_computation() {
        let mut t = ThetaLambdaTree::new(3);
        // Three present events inserted with increasing initial envelope (simulating
        // insertion by increasing deadline, as the overload checker does).
        t.add_or_update_event(0, 0, 3, 3);
        t.add_or_update_event(1, 0, 2, 4);
        t.add_or_update_event(2, 0, 5, 5);
        // envelope = running end-min when packed left-to-right in leaf order.
        assert_eq!(t.get_envelope(), 3 + 2 + 5);
        assert!(t.get_optional_envelope() >= t.get_envelope());
    }

    #[test]
    fn remove_event_restores_identity() {
        let mut t = ThetaLambdaTree::new(2);
        t.add_or_update_event(0, 0, 4, 4);
        t.add_or_update_event(1, 0, 6, 6);
        assert_eq!(t.get_envelope(), 10);
        t.remove_event(0);
        assert_eq!(t.get_envelope(), 6);
    }

    #[test]
    fn max_event_with_envelope_greater_than() {
        let mut t = ThetaLambdaTree::new(3);
        t.add_or_update_event(0, 0, 3, 3);
        t.add_or_update_event(1, 0, 2, 4);
        t.add_or_update_event(2, 0, 5, 5);
        assert_eq!(t.get_max_event_with_envelope_greater_than(9), Some(2));
        assert_eq!(t.get_max_event_with_envelope_greater_than(100), None);
    }

    #[test]
    fn locate_optional_event_causing_overload() {
        let mut t = ThetaLambdaTree::new(2);
        t.add_or_update_event(0, 0, 3, 3);
        t.add_or_update_optional_event(1, 0, 20);
        assert_eq!(t.get_envelope(), 3);
        assert_eq!(t.get_optional_envelope(), 23);
        let (_critical, optional, available) = t.get_events_with_optional_envelope_greater_than(3);
        assert_eq!(optional, 1);
        assert!(available > 0);
    }
}
