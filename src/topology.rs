//! Topology (C2, §4.2): given a position and algotype, which neighbors may
//! this cell inspect, and in what order does the sequential executor visit
//! positions.

use crate::array::Array;
use crate::cell::{Algotype, CellValue, Direction};

/// Maps `(position, algotype)` to visible neighbor positions, and decides
/// the (at most one) swap a cell proposes during a step.
pub trait Topology<V: CellValue>: Send + Sync {
    /// Visible neighbor positions for `pos` in an array of length `n`.
    fn neighbors(&self, pos: usize, n: usize, algotype: Algotype) -> Vec<usize>;

    /// Iteration order over `[0, n)` for the sequential executor.
    fn iteration_order(&self, n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    /// The single algotype this topology implements, or `None` for a
    /// dispatcher like [`Chimeric`] that reads each position's own
    /// algotype and can't be "mismatched" by construction. The engine
    /// checks this against the array's per-position metadata before
    /// calling `propose`.
    fn expected_algotype(&self) -> Option<Algotype> {
        None
    }

    /// Decide the swap `pos` proposes this step, or `None` if it proposes
    /// nothing. Does not itself commit the swap — see [`crate::swap`].
    fn propose(&self, pos: usize, array: &Array<V>) -> Option<usize>;
}

/// `{p-1, p+1} ∩ [0,N)`; swaps with whichever neighbor violates the sort
/// direction, right neighbor preferred on a tie (both violate).
pub struct Bubble;

impl<V: CellValue> Topology<V> for Bubble {
    fn neighbors(&self, pos: usize, n: usize, _algotype: Algotype) -> Vec<usize> {
        let mut out = Vec::with_capacity(2);
        if pos > 0 {
            out.push(pos - 1);
        }
        if pos + 1 < n {
            out.push(pos + 1);
        }
        out
    }

    fn expected_algotype(&self) -> Option<Algotype> {
        Some(Algotype::Bubble)
    }

    fn propose(&self, pos: usize, array: &Array<V>) -> Option<usize> {
        let n = array.len();
        let direction = array.direction(pos);
        let my_value = array.lock(pos).cell.value().clone();

        let right = pos + 1;
        let right_violates = right < n && {
            let rv = array.lock(right).cell.value().clone();
            direction.violates(&my_value, &rv)
        };
        if right_violates {
            return Some(right);
        }

        if pos > 0 {
            let left = pos - 1;
            let lv = array.lock(left).cell.value().clone();
            // From the left neighbor's point of view, `left` is lower and
            // `pos` is higher; it violates direction iff lv/my pair does.
            if direction.violates(&lv, &my_value) {
                return Some(left);
            }
        }
        None
    }
}

/// `{p-1}`; swap with the left neighbor while it violates direction. One
/// call moves the cell one step left; repeated steps walk it further.
pub struct Insertion;

impl<V: CellValue> Topology<V> for Insertion {
    fn neighbors(&self, pos: usize, _n: usize, _algotype: Algotype) -> Vec<usize> {
        if pos > 0 {
            vec![pos - 1]
        } else {
            Vec::new()
        }
    }

    fn expected_algotype(&self) -> Option<Algotype> {
        Some(Algotype::Insertion)
    }

    fn propose(&self, pos: usize, array: &Array<V>) -> Option<usize> {
        if pos == 0 || !array.insertion_driver(pos) {
            return None;
        }
        let left = pos - 1;
        let direction = array.direction(pos);
        let lv = array.lock(left).cell.value().clone();
        let my_value = array.lock(pos).cell.value().clone();
        if direction.violates(&lv, &my_value) {
            Some(left)
        } else {
            None
        }
    }
}

/// `∅`; finds the minimum (Increasing) or maximum (Decreasing) among
/// `[p, N)` and swaps with it once per step, tracked via `ideal_position`.
pub struct Selection;

impl<V: CellValue> Topology<V> for Selection {
    fn neighbors(&self, _pos: usize, _n: usize, _algotype: Algotype) -> Vec<usize> {
        Vec::new()
    }

    fn expected_algotype(&self) -> Option<Algotype> {
        Some(Algotype::Selection)
    }

    fn propose(&self, pos: usize, array: &Array<V>) -> Option<usize> {
        let n = array.len();
        let direction = array.direction(pos);
        let mut best = pos;
        let mut best_value = array.lock(pos).cell.value().clone();
        for candidate in (pos + 1)..n {
            let cv = array.lock(candidate).cell.value().clone();
            let improves = match direction {
                Direction::Increasing => cv < best_value,
                Direction::Decreasing => cv > best_value,
            };
            if improves {
                best = candidate;
                best_value = cv;
            }
        }
        array.lock(pos).ideal_position = Some(best);
        if best == pos {
            None
        } else {
            Some(best)
        }
    }
}

/// Dispatches by the target cell's algotype, so a single execution engine
/// can drive a chimeric (mixed-algotype) population.
pub struct Chimeric {
    bubble: Bubble,
    insertion: Insertion,
    selection: Selection,
}

impl Chimeric {
    pub fn new() -> Self {
        Chimeric {
            bubble: Bubble,
            insertion: Insertion,
            selection: Selection,
        }
    }
}

impl Default for Chimeric {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: CellValue> Topology<V> for Chimeric {
    fn neighbors(&self, pos: usize, n: usize, algotype: Algotype) -> Vec<usize> {
        match algotype {
            Algotype::Bubble => <Bubble as Topology<V>>::neighbors(&self.bubble, pos, n, algotype),
            Algotype::Insertion => <Insertion as Topology<V>>::neighbors(&self.insertion, pos, n, algotype),
            Algotype::Selection => <Selection as Topology<V>>::neighbors(&self.selection, pos, n, algotype),
        }
    }

    fn propose(&self, pos: usize, array: &Array<V>) -> Option<usize> {
        match array.algotype(pos) {
            Algotype::Bubble => self.bubble.propose(pos, array),
            Algotype::Insertion => self.insertion.propose(pos, array),
            Algotype::Selection => self.selection.propose(pos, array),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Algotype as A;

    fn array_of(values: Vec<i64>, direction: Direction) -> Array<i64> {
        let n = values.len();
        Array::new(values, vec![A::Bubble; n], vec![direction; n])
    }

    #[test]
    fn bubble_neighbors_at_edges() {
        let t = Bubble;
        let array = array_of(vec![1, 2, 3], Direction::Increasing);
        assert_eq!(Topology::<i64>::neighbors(&t, 0, array.len(), A::Bubble), vec![1]);
        assert_eq!(Topology::<i64>::neighbors(&t, 2, array.len(), A::Bubble), vec![1]);
        assert_eq!(Topology::<i64>::neighbors(&t, 1, array.len(), A::Bubble), vec![0, 2]);
    }

    #[test]
    fn bubble_prefers_right_on_tie_violation() {
        // [3, 1, 1] increasing: position 0 sees both neighbors violating
        // (both are smaller); right neighbor (position 1) wins the tie.
        let array = array_of(vec![3, 1, 1], Direction::Increasing);
        let t = Bubble;
        assert_eq!(t.propose(0, &array), Some(1));
    }

    #[test]
    fn insertion_walks_toward_left_violation() {
        let array = array_of(vec![5, 1], Direction::Increasing);
        let t = Insertion;
        assert_eq!(t.propose(1, &array), Some(0));
        assert_eq!(t.propose(0, &array), None);
    }

    #[test]
    fn insertion_non_driver_proposes_nothing() {
        let array = array_of(vec![5, 1], Direction::Increasing);
        array.set_insertion_driver(1, false);
        let t = Insertion;
        assert_eq!(t.propose(1, &array), None);
    }

    #[test]
    fn selection_finds_global_minimum_to_the_right() {
        let array = array_of(vec![5, 3, 1, 4], Direction::Increasing);
        let t = Selection;
        assert_eq!(t.propose(0, &array), Some(2));
        assert_eq!(array.lock(0).ideal_position, Some(2));
    }

    #[test]
    fn selection_proposes_nothing_when_already_ideal() {
        let array = array_of(vec![1, 3, 4, 5], Direction::Increasing);
        let t = Selection;
        assert_eq!(t.propose(0, &array), None);
    }
}
