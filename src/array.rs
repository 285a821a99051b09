//! The array (§3) and its per-position metadata.
//!
//! `Array<V>` stores `N` cells at dense positions `[0, N)`. Per the design
//! notes (§9), cells themselves carry no engine state: status, the ideal
//! position tracker, algotype, direction, and group boundaries live in
//! parallel metadata here, a struct-of-arrays indexed by position, instead
//! of on an inheritance stack of "cell" types.
//!
//! Two independent lock granularities guard this metadata (§5):
//! - a `parking_lot::Mutex` *per position* guards that position's value,
//!   status, and ideal-position tracker — the swap protocol locks two of
//!   these in canonical `min, max` order to commit one swap;
//! - `group_id`/`left_boundary`/`right_boundary` are atomics, mutated only
//!   by the group layer while it holds the single array-wide lock
//!   ([`crate::group::GroupArena`]'s `RwLock`), and readable lock-free
//!   elsewhere for fast boundary checks (P4).
//!
//! `algotype` and `direction` are fixed at trial start and never mutated
//! afterward, so they need no synchronization at all.

use crate::cell::{Algotype, Cell, CellStatus, CellValue, Direction};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering as AtomicOrdering};

/// Sentinel meaning "not yet assigned to a group."
pub const NO_GROUP: u32 = u32::MAX;

/// Per-position data guarded by that position's mutex.
pub struct PositionSlot<V: CellValue> {
    pub cell: Cell<V>,
    pub status: CellStatus,
    pub previous_status: CellStatus,
    /// Only meaningful for `Algotype::Selection`: the position currently
    /// believed to hold the extremum of `[p, N)`.
    pub ideal_position: Option<usize>,
}

impl<V: CellValue> PositionSlot<V> {
    fn new(value: V) -> Self {
        PositionSlot {
            cell: Cell::new(value),
            status: CellStatus::Active,
            previous_status: CellStatus::Active,
            ideal_position: None,
        }
    }
}

/// The fixed-length, position-addressable array of cells plus metadata.
pub struct Array<V: CellValue> {
    slots: Vec<Mutex<PositionSlot<V>>>,
    algotype: Vec<Algotype>,
    direction: Vec<Direction>,
    group_id: Vec<AtomicU32>,
    left_boundary: Vec<AtomicUsize>,
    right_boundary: Vec<AtomicUsize>,
    /// Among `Insertion`-algotype members of a merged group, only the
    /// leftmost drives its chain (§4.5 merge behavior); everyone starts as
    /// their own driver until a merge says otherwise.
    insertion_driver: Vec<AtomicBool>,
}

impl<V: CellValue> Array<V> {
    /// Builds a new array from per-position values, algotypes, and
    /// directions. All three slices must have the same length; boundaries
    /// start as singleton groups `[p, p]` with no group assigned, the
    /// caller (typically [`crate::group::GroupArena::singletons`]) wires up
    /// real groups afterward.
    pub fn new(values: Vec<V>, algotype: Vec<Algotype>, direction: Vec<Direction>) -> Self {
        assert_eq!(values.len(), algotype.len());
        assert_eq!(values.len(), direction.len());
        let n = values.len();
        let slots = values
            .into_iter()
            .map(|v| Mutex::new(PositionSlot::new(v)))
            .collect();
        let left_boundary = (0..n).map(AtomicUsize::new).collect();
        let right_boundary = (0..n).map(AtomicUsize::new).collect();
        Array {
            slots,
            algotype,
            direction,
            group_id: (0..n).map(|_| AtomicU32::new(NO_GROUP)).collect(),
            left_boundary,
            right_boundary,
            insertion_driver: (0..n).map(|_| AtomicBool::new(true)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn algotype(&self, pos: usize) -> Algotype {
        self.algotype[pos]
    }

    pub fn direction(&self, pos: usize) -> Direction {
        self.direction[pos]
    }

    /// Locks a single position's slot.
    pub fn lock(&self, pos: usize) -> MutexGuard<'_, PositionSlot<V>> {
        self.slots[pos].lock()
    }

    /// Locks two positions in canonical `min, max` order, preventing
    /// deadlock when two adjacent cells swap symmetrically (§4.3 step 3).
    /// Always returns `(guard-for-min-position, guard-for-max-position)`,
    /// regardless of the order `i`/`j` were passed in — callers that need
    /// to know which guard corresponds to which of `i`/`j` compute that
    /// correspondence themselves from `i < j`.
    pub fn lock_pair(&self, i: usize, j: usize) -> (MutexGuard<'_, PositionSlot<V>>, MutexGuard<'_, PositionSlot<V>>) {
        assert_ne!(i, j, "a cell cannot swap with itself");
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        let lo_guard = self.slots[lo].lock();
        let hi_guard = self.slots[hi].lock();
        (lo_guard, hi_guard)
    }

    /// A defensive copy of every position's current value, in position
    /// order. Used by the probe to build a `StepSnapshot`.
    pub fn values(&self) -> Vec<V> {
        self.slots.iter().map(|s| s.lock().cell.value().clone()).collect()
    }

    /// A defensive copy of the algotype at every position (for the
    /// algotype histogram recorded alongside a snapshot).
    pub fn algotypes(&self) -> Vec<Algotype> {
        self.algotype.clone()
    }

    pub fn status(&self, pos: usize) -> CellStatus {
        self.slots[pos].lock().status
    }

    pub fn group_id(&self, pos: usize) -> Option<u32> {
        let id = self.group_id[pos].load(AtomicOrdering::Acquire);
        if id == NO_GROUP {
            None
        } else {
            Some(id)
        }
    }

    pub fn set_group_id(&self, pos: usize, group_id: u32) {
        self.group_id[pos].store(group_id, AtomicOrdering::Release);
    }

    pub fn boundaries(&self, pos: usize) -> (usize, usize) {
        (
            self.left_boundary[pos].load(AtomicOrdering::Acquire),
            self.right_boundary[pos].load(AtomicOrdering::Acquire),
        )
    }

    pub fn set_boundaries(&self, pos: usize, left: usize, right: usize) {
        self.left_boundary[pos].store(left, AtomicOrdering::Release);
        self.right_boundary[pos].store(right, AtomicOrdering::Release);
    }

    /// P4: every cell's cached boundary must contain its own position.
    pub fn boundary_contains_self(&self, pos: usize) -> bool {
        let (l, r) = self.boundaries(pos);
        l <= pos && pos <= r
    }

    pub fn insertion_driver(&self, pos: usize) -> bool {
        self.insertion_driver[pos].load(AtomicOrdering::Acquire)
    }

    pub fn set_insertion_driver(&self, pos: usize, is_driver: bool) {
        self.insertion_driver[pos].store(is_driver, AtomicOrdering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_array(n: usize) -> Array<i64> {
        let values = (0..n as i64).collect();
        let algotype = vec![Algotype::Bubble; n];
        let direction = vec![Direction::Increasing; n];
        Array::new(values, algotype, direction)
    }

    #[test]
    fn values_round_trip_in_position_order() {
        let array = test_array(5);
        assert_eq!(array.values(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn lock_pair_always_locks_lower_index_first() {
        let array = test_array(5);
        let (lo, hi) = array.lock_pair(3, 1);
        assert_eq!(*lo.cell.value(), 1);
        assert_eq!(*hi.cell.value(), 3);
    }

    #[test]
    fn boundaries_default_to_singleton() {
        let array = test_array(4);
        for p in 0..4 {
            assert_eq!(array.boundaries(p), (p, p));
            assert!(array.boundary_contains_self(p));
        }
    }

    #[test]
    fn group_id_defaults_unassigned() {
        let array = test_array(3);
        assert_eq!(array.group_id(0), None);
        array.set_group_id(0, 7);
        assert_eq!(array.group_id(0), Some(7));
    }
}
