//! Cell model (C1).
//!
//! A `Cell` is a pure value carrier: it exposes exactly two operations,
//! reading its value and comparing itself against another cell. It carries
//! no engine state — status, algotype, sort direction, boundaries, and
//! group membership all live in the parallel metadata arrays on [`crate::array::Array`]
//! (see `DESIGN.md` for the rationale).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;

/// Bound satisfied by any value usable as a cell payload: comparable,
/// cheap to clone (snapshots copy sequences of these), and shippable
/// across the engine's worker threads.
pub trait CellValue: Ord + Clone + Debug + Send + Sync + 'static {}

impl<T: Ord + Clone + Debug + Send + Sync + 'static> CellValue for T {}

/// A pure value carrier. Two cells are equal iff their values are equal;
/// `compare_to` is the total order every sorting policy uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell<V: CellValue> {
    value: V,
}

impl<V: CellValue> Cell<V> {
    pub fn new(value: V) -> Self {
        Cell { value }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn compare_to(&self, other: &Cell<V>) -> Ordering {
        self.value.cmp(&other.value)
    }
}

/// The local swap policy a cell follows. `Bubble` compares with both
/// neighbors, `Insertion` walks left until in order, `Selection` tracks the
/// global extremum among the positions to its right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Algotype {
    Bubble,
    Insertion,
    Selection,
}

impl Algotype {
    pub fn name(&self) -> &'static str {
        match self {
            Algotype::Bubble => "BUBBLE",
            Algotype::Insertion => "INSERTION",
            Algotype::Selection => "SELECTION",
        }
    }

    pub fn parse(name: &str) -> Option<Algotype> {
        match name.to_ascii_uppercase().as_str() {
            "BUBBLE" => Some(Algotype::Bubble),
            "INSERTION" => Some(Algotype::Insertion),
            "SELECTION" => Some(Algotype::Selection),
            _ => None,
        }
    }
}

/// Target total order for the whole array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Increasing,
    Decreasing,
}

impl Direction {
    /// True if `lhs` at the lower position violates this direction relative
    /// to `rhs` at the higher position (i.e. the pair needs a swap).
    pub fn violates<V: CellValue>(&self, lower: &V, higher: &V) -> bool {
        match self {
            Direction::Increasing => lower > higher,
            Direction::Decreasing => lower < higher,
        }
    }
}

/// Per-position lifecycle status. Lives in the metadata array, not on the
/// cell itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellStatus {
    Active,
    Sleep,
    /// Reserved: no transition in this engine currently produces it.
    Merge,
    Moving,
    Inactive,
    Error,
    /// May be the target of a swap but never initiates one.
    Freeze,
}

impl CellStatus {
    /// Rule 1 of the swap protocol: a cell in any of these statuses makes a
    /// swap involving it (proposer or target) decline outright, with no
    /// counter incremented.
    pub fn blocks_any_swap(&self) -> bool {
        matches!(
            self,
            CellStatus::Moving | CellStatus::Inactive | CellStatus::Sleep | CellStatus::Merge
        )
    }

    /// Rule 2: a `Freeze` proposer declines and the attempt is counted as a
    /// frozen-swap attempt. `Freeze` is not covered by `blocks_any_swap`
    /// because it may still be a swap *target*.
    pub fn is_freeze(&self) -> bool {
        matches!(self, CellStatus::Freeze)
    }
}
