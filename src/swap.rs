//! Swap protocol (C3, §4.3): the one operation through which positions
//! ever change, `propose_swap(i, j)`.

use crate::array::Array;
use crate::cell::{CellStatus, CellValue};
use crate::probe::Probe;

/// Outcome of a single `propose_swap` call, used by the execution engine to
/// decide whether a position's single swap-per-step budget was spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The exchange happened; the proposer is now at `target`.
    Exchanged,
    /// Declined per rule 1 (either side is Moving/Inactive/Sleep/Merge).
    DeclinedBlocked,
    /// Declined per rule 2 (proposer is Freeze); counted as a frozen
    /// attempt.
    DeclinedFrozen,
    /// The values no longer violate the direction under lock — the
    /// decision was stale between proposal and commit (§7 "swap race").
    AbortedStale,
}

/// Attempts to swap the cells at `i` (proposer) and `j` (target).
///
/// Implements §4.3 steps 1-5 in order: blocked-status decline, freeze
/// decline (counted), canonical-order pair lock, re-check under lock, and
/// on success the position exchange plus ideal-position/counter updates.
pub fn propose_swap<V: CellValue>(
    array: &Array<V>,
    i: usize,
    j: usize,
    probe: &Probe<V>,
) -> SwapOutcome {
    // Cheap pre-checks without holding any lock, to avoid paying the lock
    // cost for the common "nothing to do" case. The authoritative check
    // happens again once the pair lock is held (step 4).
    if array.status(i).blocks_any_swap() || array.status(j).blocks_any_swap() {
        return SwapOutcome::DeclinedBlocked;
    }
    if array.status(i).is_freeze() {
        probe.count_frozen_swap_attempt();
        return SwapOutcome::DeclinedFrozen;
    }

    let (mut lo, mut hi) = array.lock_pair(i, j);
    let (lo_pos, hi_pos) = if i < j { (i, j) } else { (j, i) };

    if lo.status.blocks_any_swap() || hi.status.blocks_any_swap() {
        return SwapOutcome::DeclinedBlocked;
    }
    let proposer_is_lo = i == lo_pos;
    let proposer_status = if proposer_is_lo { lo.status } else { hi.status };
    if proposer_status.is_freeze() {
        probe.count_frozen_swap_attempt();
        return SwapOutcome::DeclinedFrozen;
    }

    let direction = array.direction(i);
    let lo_value = lo.cell.value().clone();
    let hi_value = hi.cell.value().clone();
    let still_violates = direction.violates(&lo_value, &hi_value);
    if !still_violates {
        return SwapOutcome::AbortedStale;
    }

    std::mem::swap(&mut lo.cell, &mut hi.cell);
    // The ideal-position tracker names an index relative to the scan that
    // produced it; once the swap lands, that scan is stale and the next
    // step's `Selection::propose` recomputes it from scratch.
    lo.ideal_position = None;
    hi.ideal_position = None;
    lo.previous_status = lo.status;
    hi.previous_status = hi.status;

    probe.record_compare_and_swap();
    SwapOutcome::Exchanged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::cell::{Algotype, Direction};

    fn array_of(values: Vec<i64>) -> Array<i64> {
        let n = values.len();
        Array::new(values, vec![Algotype::Bubble; n], vec![Direction::Increasing; n])
    }

    #[test]
    fn exchanges_when_violating() {
        let array = array_of(vec![5, 1]);
        let probe = Probe::new(true);
        assert_eq!(propose_swap(&array, 0, 1, &probe), SwapOutcome::Exchanged);
        assert_eq!(array.values(), vec![1, 5]);
        assert_eq!(probe.compare_and_swap_count(), 1);
    }

    /// Proposer index greater than target index (the shape every
    /// `Insertion::propose` call takes: `propose_swap(array, pos, pos-1,
    /// probe)`). Must behave identically to the `i < j` case above: the
    /// values exchange and the comparison used to decide that is taken in
    /// position order, not argument order.
    #[test]
    fn exchanges_when_violating_with_proposer_index_above_target() {
        let array = array_of(vec![5, 1]);
        let probe = Probe::new(true);
        assert_eq!(propose_swap(&array, 1, 0, &probe), SwapOutcome::Exchanged);
        assert_eq!(array.values(), vec![1, 5]);
        assert_eq!(probe.compare_and_swap_count(), 1);
    }

    /// Same index order, but already correctly ordered: must not swap.
    #[test]
    fn aborts_stale_with_proposer_index_above_target_when_already_ordered() {
        let array = array_of(vec![1, 5]);
        let probe = Probe::new(true);
        assert_eq!(propose_swap(&array, 1, 0, &probe), SwapOutcome::AbortedStale);
        assert_eq!(array.values(), vec![1, 5]);
    }

    #[test]
    fn aborts_stale_when_already_in_order() {
        let array = array_of(vec![1, 5]);
        let probe = Probe::new(true);
        assert_eq!(propose_swap(&array, 0, 1, &probe), SwapOutcome::AbortedStale);
        assert_eq!(array.values(), vec![1, 5]);
        assert_eq!(probe.compare_and_swap_count(), 0);
    }

    #[test]
    fn declines_when_target_moving() {
        let array = array_of(vec![5, 1]);
        array.lock(1).status = CellStatus::Moving;
        let probe = Probe::new(true);
        assert_eq!(propose_swap(&array, 0, 1, &probe), SwapOutcome::DeclinedBlocked);
    }

    #[test]
    fn freeze_proposer_declines_and_is_counted() {
        let array = array_of(vec![5, 1]);
        array.lock(0).status = CellStatus::Freeze;
        let probe = Probe::new(true);
        assert_eq!(propose_swap(&array, 0, 1, &probe), SwapOutcome::DeclinedFrozen);
        assert_eq!(probe.frozen_swap_attempt_count(), 1);
        // a frozen cell may still be a swap *target*
        let array2 = array_of(vec![5, 1]);
        array2.lock(1).status = CellStatus::Freeze;
        let probe2 = Probe::new(true);
        assert_eq!(propose_swap(&array2, 0, 1, &probe2), SwapOutcome::Exchanged);
    }
}
