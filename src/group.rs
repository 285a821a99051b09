//! Group layer (C5, §4.5): contiguous ranges with their own sleep/wake
//! control loop, merging with sorted, active neighbors into larger ranges.

use crate::array::Array;
use crate::cell::{CellStatus, CellValue};
use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupStatus {
    Active,
    Sleep,
    Merged,
}

/// A contiguous range of positions with its own phase/countdown clock.
/// Group ids are assigned monotonically and never reused (P7).
#[derive(Clone, Copy, Debug)]
pub struct Group {
    pub id: u32,
    pub left: usize,
    pub right: usize,
    pub status: GroupStatus,
    pub phase_period: u32,
    pub countdown: u32,
}

/// The array-wide lock (§5): the only lock that guards group-structural
/// mutations (merge, boundary updates, group-pointer reassignment).
/// Only group threads and the merge path take it.
pub struct GroupArena {
    groups: RwLock<Vec<Group>>,
}

impl GroupArena {
    /// One singleton group `[p, p]` per position — the common starting
    /// configuration described in §3.
    pub fn singletons<V: CellValue>(array: &Array<V>, phase_period: u32) -> Self {
        let n = array.len();
        let groups = (0..n)
            .map(|p| Group {
                id: p as u32,
                left: p,
                right: p,
                status: GroupStatus::Active,
                phase_period,
                countdown: phase_period,
            })
            .collect();
        for p in 0..n {
            array.set_group_id(p, p as u32);
            array.set_boundaries(p, p, p);
        }
        GroupArena {
            groups: RwLock::new(groups),
        }
    }

    /// A single group covering the whole array.
    pub fn whole_array<V: CellValue>(array: &Array<V>, phase_period: u32) -> Self {
        let n = array.len();
        if n == 0 {
            return GroupArena { groups: RwLock::new(Vec::new()) };
        }
        for p in 0..n {
            array.set_group_id(p, 0);
            array.set_boundaries(p, 0, n - 1);
        }
        GroupArena {
            groups: RwLock::new(vec![Group {
                id: 0,
                left: 0,
                right: n - 1,
                status: GroupStatus::Active,
                phase_period,
                countdown: phase_period,
            }]),
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }

    pub fn get(&self, id: u32) -> Group {
        self.groups.read()[id as usize]
    }

    pub fn all(&self) -> Vec<Group> {
        self.groups.read().clone()
    }

    /// P3: groups partition `[0, N)` with no overlaps and no gaps, counting
    /// only non-`Merged` groups.
    pub fn partitions_cleanly(&self, n: usize) -> bool {
        let groups = self.groups.read();
        let mut live: Vec<&Group> = groups.iter().filter(|g| g.status != GroupStatus::Merged).collect();
        live.sort_by_key(|g| g.left);
        let mut expected = 0usize;
        for g in live {
            if g.left != expected || g.right < g.left || g.right >= n {
                return false;
            }
            expected = g.right + 1;
        }
        expected == n
    }

    /// The group owning position `g.right + 1`, or `None` if `g.right`
    /// is the last position.
    pub fn find_next_group<V: CellValue>(&self, id: u32, array: &Array<V>) -> Option<u32> {
        let group = self.get(id);
        if group.right + 1 >= array.len() {
            return None;
        }
        array.group_id(group.right + 1)
    }

    /// Walks `[g.left, g.right]`: false if any cell is `Sleep` or `Moving`,
    /// or if the sequence violates direction. `Freeze` cells participate in
    /// the order comparison.
    pub fn is_sorted<V: CellValue>(&self, id: u32, array: &Array<V>) -> bool {
        let group = self.get(id);
        let direction = array.direction(group.left);
        let mut prev_value = None;
        for pos in group.left..=group.right {
            let slot = array.lock(pos);
            if matches!(slot.status, CellStatus::Sleep | CellStatus::Moving) {
                return false;
            }
            let value = slot.cell.value().clone();
            if let Some(ref prev) = prev_value {
                if direction.violates(prev, &value) {
                    return false;
                }
            }
            prev_value = Some(value);
        }
        true
    }

    /// Absorbs `h` (which must be `g`'s immediate right neighbor) into `g`.
    /// Must be called while both groups are `Active` and sorted (the
    /// supervisor enforces this before calling).
    pub fn merge<V: CellValue>(&self, g: u32, h: u32, array: &Array<V>) -> EngineResult<()> {
        let mut groups = self.groups.write();
        let (g_idx, h_idx) = (g as usize, h as usize);
        if g_idx >= groups.len() || h_idx >= groups.len() {
            return Err(EngineError::GroupInvariantViolation(format!(
                "merge referenced unknown group id ({g}, {h})"
            )));
        }
        let g_group = groups[g_idx];
        let h_group = groups[h_idx];
        if h_group.left != g_group.right + 1 {
            return Err(EngineError::GroupInvariantViolation(format!(
                "merge target {h} (left={}) is not the immediate right neighbor of {g} (right={})",
                h_group.left, g_group.right
            )));
        }

        let new_right = h_group.right;
        let merged_countdown = g_group.countdown.min(h_group.countdown);
        let merged_phase = g_group.phase_period.min(h_group.phase_period);

        groups[h_idx].status = GroupStatus::Merged;
        groups[g_idx].right = new_right;
        groups[g_idx].countdown = merged_countdown;
        groups[g_idx].phase_period = merged_phase;

        let merged_left = g_group.left;
        drop(groups);

        let mut leftmost_insertion: Option<usize> = None;
        for pos in merged_left..=new_right {
            array.set_group_id(pos, g);
            array.set_boundaries(pos, merged_left, new_right);
            if array.algotype(pos) == crate::cell::Algotype::Insertion && leftmost_insertion.is_none() {
                leftmost_insertion = Some(pos);
            }
            // `updateForGroupMerge`: the ideal-position tracker is
            // relative to a scan that predates the merge; drop it so the
            // next step recomputes cleanly.
            array.lock(pos).ideal_position = None;
        }
        if let Some(driver) = leftmost_insertion {
            for pos in merged_left..=new_right {
                if array.algotype(pos) == crate::cell::Algotype::Insertion {
                    array.set_insertion_driver(pos, pos == driver);
                }
            }
        }

        info!(group = g, absorbed = h, new_right, "group merge");
        Ok(())
    }

    /// Saves each member cell's status and puts it to `Sleep`, skipping
    /// `Moving` and `Inactive` cells.
    pub fn sleep_cells<V: CellValue>(&self, id: u32, array: &Array<V>) {
        let group = self.get(id);
        for pos in group.left..=group.right {
            let mut slot = array.lock(pos);
            if matches!(slot.status, CellStatus::Moving | CellStatus::Inactive) {
                continue;
            }
            slot.previous_status = slot.status;
            slot.status = CellStatus::Sleep;
        }
    }

    /// Restores each member cell's previously saved status, skipping
    /// `Moving` and `Inactive` cells.
    pub fn wake_cells<V: CellValue>(&self, id: u32, array: &Array<V>) {
        let group = self.get(id);
        for pos in group.left..=group.right {
            let mut slot = array.lock(pos);
            if matches!(slot.status, CellStatus::Moving | CellStatus::Inactive) {
                continue;
            }
            slot.status = slot.previous_status;
        }
    }

    pub fn all_members_inactive<V: CellValue>(&self, id: u32, array: &Array<V>) -> bool {
        let group = self.get(id);
        (group.left..=group.right).all(|pos| array.status(pos) == CellStatus::Inactive)
    }
}

/// Runs lifecycle ticks for every live group. Per the design notes (§9),
/// this is a single supervisor rather than one OS thread per group, so
/// thread count is bounded by the caller's worker pool, not by the number
/// of live groups.
pub struct GroupSupervisor {
    arena: Arc<GroupArena>,
}

impl GroupSupervisor {
    pub fn new(arena: Arc<GroupArena>) -> Self {
        GroupSupervisor { arena }
    }

    pub fn arena(&self) -> &Arc<GroupArena> {
        &self.arena
    }

    /// One lifecycle check pass over every non-merged, non-exhausted
    /// group: decrement countdown, flip ACTIVE/SLEEP phases, and attempt
    /// one adjacency merge per ACTIVE group.
    pub fn tick_once<V: CellValue>(&self, array: &Array<V>) -> EngineResult<()> {
        let ids: Vec<u32> = self
            .arena
            .all()
            .into_iter()
            .filter(|g| g.status != GroupStatus::Merged)
            .map(|g| g.id)
            .collect();
        for id in ids {
            self.tick_group(id, array)?;
        }
        Ok(())
    }

    fn tick_group<V: CellValue>(&self, id: u32, array: &Array<V>) -> EngineResult<()> {
        if self.arena.all_members_inactive(id, array) {
            return Ok(());
        }
        let group = self.arena.get(id);
        match group.status {
            GroupStatus::Merged => Ok(()),
            GroupStatus::Active => {
                if let Some(next_id) = self.arena.find_next_group(id, array) {
                    let next = self.arena.get(next_id);
                    if next.status == GroupStatus::Active
                        && self.arena.is_sorted(id, array)
                        && self.arena.is_sorted(next_id, array)
                    {
                        self.arena.merge(id, next_id, array)?;
                        return Ok(());
                    }
                }
                self.decrement_and_maybe_flip(id, array)
            }
            GroupStatus::Sleep => self.decrement_and_maybe_flip(id, array),
        }
    }

    fn decrement_and_maybe_flip<V: CellValue>(&self, id: u32, array: &Array<V>) -> EngineResult<()> {
        let mut groups = self.arena.groups.write();
        let idx = id as usize;
        if idx >= groups.len() || groups[idx].status == GroupStatus::Merged {
            return Ok(());
        }
        if groups[idx].countdown > 0 {
            groups[idx].countdown -= 1;
        }
        if groups[idx].countdown == 0 {
            let phase_period = groups[idx].phase_period;
            let flip_to = match groups[idx].status {
                GroupStatus::Active => GroupStatus::Sleep,
                GroupStatus::Sleep => GroupStatus::Active,
                GroupStatus::Merged => unreachable!(),
            };
            groups[idx].status = flip_to;
            groups[idx].countdown = phase_period;
            drop(groups);
            debug!(group = id, ?flip_to, "group phase transition");
            match flip_to {
                GroupStatus::Sleep => self.arena.sleep_cells(id, array),
                GroupStatus::Active => self.arena.wake_cells(id, array),
                GroupStatus::Merged => unreachable!(),
            }
        }
        Ok(())
    }

    /// Spawns one background thread that repeatedly calls `tick_once`
    /// every `interval`, until `stop` is set. This is the one thread the
    /// group layer contributes to §5's "three concurrent populations" —
    /// bounded count regardless of how many groups are currently live.
    pub fn run_background<V: CellValue>(
        self: Arc<Self>,
        array: Arc<Array<V>>,
        interval: Duration,
        stop: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        std::thread::spawn(move || {
            while !stop.load(AtomicOrdering::Acquire) {
                if let Err(err) = self.tick_once(&array) {
                    tracing::error!(%err, "group supervisor tick failed");
                    break;
                }
                std::thread::sleep(interval);
            }
        })
    }
}
