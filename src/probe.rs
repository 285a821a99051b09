//! Probe (C6, §4.6): append-only snapshot list, step-number index, and the
//! three atomic counters (total swaps, compare-and-swap attempts, frozen
//! swap attempts).

use crate::cell::Algotype;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// An immutable record of one step. `timestamp` is monotonic
/// (`Instant::now()` at record time), not wall-clock — consistent with the
/// ordering invariant in §3 (`a.timestamp <= b.timestamp` for `a < b`).
#[derive(Clone, Debug)]
pub struct StepSnapshot<V> {
    pub step_number: u64,
    pub timestamp: Instant,
    pub values: Vec<V>,
    pub swap_count: u64,
    pub algotype_histogram: Option<HashMap<Algotype, usize>>,
}

/// Append-only snapshot history plus atomic counters. Owned by the trial
/// and passed explicitly to every component that writes into it (design
/// note §9: "probe as module-wide sink" is rejected in favor of per-trial
/// ownership, so batch trials stay independent).
pub struct Probe<V = i64> {
    recording_enabled: bool,
    /// Ordered history, appended to under a write lock; the analyzer reads
    /// it under a read lock while the driver may still be appending the
    /// next snapshot.
    history: RwLock<Vec<Arc<StepSnapshot<V>>>>,
    /// O(1) step-number -> index lookup, separate from the ordered vec so
    /// `get_by_step` doesn't need a scan.
    index: DashMap<u64, usize>,
    total_swaps: AtomicU64,
    compare_and_swap_attempts: AtomicU64,
    frozen_swap_attempts: AtomicU64,
}

impl<V: Clone> Probe<V> {
    pub fn new(recording_enabled: bool) -> Self {
        Probe {
            recording_enabled,
            history: RwLock::new(Vec::new()),
            index: DashMap::new(),
            total_swaps: AtomicU64::new(0),
            compare_and_swap_attempts: AtomicU64::new(0),
            frozen_swap_attempts: AtomicU64::new(0),
        }
    }

    /// Appends a snapshot if recording is enabled; always advances the
    /// per-step swap counter regardless (§4.6 invariant).
    pub fn record_snapshot(&self, step_number: u64, values: &[V], swap_count: u64) {
        self.record_snapshot_with_types(step_number, values, swap_count, None);
    }

    pub fn record_snapshot_with_types(
        &self,
        step_number: u64,
        values: &[V],
        swap_count: u64,
        algotype_histogram: Option<HashMap<Algotype, usize>>,
    ) {
        self.total_swaps.fetch_add(swap_count, Ordering::Relaxed);
        if !self.recording_enabled {
            return;
        }
        let snapshot = Arc::new(StepSnapshot {
            step_number,
            timestamp: Instant::now(),
            values: values.to_vec(),
            swap_count,
            algotype_histogram,
        });
        let mut history = self.history.write();
        let idx = history.len();
        history.push(snapshot);
        self.index.insert(step_number, idx);
    }

    pub fn record_compare_and_swap(&self) {
        self.compare_and_swap_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_frozen_swap_attempt(&self) {
        self.frozen_swap_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_swap_count(&self) -> u64 {
        self.total_swaps.load(Ordering::Relaxed)
    }

    pub fn compare_and_swap_count(&self) -> u64 {
        self.compare_and_swap_attempts.load(Ordering::Relaxed)
    }

    pub fn frozen_swap_attempt_count(&self) -> u64 {
        self.frozen_swap_attempts.load(Ordering::Relaxed)
    }

    pub fn snapshot_count(&self) -> usize {
        self.history.read().len()
    }

    pub fn get_by_step(&self, step_number: u64) -> Option<Arc<StepSnapshot<V>>> {
        let idx = *self.index.get(&step_number)?;
        self.history.read().get(idx).cloned()
    }

    /// A clone of the full ordered history, for the analyzer to iterate
    /// without holding the read guard across its whole computation.
    pub fn snapshots(&self) -> Vec<Arc<StepSnapshot<V>>> {
        self.history.read().clone()
    }

    pub fn swap_count_trajectory(&self) -> Vec<u64> {
        self.history.read().iter().map(|s| s.swap_count).collect()
    }

    /// Drops both snapshots and counters.
    pub fn clear(&self) {
        self.history.write().clear();
        self.index.clear();
        self.reset_counters();
    }

    /// Drops counters only, preserving recorded history.
    pub fn reset_counters(&self) {
        self.total_swaps.store(0, Ordering::Relaxed);
        self.compare_and_swap_attempts.store(0, Ordering::Relaxed);
        self.frozen_swap_attempts.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_recording_is_a_noop_but_counters_still_advance() {
        let probe: Probe<i64> = Probe::new(false);
        probe.record_snapshot(0, &[1, 2, 3], 2);
        assert_eq!(probe.snapshot_count(), 0);
        assert_eq!(probe.total_swap_count(), 2);
    }

    #[test]
    fn get_by_step_finds_recorded_snapshot() {
        let probe: Probe<i64> = Probe::new(true);
        probe.record_snapshot(0, &[3, 2, 1], 0);
        probe.record_snapshot(1, &[2, 3, 1], 1);
        let snap = probe.get_by_step(1).unwrap();
        assert_eq!(snap.values, vec![2, 3, 1]);
        assert!(probe.get_by_step(99).is_none());
    }

    #[test]
    fn clear_drops_history_and_counters_reset_counters_keeps_history() {
        let probe: Probe<i64> = Probe::new(true);
        probe.record_snapshot(0, &[1], 1);
        probe.record_compare_and_swap();
        probe.reset_counters();
        assert_eq!(probe.snapshot_count(), 1);
        assert_eq!(probe.total_swap_count(), 0);
        probe.clear();
        assert_eq!(probe.snapshot_count(), 0);
    }
}
