//! Execution engine (C4, §4.4): drives one step of the whole array, in
//! either a deterministic sequential sweep or a rayon-parallel sweep.
//!
//! Parallel execution is purely a work-partitioning concern here: the pair
//! lock in [`crate::array::Array::lock_pair`] already makes any two
//! concurrent `propose_swap` calls safe regardless of which thread issued
//! them, including across whatever boundary the scheduler happened to pick,
//! so the engine itself carries no extra boundary-serialization logic.

use crate::array::Array;
use crate::cell::{Algotype, CellValue};
use crate::error::{EngineError, EngineResult};
use crate::probe::Probe;
use crate::swap::{propose_swap, SwapOutcome};
use crate::topology::Topology;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExecutionMode {
    /// Deterministic, single-threaded, topology-ordered sweep.
    Sequential,
    /// Rayon-chunked sweep using a pool of this many threads.
    Parallel { num_threads: usize },
}

/// One array plus the topology driving it and the probe recording it.
pub struct Engine<V: CellValue> {
    array: Arc<Array<V>>,
    topology: Box<dyn Topology<V>>,
    probe: Arc<Probe<V>>,
    mode: ExecutionMode,
    step_number: AtomicU64,
    pool: Option<rayon::ThreadPool>,
}

impl<V: CellValue> Engine<V> {
    pub fn new(
        array: Arc<Array<V>>,
        topology: Box<dyn Topology<V>>,
        probe: Arc<Probe<V>>,
        mode: ExecutionMode,
    ) -> Self {
        let pool = match mode {
            ExecutionMode::Parallel { num_threads } => rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads.max(1))
                .build()
                .ok(),
            ExecutionMode::Sequential => None,
        };
        Engine {
            array,
            topology,
            probe,
            mode,
            step_number: AtomicU64::new(0),
            pool,
        }
    }

    pub fn array(&self) -> &Arc<Array<V>> {
        &self.array
    }

    pub fn probe(&self) -> &Arc<Probe<V>> {
        &self.probe
    }

    /// Runs one full pass over every position, recording a snapshot and
    /// returning this step's compare-and-swap count.
    ///
    /// Fails with [`EngineError::TopologyMismatch`] if a concrete
    /// single-algotype topology (`Bubble`/`Insertion`/`Selection`) is asked
    /// to propose for a position whose own algotype metadata disagrees —
    /// a dispatcher like `Chimeric` never triggers this, since it reads
    /// each position's algotype itself rather than assuming one.
    pub fn step(&self) -> EngineResult<u64> {
        let order = self.topology.iteration_order(self.array.len());
        let exchanges = match self.mode {
            ExecutionMode::Sequential => self.sweep_sequential(&order)?,
            ExecutionMode::Parallel { .. } => self.sweep_parallel(&order)?,
        };

        let step = self.step_number.fetch_add(1, Ordering::Relaxed);
        let values = self.array.values();
        let histogram = self.algotype_histogram();
        self.probe.record_snapshot_with_types(step, &values, exchanges, Some(histogram));
        Ok(exchanges)
    }

    fn propose_and_commit(&self, pos: usize) -> EngineResult<u64> {
        if let Some(expected) = self.topology.expected_algotype() {
            let found = self.array.algotype(pos);
            if found != expected {
                return Err(EngineError::TopologyMismatch { position: pos, expected, found });
            }
        }
        if self.array.status(pos).blocks_any_swap() {
            return Ok(0);
        }
        match self.topology.propose(pos, &self.array) {
            Some(target) => match propose_swap(&self.array, pos, target, &*self.probe) {
                SwapOutcome::Exchanged => Ok(1),
                _ => Ok(0),
            },
            None => Ok(0),
        }
    }

    fn sweep_sequential(&self, order: &[usize]) -> EngineResult<u64> {
        order.iter().try_fold(0u64, |acc, &pos| self.propose_and_commit(pos).map(|n| acc + n))
    }

    fn sweep_parallel(&self, order: &[usize]) -> EngineResult<u64> {
        let pool = self.pool.as_ref();
        let run = || -> EngineResult<u64> {
            order
                .par_iter()
                .map(|&pos| self.propose_and_commit(pos))
                .try_reduce(|| 0u64, |a, b| Ok(a + b))
        };
        match pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn algotype_histogram(&self) -> HashMap<Algotype, usize> {
        let mut histogram = HashMap::new();
        for algotype in self.array.algotypes() {
            *histogram.entry(algotype).or_insert(0) += 1;
        }
        histogram
    }

    pub fn step_count(&self) -> u64 {
        self.step_number.load(Ordering::Relaxed)
    }
}
