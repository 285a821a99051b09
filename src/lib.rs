//! Cellsort core - a concurrent cell-view emergent sorting engine.
//!
//! Each array position is an autonomous cell proposing local swaps under
//! one of three algotypes (Bubble, Insertion, Selection); a hierarchical
//! group layer sleeps, wakes, and merges contiguous ranges as they settle;
//! a probe records the resulting trajectory for convergence detection and
//! metrics.

pub mod analyzer;
pub mod array;
pub mod cell;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod group;
pub mod metrics;
pub mod probe;
pub mod runner;
pub mod swap;
pub mod topology;

pub use array::Array;
pub use cell::{Algotype, Cell, CellStatus, CellValue, Direction};
pub use config::{DirectionStrategy, RunConfig, TrialFactoryConfig, ValueStrategy};
pub use engine::{Engine, ExecutionMode};
pub use error::{EngineError, EngineResult};
pub use group::{Group, GroupArena, GroupStatus, GroupSupervisor};
pub use probe::Probe;
pub use runner::{run_batch_experiments, run_single_trial, ExperimentResults, TrialResult};

/// Installs a global `tracing` subscriber honoring `RUST_LOG`, defaulting
/// to `level` when the environment variable is unset. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Algotype, Direction};
    use crate::engine::ExecutionMode;
    use crate::group::{GroupArena, GroupSupervisor};
    use crate::probe::Probe;
    use crate::topology::Chimeric;
    use std::sync::Arc;

    /// End-to-end smoke test wiring every module together: array + groups +
    /// engine + probe + analyzer, matching §8 scenario 1 (a sorted array
    /// stays sorted and converges immediately).
    #[test]
    fn sorted_array_stays_sorted_and_converges_immediately() {
        let n = 8;
        let values: Vec<i64> = (0..n as i64).collect();
        let algotypes = vec![Algotype::Bubble; n];
        let directions = vec![Direction::Increasing; n];
        let array = Arc::new(Array::new(values, algotypes, directions));
        let arena = Arc::new(GroupArena::singletons(&array, 3));
        let supervisor = GroupSupervisor::new(arena);
        let probe = Arc::new(Probe::new(true));
        let engine = Engine::new(array.clone(), Box::new(Chimeric::new()), probe.clone(), ExecutionMode::Sequential);

        let mut tracker = analyzer::ConvergenceTracker::new(2);
        for step in 0..10u64 {
            let swaps = engine.step().unwrap();
            supervisor.tick_once(&array).unwrap();
            if tracker.observe(step, swaps).is_some() {
                break;
            }
        }

        assert_eq!(tracker.converged_step(), Some(0));
        assert_eq!(array.values(), (0..n as i64).collect::<Vec<_>>());
    }

    #[test]
    fn reverse_sorted_array_converges_to_fully_ordered() {
        let values = vec![9i64, 7, 5, 3, 1, 2, 4, 6, 8];
        let n = values.len();
        let array = Arc::new(Array::new(values, vec![Algotype::Bubble; n], vec![Direction::Increasing; n]));
        let arena = Arc::new(GroupArena::singletons(&array, 4));
        let supervisor = GroupSupervisor::new(arena);
        let probe = Arc::new(Probe::new(true));
        let engine = Engine::new(array.clone(), Box::new(Chimeric::new()), probe.clone(), ExecutionMode::Sequential);

        let mut tracker = analyzer::ConvergenceTracker::new(2);
        for step in 0..200u64 {
            let swaps = engine.step().unwrap();
            supervisor.tick_once(&array).unwrap();
            if tracker.observe(step, swaps).is_some() {
                break;
            }
        }

        assert!(tracker.converged_step().is_some());
        assert_eq!(array.values(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn factorization_instantiation_finds_known_factors() {
        let target = 36i64;
        let n = 10; // divisors 2..=11
        let cells = domain::remainder_cells(target, n);
        let array = Arc::new(Array::new(cells, vec![Algotype::Selection; n], vec![Direction::Increasing; n]));
        let arena = Arc::new(GroupArena::whole_array(&array, 5));
        let supervisor = GroupSupervisor::new(arena);
        let probe = Arc::new(Probe::new(false));
        let engine = Engine::new(array.clone(), Box::new(Chimeric::new()), probe, ExecutionMode::Sequential);

        for _ in 0..50 {
            engine.step().unwrap();
            supervisor.tick_once(&array).unwrap();
        }

        let found = domain::factors_found(&array.values());
        let expected = domain::known_factors(target, 11);
        let mut found_sorted = found.clone();
        found_sorted.sort_unstable();
        assert_eq!(found_sorted, expected);
    }
}
