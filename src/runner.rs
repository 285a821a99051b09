//! Experiment runner (C9, §4.9): drives single trials and fail-fast
//! batches of them. Specialized to `i64` cells — the batch factories
//! (sequential/random/shuffled values, weighted algotype draws) only make
//! sense for a concrete numeric payload, so there is no generic `V` here,
//! unlike the rest of the engine.

use crate::analyzer::ConvergenceTracker;
use crate::array::Array;
use crate::cell::{Algotype, Direction};
use crate::config::{DirectionStrategy, RunConfig, ValueStrategy};
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::group::{GroupArena, GroupSupervisor};
use crate::metrics::{Metric, Monotonicity, MonotonicityError, Sortedness};
use crate::probe::Probe;
use crate::topology::Chimeric;
use anyhow::Context;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Poll interval for the group supervisor's background thread. Group
/// lifecycle ticking is an overlay on top of the sort itself (cells sort
/// correctly regardless of how often groups sleep/wake/merge), so this
/// only needs to be fast enough to exercise the lifecycle within a trial,
/// not synchronized with the engine's own step cadence.
const GROUP_TICK_INTERVAL: Duration = Duration::from_micros(200);

#[derive(Clone, Debug, Serialize)]
pub struct TrialResult {
    pub trial_number: usize,
    pub direction: Direction,
    pub converged_step: Option<u64>,
    pub steps_run: u64,
    pub total_swaps: u64,
    pub final_sortedness: f64,
    pub final_monotonicity: f64,
    pub final_monotonicity_error: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExperimentResults {
    pub trials: Vec<TrialResult>,
}

impl ExperimentResults {
    pub fn mean_convergence_step(&self) -> Option<f64> {
        let converged: Vec<f64> = self.trials.iter().filter_map(|t| t.converged_step).map(|s| s as f64).collect();
        if converged.is_empty() {
            None
        } else {
            Some(converged.iter().sum::<f64>() / converged.len() as f64)
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn build_values(rng: &mut StdRng, strategy: ValueStrategy, n: usize) -> Vec<i64> {
    match strategy {
        ValueStrategy::Sequential => (0..n as i64).collect(),
        ValueStrategy::Random => (0..n).map(|_| rng.gen_range(0..n as i64)).collect(),
        ValueStrategy::Shuffled => {
            let mut values: Vec<i64> = (0..n as i64).collect();
            values.shuffle(rng);
            values
        }
    }
}

fn resolve_direction(strategy: DirectionStrategy, trial_number: usize, rng: &mut StdRng) -> Direction {
    match strategy {
        DirectionStrategy::AllAscending => Direction::Increasing,
        DirectionStrategy::AllDescending => Direction::Decreasing,
        DirectionStrategy::Alternating => {
            if trial_number % 2 == 0 {
                Direction::Increasing
            } else {
                Direction::Decreasing
            }
        }
        DirectionStrategy::Random => {
            if rng.gen_bool(0.5) {
                Direction::Increasing
            } else {
                Direction::Decreasing
            }
        }
    }
}

fn draw_algotypes(
    rng: &mut StdRng,
    n: usize,
    distribution: &std::collections::BTreeMap<Algotype, f64>,
) -> EngineResult<Vec<Algotype>> {
    let algotypes: Vec<Algotype> = distribution.keys().copied().collect();
    let weights: Vec<f64> = distribution.values().copied().collect();
    let dist = WeightedIndex::new(&weights)
        .map_err(|e| EngineError::Configuration(format!("invalid algotype_distribution weights: {e}")))?;
    Ok((0..n).map(|_| algotypes[dist.sample(rng)]).collect())
}

/// Runs one trial to convergence or `max_steps`, whichever comes first.
pub fn run_single_trial(config: &RunConfig, trial_number: usize) -> EngineResult<TrialResult> {
    config.validate()?;
    let seed = config.seed.wrapping_add(trial_number as u64);
    let mut rng = StdRng::seed_from_u64(seed);

    let n = config.factory.array_len;
    let direction = resolve_direction(config.factory.direction_strategy, trial_number, &mut rng);
    let values = build_values(&mut rng, config.factory.value_strategy, n);
    let algotypes = draw_algotypes(&mut rng, n, &config.factory.algotype_distribution)?;
    let directions = vec![direction; n];

    let array = Arc::new(Array::new(values, algotypes, directions));
    let arena = Arc::new(GroupArena::singletons(&array, config.group_phase_period));
    let supervisor = Arc::new(GroupSupervisor::new(arena));
    let probe = Arc::new(Probe::new(config.recording_enabled));
    let engine = Engine::new(array.clone(), Box::new(Chimeric::new()), probe.clone(), config.execution_mode);

    // The group layer runs its own control loop on a dedicated thread,
    // overlapping with the engine's step loop below rather than being
    // ticked inline on the same thread.
    let stop_supervisor = Arc::new(AtomicBool::new(false));
    let supervisor_handle = supervisor.clone().run_background(array.clone(), GROUP_TICK_INTERVAL, stop_supervisor.clone());

    let mut tracker = ConvergenceTracker::new(config.convergence_window);
    let mut converged_step = None;
    let mut steps_run = 0u64;
    let mut step_result = Ok(());
    for step in 0..config.max_steps {
        match engine.step() {
            Ok(swap_count) => {
                steps_run = step + 1;
                converged_step = tracker.observe(step, swap_count);
                if converged_step.is_some() {
                    break;
                }
            }
            Err(err) => {
                step_result = Err(err);
                break;
            }
        }
    }

    // Stop and join the supervisor thread on every exit path, including a
    // step error, so a mid-run failure never leaks the background thread.
    stop_supervisor.store(true, Ordering::Release);
    if supervisor_handle.join().is_err() {
        let leak = EngineError::ThreadLeak("group supervisor thread panicked before joining".into());
        tracing::error!(%leak, trial_number, "group supervisor thread leak");
    }

    step_result?;

    let final_values = array.values();
    let final_sortedness = Sortedness.compute(&final_values, direction);
    let final_monotonicity = Monotonicity.compute(&final_values, direction);
    let final_monotonicity_error = MonotonicityError.compute(&final_values, direction);

    info!(trial_number, steps_run, ?converged_step, "trial complete");

    Ok(TrialResult {
        trial_number,
        direction,
        converged_step,
        steps_run,
        total_swaps: probe.total_swap_count(),
        final_sortedness,
        final_monotonicity,
        final_monotonicity_error,
    })
}

/// Runs `config.num_repetitions` trials on a pool sized by
/// [`RunConfig::effective_pool_size`]. Fails fast: the first trial to
/// return an `Err` aborts the batch, with the trial number added as
/// context. Trials already dispatched to other pool threads still run to
/// completion — rayon has no preemption — but no further trials start
/// after the error is observed.
pub fn run_batch_experiments(config: &RunConfig) -> anyhow::Result<ExperimentResults> {
    config.validate()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.effective_pool_size())
        .build()
        .context("failed to build experiment worker pool")?;

    let trials: Result<Vec<TrialResult>, anyhow::Error> = pool.install(|| {
        (0..config.num_repetitions)
            .into_par_iter()
            .map(|trial_number| {
                run_single_trial(config, trial_number)
                    .with_context(|| format!("trial {trial_number} failed"))
            })
            .collect()
    });

    Ok(ExperimentResults { trials: trials? })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config_with(n: usize, max_steps: u64, num_repetitions: usize) -> RunConfig {
        let mut dist = BTreeMap::new();
        dist.insert(Algotype::Bubble, 1.0);
        RunConfig {
            factory: crate::config::TrialFactoryConfig {
                array_len: n,
                value_strategy: ValueStrategy::Shuffled,
                direction_strategy: DirectionStrategy::AllAscending,
                algotype_distribution: dist,
            },
            execution_mode: crate::engine::ExecutionMode::Sequential,
            group_phase_period: 4,
            convergence_window: 2,
            max_steps,
            recording_enabled: true,
            num_repetitions,
            num_threads: 2,
            seed: 42,
        }
    }

    #[test]
    fn single_trial_converges_and_produces_fully_sorted_result() {
        let config = config_with(12, 500, 1);
        let result = run_single_trial(&config, 0).unwrap();
        assert!(result.converged_step.is_some());
        assert_eq!(result.final_sortedness, 100.0);
        assert_eq!(result.final_monotonicity_error, 0.0);
    }

    #[test]
    fn same_seed_and_trial_number_produce_identical_results() {
        let config = config_with(15, 500, 1);
        let a = run_single_trial(&config, 3).unwrap();
        let b = run_single_trial(&config, 3).unwrap();
        assert_eq!(a.converged_step, b.converged_step);
        assert_eq!(a.total_swaps, b.total_swaps);
    }

    #[test]
    fn batch_runs_every_repetition_with_distinct_trial_numbers() {
        let config = config_with(10, 300, 4);
        let results = run_batch_experiments(&config).unwrap();
        assert_eq!(results.trials.len(), 4);
        let mut numbers: Vec<usize> = results.trials.iter().map(|t| t.trial_number).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn batch_fails_fast_on_invalid_configuration() {
        let mut config = config_with(10, 300, 3);
        config.factory.algotype_distribution.clear();
        assert!(run_batch_experiments(&config).is_err());
    }
}
