//! Experiment configuration (C9, §4.9). `RunConfig` has no implicit
//! defaults — every field the runner needs is spelled out by the caller,
//! rather than silently falling back to a magic constant.

use crate::cell::Algotype;
use crate::engine::ExecutionMode;
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueStrategy {
    /// `0..n`, already sorted ascending.
    Sequential,
    /// Independent uniform draws in `[0, n)`.
    Random,
    /// `0..n` permuted by a Fisher-Yates shuffle.
    Shuffled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionStrategy {
    AllAscending,
    AllDescending,
    /// Alternates the target direction from one trial to the next within a
    /// batch, rather than mixing directions inside a single array (a single
    /// array's metrics need one direction to be meaningful).
    Alternating,
    /// An independent, seeded coin flip per trial.
    Random,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialFactoryConfig {
    pub array_len: usize,
    pub value_strategy: ValueStrategy,
    pub direction_strategy: DirectionStrategy,
    /// Must be non-empty and sum to 1.0 (within floating-point epsilon).
    pub algotype_distribution: BTreeMap<Algotype, f64>,
}

impl TrialFactoryConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.array_len == 0 {
            return Err(EngineError::Configuration("array_len must be positive".into()));
        }
        if self.algotype_distribution.is_empty() {
            return Err(EngineError::Configuration("algotype_distribution must name at least one algotype".into()));
        }
        let total: f64 = self.algotype_distribution.values().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(EngineError::Configuration(format!(
                "algotype_distribution must sum to 1.0, got {total}"
            )));
        }
        if self.algotype_distribution.values().any(|&w| w < 0.0) {
            return Err(EngineError::Configuration("algotype_distribution weights must be non-negative".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub factory: TrialFactoryConfig,
    pub execution_mode: ExecutionMode,
    pub group_phase_period: u32,
    /// `K` in the convergence criterion: the run length of zero-swap steps
    /// required before declaring convergence.
    pub convergence_window: usize,
    pub max_steps: u64,
    pub recording_enabled: bool,
    pub num_repetitions: usize,
    pub num_threads: usize,
    pub seed: u64,
}

impl RunConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.factory.validate()?;
        if self.max_steps == 0 {
            return Err(EngineError::Configuration("max_steps must be positive".into()));
        }
        if self.num_repetitions == 0 {
            return Err(EngineError::Configuration("num_repetitions must be positive".into()));
        }
        if self.num_threads == 0 {
            return Err(EngineError::Configuration("num_threads must be positive".into()));
        }
        Ok(())
    }

    /// `min(numRepetitions, numThreads, availableCores)` (§4.9): the actual
    /// worker-pool size for a batch, never larger than the work available.
    pub fn effective_pool_size(&self) -> usize {
        let available = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        self.num_repetitions.min(self.num_threads).min(available)
    }

    pub fn from_json(text: &str) -> serde_json::Result<RunConfig> {
        serde_json::from_str(text)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_factory() -> TrialFactoryConfig {
        let mut dist = BTreeMap::new();
        dist.insert(Algotype::Bubble, 1.0);
        TrialFactoryConfig {
            array_len: 10,
            value_strategy: ValueStrategy::Shuffled,
            direction_strategy: DirectionStrategy::AllAscending,
            algotype_distribution: dist,
        }
    }

    #[test]
    fn rejects_distribution_not_summing_to_one() {
        let mut factory = base_factory();
        factory.algotype_distribution.insert(Algotype::Insertion, 0.5);
        assert!(factory.validate().is_err());
    }

    #[test]
    fn accepts_valid_mixed_distribution() {
        let mut factory = base_factory();
        *factory.algotype_distribution.get_mut(&Algotype::Bubble).unwrap() = 0.5;
        factory.algotype_distribution.insert(Algotype::Selection, 0.5);
        assert!(factory.validate().is_ok());
    }

    #[test]
    fn round_trips_through_json() {
        let config = RunConfig {
            factory: base_factory(),
            execution_mode: ExecutionMode::Parallel { num_threads: 4 },
            group_phase_period: 5,
            convergence_window: 3,
            max_steps: 100,
            recording_enabled: true,
            num_repetitions: 2,
            num_threads: 64,
            seed: 1,
        };
        let text = config.to_json_pretty().unwrap();
        let parsed = RunConfig::from_json(&text).unwrap();
        assert_eq!(parsed.max_steps, config.max_steps);
        assert_eq!(parsed.execution_mode, config.execution_mode);
    }

    #[test]
    fn effective_pool_size_never_exceeds_repetitions() {
        let config = RunConfig {
            factory: base_factory(),
            execution_mode: ExecutionMode::Sequential,
            group_phase_period: 5,
            convergence_window: 3,
            max_steps: 100,
            recording_enabled: true,
            num_repetitions: 2,
            num_threads: 64,
            seed: 1,
        };
        assert!(config.effective_pool_size() <= 2);
    }
}
