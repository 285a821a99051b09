//! Error taxonomy for the cell-view sorting engine.
//!
//! Each variant corresponds to one row of the error taxonomy: configuration
//! errors are rejected before any thread starts, topology mismatches and
//! group invariant violations abort the owning trial, thread leaks are
//! logged but do not fail the run. Step-budget exhaustion and swap races are
//! deliberately *not* represented here — the former is a normal trial
//! outcome (`converged = false`) and the latter is a silent, counted abort
//! of a single swap, not a propagated error.

use thiserror::Error;

/// Errors raised by the engine, group layer, or runner.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid `RunConfig` / `TrialFactoryConfig`: bad sizes, unknown
    /// algotype names, a distribution that doesn't sum to 1, zero
    /// repetitions, and so on. Raised before any thread is spawned.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A per-algotype topology received a cell whose metadata algotype
    /// doesn't match what that topology implements.
    #[error("topology mismatch at position {position}: expected {expected:?}, found {found:?}")]
    TopologyMismatch {
        position: usize,
        expected: crate::cell::Algotype,
        found: crate::cell::Algotype,
    },

    /// A group merge would create an overlapping range, or a cell's
    /// position was observed outside its own group's boundaries (P3/P4).
    #[error("group invariant violated: {0}")]
    GroupInvariantViolation(String),

    /// A background group or worker thread failed to join inside the
    /// shutdown window. The run result is still returned to the caller;
    /// this is logged, not propagated as a trial failure.
    #[error("thread leaked during shutdown: {0}")]
    ThreadLeak(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
