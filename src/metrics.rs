//! Metrics (C7, §4.7): pure functions of a value sequence, each declaring a
//! name and whether lower is better.

use crate::cell::{Algotype, CellValue, Direction};
use std::collections::HashSet;

/// A metric computed from a snapshot's value sequence and the trial's sort
/// direction.
pub trait Metric<V: CellValue> {
    fn name(&self) -> &'static str;
    fn lower_is_better(&self) -> bool;
    fn compute(&self, values: &[V], direction: Direction) -> f64;
}

fn fully_sorted<V: CellValue>(values: &[V], direction: Direction) -> Vec<V> {
    let mut sorted = values.to_vec();
    match direction {
        Direction::Increasing => sorted.sort(),
        Direction::Decreasing => sorted.sort_by(|a, b| b.cmp(a)),
    }
    sorted
}

/// Percentage of positions whose value equals the value at that index of
/// the fully-sorted sequence.
pub struct Sortedness;

impl<V: CellValue> Metric<V> for Sortedness {
    fn name(&self) -> &'static str {
        "sortedness"
    }
    fn lower_is_better(&self) -> bool {
        false
    }
    fn compute(&self, values: &[V], direction: Direction) -> f64 {
        if values.is_empty() {
            return 100.0;
        }
        let sorted = fully_sorted(values, direction);
        let matches = values.iter().zip(sorted.iter()).filter(|(a, b)| a == b).count();
        matches as f64 / values.len() as f64 * 100.0
    }
}

/// Percentage of adjacent pairs respecting the target direction.
pub struct Monotonicity;

impl<V: CellValue> Metric<V> for Monotonicity {
    fn name(&self) -> &'static str {
        "monotonicity"
    }
    fn lower_is_better(&self) -> bool {
        false
    }
    fn compute(&self, values: &[V], direction: Direction) -> f64 {
        if values.len() < 2 {
            return 100.0;
        }
        let pairs = values.len() - 1;
        let ok = values.windows(2).filter(|w| !direction.violates(&w[0], &w[1])).count();
        ok as f64 / pairs as f64 * 100.0
    }
}

/// Count of adjacent inversions (pairs violating the target direction).
pub struct MonotonicityError;

impl<V: CellValue> Metric<V> for MonotonicityError {
    fn name(&self) -> &'static str {
        "monotonicity_error"
    }
    fn lower_is_better(&self) -> bool {
        true
    }
    fn compute(&self, values: &[V], direction: Direction) -> f64 {
        values.windows(2).filter(|w| direction.violates(&w[0], &w[1])).count() as f64
    }
}

/// Σ |actual_index − sorted_index|, ties broken by first-seen order (a
/// stable sort of `(value, original_index)` preserves original relative
/// order among equal values, which is exactly "first seen").
pub struct SpearmanDistance;

impl<V: CellValue> Metric<V> for SpearmanDistance {
    fn name(&self) -> &'static str {
        "spearman_distance"
    }
    fn lower_is_better(&self) -> bool {
        true
    }
    fn compute(&self, values: &[V], direction: Direction) -> f64 {
        let n = values.len();
        if n == 0 {
            return 0.0;
        }
        let mut indexed: Vec<(V, usize)> = values.iter().cloned().zip(0..n).collect();
        match direction {
            Direction::Increasing => indexed.sort_by(|a, b| a.0.cmp(&b.0)),
            Direction::Decreasing => indexed.sort_by(|a, b| b.0.cmp(&a.0)),
        }
        let mut sorted_rank = vec![0usize; n];
        for (rank, (_, original_index)) in indexed.into_iter().enumerate() {
            sorted_rank[original_index] = rank;
        }
        (0..n)
            .map(|p| (p as i64 - sorted_rank[p] as i64).unsigned_abs())
            .sum::<u64>() as f64
    }
}

/// Percentage of adjacent pairs sharing the same algotype, normalized by
/// the maximum achievable same-type pairs given the population's
/// composition (`n - distinct_types_present`), so a perfectly segregated
/// population (each present type forming one contiguous block) scores 100.
pub fn algotype_aggregation_index(algotypes: &[Algotype]) -> f64 {
    let n = algotypes.len();
    if n < 2 {
        return 100.0;
    }
    let same_pairs = algotypes.windows(2).filter(|w| w[0] == w[1]).count();
    let distinct_types: HashSet<Algotype> = algotypes.iter().copied().collect();
    let max_same_pairs = n - distinct_types.len();
    if max_same_pairs == 0 {
        // Every position holds a distinct type: no two adjacent pairs can
        // ever match, so a fully "spread out" population is the only
        // possible arrangement and counts as perfectly aggregated.
        100.0
    } else {
        same_pairs as f64 / max_same_pairs as f64 * 100.0
    }
}
