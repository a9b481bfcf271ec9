//! Per-bit results and pass/fail aggregation.

use serde::Serialize;

use crate::battery::TestOutcome;

/// Conventional significance thresholds. A bit passes at `T` iff `p >= T`.
pub const SIGNIFICANCE_LEVELS: [f64; 4] = [0.0001, 0.001, 0.01, 0.1];

/// Default threshold used for a single pass/fail verdict.
pub const DEFAULT_THRESHOLD: f64 = 0.01;

/// Assign a letter grade based on p-value.
///
/// - A: p >= 0.1
/// - B: p >= 0.01
/// - C: p >= 0.001
/// - D: p >= 0.0001
/// - F: otherwise
pub fn grade_from_p(p: f64) -> char {
    match p {
        p if p >= 0.1 => 'A',
        p if p >= 0.01 => 'B',
        p if p >= 0.001 => 'C',
        p if p >= 0.0001 => 'D',
        _ => 'F',
    }
}

/// Determine pass/fail from p-value against a threshold.
pub fn pass_from_p(p: f64, threshold: f64) -> bool {
    p >= threshold
}

/// Bit index → outcome for one test over one sample collection.
///
/// Built once, pre-sized to the number of bit planes; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultMap {
    test: &'static str,
    outcomes: Vec<TestOutcome>,
}

impl ResultMap {
    pub(crate) fn new(test: &'static str, outcomes: Vec<TestOutcome>) -> Self {
        Self { test, outcomes }
    }

    pub fn test(&self) -> &'static str {
        self.test
    }

    /// Number of bit positions (B).
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// p-value of bit index `bit`.
    pub fn get(&self, bit: usize) -> Option<f64> {
        self.outcomes.get(bit).map(|o| o.p_value)
    }

    pub fn outcome(&self, bit: usize) -> Option<&TestOutcome> {
        self.outcomes.get(bit)
    }

    /// `(bit index, p-value)` pairs in bit order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.outcomes.iter().map(|o| o.p_value).enumerate()
    }

    /// Number of bit positions with `p >= threshold`.
    pub fn passing(&self, threshold: f64) -> usize {
        self.iter().filter(|&(_, p)| pass_from_p(p, threshold)).count()
    }

    /// Bit indices with `p < threshold`, ascending.
    pub fn failing_bits(&self, threshold: f64) -> Vec<usize> {
        self.iter()
            .filter(|&(_, p)| !pass_from_p(p, threshold))
            .map(|(bit, _)| bit)
            .collect()
    }

    /// Passing counts at every [`SIGNIFICANCE_LEVELS`] threshold.
    pub fn summary(&self) -> PassSummary {
        PassSummary {
            test: self.test,
            bits: self.len(),
            passed: SIGNIFICANCE_LEVELS.map(|t| self.passing(t)),
        }
    }
}

/// Passing bit counts of one test, per conventional threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub test: &'static str,
    pub bits: usize,
    /// `passed[i]` counts bits with `p >= SIGNIFICANCE_LEVELS[i]`.
    pub passed: [usize; 4],
}

impl PassSummary {
    /// Passing count at `threshold`, if it is one of [`SIGNIFICANCE_LEVELS`].
    pub fn at(&self, threshold: f64) -> Option<usize> {
        SIGNIFICANCE_LEVELS
            .iter()
            .position(|&t| t == threshold)
            .map(|i| self.passed[i])
    }
}
