//! Per-bit-position randomness tests.
//!
//! Every test works on a single bit plane (a slice of 0/1 values; any
//! nonzero byte counts as a one) and returns a [`TestOutcome`]. The
//! `*_by_bit` drivers extract planes from a [`SampleSet`] once and run the
//! test on every bit index in parallel.

use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::f64::consts::SQRT_2;

use crate::bitplane::{BitPlanes, SampleSet};
use crate::error::{Result, TestError};
use crate::result::ResultMap;
use crate::special::{chi_square_p_value, erfc, incomplete_gamma_upper, probability};

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Statistic and p-value of one test on one bit plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

/// A randomness test that can be applied to any bit plane.
pub trait PlaneTest: Send + Sync {
    /// Human-readable test name, used in result maps and logs.
    fn name(&self) -> &'static str;

    /// Run the test on one plane.
    fn evaluate(&self, plane: &[u8]) -> Result<TestOutcome>;
}

fn is_one(b: &u8) -> bool {
    *b != 0
}

fn require_non_empty(plane: &[u8], test: &str) -> Result<()> {
    if plane.is_empty() {
        return Err(TestError::invalid(format!("{test} needs a non-empty bit plane")));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// 1. FREQUENCY (MONOBIT)
// ═══════════════════════════════════════════════════════════════════════════════

/// Monobit frequency: |Σ(±1)| / √N, p = erfc(s / √2).
pub fn frequency_test(plane: &[u8]) -> Result<TestOutcome> {
    require_non_empty(plane, "frequency test")?;
    let n = plane.len();
    let s: i64 = plane.iter().map(|b| if is_one(b) { 1i64 } else { -1i64 }).sum();
    let s_obs = (s as f64).abs() / (n as f64).sqrt();
    let p = erfc(s_obs / SQRT_2);
    Ok(TestOutcome {
        statistic: s_obs,
        p_value: probability(p, "frequency test")?,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyTest;

impl PlaneTest for FrequencyTest {
    fn name(&self) -> &'static str {
        "Frequency"
    }

    fn evaluate(&self, plane: &[u8]) -> Result<TestOutcome> {
        frequency_test(plane)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 2. BLOCK FREQUENCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Frequency within non-overlapping blocks of `block_length` bits.
///
/// Trailing bits that do not fill a whole block are dropped.
/// χ² = 4M Σ(πᵢ − ½)², p = Q(blocks / 2, χ² / 2).
pub fn block_test(plane: &[u8], block_length: usize) -> Result<TestOutcome> {
    if block_length == 0 {
        return Err(TestError::invalid("block length must be at least 1"));
    }
    require_non_empty(plane, "block test")?;
    let n = plane.len();
    let num_blocks = n / block_length;
    if num_blocks == 0 {
        return Err(TestError::invalid(format!(
            "block length {block_length} exceeds plane length {n}"
        )));
    }

    let m = block_length as f64;
    let mut chi2 = 0.0;
    for block in plane.chunks_exact(block_length) {
        let ones = block.iter().filter(|b| is_one(b)).count();
        let proportion = ones as f64 / m;
        chi2 += (proportion - 0.5) * (proportion - 0.5);
    }
    chi2 *= 4.0 * m;

    let p = incomplete_gamma_upper(num_blocks as f64 / 2.0, chi2 / 2.0)?;
    Ok(TestOutcome {
        statistic: chi2,
        p_value: p,
    })
}

/// Block frequency test with an explicit block length.
#[derive(Debug, Clone, Copy)]
pub struct BlockTest {
    block_length: usize,
}

impl BlockTest {
    /// # Errors
    /// `InvalidArgument` when `block_length` is zero.
    pub fn new(block_length: usize) -> Result<Self> {
        if block_length == 0 {
            return Err(TestError::invalid("block length must be at least 1"));
        }
        Ok(Self { block_length })
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }
}

impl PlaneTest for BlockTest {
    fn name(&self) -> &'static str {
        "Block Frequency"
    }

    fn evaluate(&self, plane: &[u8]) -> Result<TestOutcome> {
        block_test(plane, self.block_length)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 3. RUNS
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs test: compares the number of runs with 2Nπ(1−π).
///
/// A constant plane (π of 0 or 1) has a zero denominator and is a
/// numerical error rather than a p-value.
pub fn runs_test(plane: &[u8]) -> Result<TestOutcome> {
    let n = plane.len();
    if n < 2 {
        return Err(TestError::invalid(format!(
            "runs test needs at least 2 bits, got {n}"
        )));
    }
    let ones = plane.iter().filter(|b| is_one(b)).count();
    if ones == 0 || ones == n {
        return Err(TestError::numerical(format!(
            "runs test denominator is zero: plane is constant ({ones}/{n} ones)"
        )));
    }
    let nf = n as f64;
    let prop = ones as f64 / nf;
    let runs = 1 + plane
        .windows(2)
        .filter(|w| is_one(&w[0]) != is_one(&w[1]))
        .count();

    let statistic = (runs as f64 - 2.0 * nf * prop * (1.0 - prop)).abs();
    let denominator = 2.0 * (2.0 * nf).sqrt() * prop * (1.0 - prop);
    let p = erfc(statistic / denominator);
    Ok(TestOutcome {
        statistic,
        p_value: probability(p, "runs test")?,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunsTest;

impl PlaneTest for RunsTest {
    fn name(&self) -> &'static str {
        "Runs"
    }

    fn evaluate(&self, plane: &[u8]) -> Result<TestOutcome> {
        runs_test(plane)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 4. POKER (FIPS 140-1, legacy)
// ═══════════════════════════════════════════════════════════════════════════════

/// FIPS 140-1 poker test over 4-bit nibbles, 15 degrees of freedom.
///
/// Every 4 consecutive plane values form one nibble, the first value being
/// the most significant bit. X = (16/k) Σ f(i)² − k. The plane length must
/// be a multiple of 4.
pub fn poker_test(plane: &[u8]) -> Result<TestOutcome> {
    require_non_empty(plane, "poker test")?;
    let n = plane.len();
    if n % 4 != 0 {
        return Err(TestError::invalid(format!(
            "poker test needs a plane length divisible by 4, got {n}"
        )));
    }
    let k = (n / 4) as u128;
    let mut counts = [0u128; 16];
    for nibble in plane.chunks_exact(4) {
        let value = nibble
            .iter()
            .fold(0usize, |acc, b| (acc << 1) | usize::from(is_one(b)));
        counts[value] += 1;
    }
    let sum_sq: u128 = counts.iter().map(|&f| f * f).sum();
    // 16 Σf² >= k² by Cauchy-Schwarz, so this never underflows.
    let chi2 = (16 * sum_sq - k * k) as f64 / k as f64;

    let p = if chi2 > 0.0 {
        chi_square_p_value(chi2, 15)?
    } else {
        1.0
    };
    Ok(TestOutcome {
        statistic: chi2,
        p_value: p,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PokerTest;

impl PlaneTest for PokerTest {
    fn name(&self) -> &'static str {
        "Poker"
    }

    fn evaluate(&self, plane: &[u8]) -> Result<TestOutcome> {
        poker_test(plane)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Per-bit drivers
// ═══════════════════════════════════════════════════════════════════════════════

/// Run `test` on every plane, in parallel, keeping each bit's own outcome.
pub fn evaluate_planes(planes: &BitPlanes, test: &dyn PlaneTest) -> Vec<Result<TestOutcome>> {
    (0..planes.len())
        .into_par_iter()
        .map(|bit| test.evaluate(planes.plane(bit)))
        .collect()
}

/// Like [`evaluate_planes`], collected into a [`ResultMap`].
///
/// # Errors
/// The failure of the lowest failing bit index, wrapped in
/// [`TestError::AtBit`].
pub fn evaluate_planes_by_bit(planes: &BitPlanes, test: &dyn PlaneTest) -> Result<ResultMap> {
    debug!(
        "{}: {} bit planes x {} samples",
        test.name(),
        planes.len(),
        planes.sample_count()
    );
    let mut outcomes = Vec::with_capacity(planes.len());
    for (bit, outcome) in evaluate_planes(planes, test).into_iter().enumerate() {
        match outcome {
            Ok(o) => outcomes.push(o),
            Err(e) => {
                warn!("{}: bit {bit} failed: {e}", test.name());
                return Err(e.at_bit(bit));
            }
        }
    }
    Ok(ResultMap::new(test.name(), outcomes))
}

/// Extract planes from `samples` and run `test` on every bit index.
pub fn evaluate_by_bit(samples: &SampleSet, test: &dyn PlaneTest) -> Result<ResultMap> {
    evaluate_planes_by_bit(&BitPlanes::extract(samples), test)
}

/// Lenient form of [`evaluate_by_bit`]: one result per bit index.
pub fn evaluate_each_bit(samples: &SampleSet, test: &dyn PlaneTest) -> Vec<Result<TestOutcome>> {
    evaluate_planes(&BitPlanes::extract(samples), test)
}

pub fn frequency_by_bit(samples: &SampleSet) -> Result<ResultMap> {
    evaluate_by_bit(samples, &FrequencyTest)
}

/// Block frequency per bit position; trailing samples past the last whole
/// block are ignored.
pub fn block_by_bit(samples: &SampleSet, block_length: usize) -> Result<ResultMap> {
    let test = BlockTest::new(block_length)?;
    let dropped = samples.len() % block_length;
    if dropped > 0 {
        debug!(
            "block test: dropping {dropped} trailing samples ({} not divisible by {block_length})",
            samples.len()
        );
    }
    evaluate_by_bit(samples, &test)
}

pub fn runs_by_bit(samples: &SampleSet) -> Result<ResultMap> {
    evaluate_by_bit(samples, &RunsTest)
}

pub fn poker_by_bit(samples: &SampleSet) -> Result<ResultMap> {
    evaluate_by_bit(samples, &PokerTest)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Test battery
// ═══════════════════════════════════════════════════════════════════════════════

/// Which tests [`run_battery`] runs. The block length has no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryConfig {
    pub block_length: usize,
    /// Also run the legacy poker test (needs N divisible by 4).
    pub include_poker: bool,
}

impl BatteryConfig {
    pub fn new(block_length: usize) -> Self {
        Self {
            block_length,
            include_poker: false,
        }
    }

    pub fn with_poker(mut self, include: bool) -> Self {
        self.include_poker = include;
        self
    }

    /// Tests in run order: frequency, block, runs, then poker if enabled.
    pub fn tests(&self) -> Result<Vec<Box<dyn PlaneTest>>> {
        let mut tests: Vec<Box<dyn PlaneTest>> = vec![
            Box::new(FrequencyTest),
            Box::new(BlockTest::new(self.block_length)?),
            Box::new(RunsTest),
        ];
        if self.include_poker {
            tests.push(Box::new(PokerTest));
        }
        Ok(tests)
    }
}

/// One test's result within a battery run.
#[derive(Debug, Clone)]
pub struct BatteryEntry {
    pub test: &'static str,
    pub result: Result<ResultMap>,
}

/// Run every configured test on `samples`, extracting bit planes once.
///
/// A failing test does not stop the others; its error is kept in its entry.
///
/// # Errors
/// `InvalidArgument` if the configuration itself is invalid.
pub fn run_battery(samples: &SampleSet, config: &BatteryConfig) -> Result<Vec<BatteryEntry>> {
    let tests = config.tests()?;
    let planes = BitPlanes::extract(samples);
    Ok(tests
        .iter()
        .map(|test| BatteryEntry {
            test: test.name(),
            result: evaluate_planes_by_bit(&planes, test.as_ref()),
        })
        .collect())
}
