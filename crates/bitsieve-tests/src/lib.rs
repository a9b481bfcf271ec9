//! Per-bit-position randomness tests for collections of fixed-length samples.
//!
//! Implements the NIST SP 800-22 frequency, block frequency and runs tests
//! plus the FIPS 140-1 poker test. Instead of testing one long bit stream,
//! every bit *position* of the samples (keys, tokens, random draws) is tested
//! on its own: bit `i` read across all samples forms bit plane `i`, and each
//! test yields one p-value per plane.
//!
//! ```
//! use bitsieve_tests::{SampleSet, frequency_by_bit};
//!
//! let samples = SampleSet::from_samples([[0b1010_0101u8], [0b0101_1010], [0b1100_0011], [0b0011_1100]])?;
//! let results = frequency_by_bit(&samples)?;
//! assert_eq!(results.len(), 8);
//! assert!(results.iter().all(|(_, p)| (0.0..=1.0).contains(&p)));
//! # Ok::<(), bitsieve_tests::TestError>(())
//! ```
//!
//! p-values come from the self-contained [`special`] functions, so results
//! do not depend on an external statistics library.

pub mod battery;
pub mod bitplane;
pub mod error;
pub mod result;
pub mod special;

pub use battery::{
    BatteryConfig, BatteryEntry, BlockTest, FrequencyTest, PlaneTest, PokerTest, RunsTest,
    TestOutcome, block_by_bit, block_test, evaluate_by_bit, evaluate_each_bit, evaluate_planes,
    evaluate_planes_by_bit, frequency_by_bit, frequency_test, poker_by_bit, poker_test,
    run_battery, runs_by_bit, runs_test,
};
pub use bitplane::{BitPlanes, SampleSet};
pub use error::{ErrorKind, Result, TestError};
pub use result::{
    DEFAULT_THRESHOLD, PassSummary, ResultMap, SIGNIFICANCE_LEVELS, grade_from_p, pass_from_p,
};
