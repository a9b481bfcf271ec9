use std::time::Instant;

use bitsieve_tests::{
    SIGNIFICANCE_LEVELS, SampleSet, TestOutcome, evaluate_each_bit, grade_from_p, pass_from_p,
};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputFormat {
    /// Packed bytes, `sample_bytes` per sample.
    Raw,
    /// ASCII '0'/'1', one single-bit sample per character.
    Bits,
}

impl InputFormat {
    fn parse(s: &str) -> Self {
        match s {
            "bits" | "ascii" => Self::Bits,
            "raw" => Self::Raw,
            _ => {
                eprintln!("Unknown input format '{s}', using raw");
                Self::Raw
            }
        }
    }
}

pub struct AnalyzeCommandConfig<'a> {
    pub path: &'a str,
    pub sample_bytes: Option<usize>,
    pub bits: Option<usize>,
    pub format: &'a str,
    pub block_length: usize,
    pub include_poker: bool,
    pub threshold: f64,
    pub output_path: Option<&'a str>,
}

#[derive(Serialize)]
struct AnalyzeReport {
    path: String,
    samples: usize,
    bits_per_sample: usize,
    threshold: f64,
    tests: Vec<TestReport>,
}

#[derive(Serialize)]
struct TestReport {
    test: &'static str,
    /// Bits passing at each of `SIGNIFICANCE_LEVELS`.
    passed: [usize; 4],
    errors: usize,
    bits: Vec<BitReport>,
}

#[derive(Serialize)]
struct BitReport {
    bit: usize,
    statistic: Option<f64>,
    p_value: Option<f64>,
    grade: Option<char>,
    passed: bool,
    error: Option<String>,
}

impl BitReport {
    fn new(bit: usize, result: bitsieve_tests::Result<TestOutcome>, threshold: f64) -> Self {
        match result {
            Ok(o) => Self {
                bit,
                statistic: Some(o.statistic),
                p_value: Some(o.p_value),
                grade: Some(grade_from_p(o.p_value)),
                passed: pass_from_p(o.p_value, threshold),
                error: None,
            },
            Err(e) => Self {
                bit,
                statistic: None,
                p_value: None,
                grade: None,
                passed: false,
                error: Some(e.to_string()),
            },
        }
    }
}

impl TestReport {
    fn new(test: &'static str, results: Vec<bitsieve_tests::Result<TestOutcome>>, threshold: f64) -> Self {
        let bits: Vec<BitReport> = results
            .into_iter()
            .enumerate()
            .map(|(bit, r)| BitReport::new(bit, r, threshold))
            .collect();
        let passed = SIGNIFICANCE_LEVELS.map(|t| {
            bits.iter()
                .filter(|b| b.p_value.is_some_and(|p| pass_from_p(p, t)))
                .count()
        });
        let errors = bits.iter().filter(|b| b.error.is_some()).count();
        Self {
            test,
            passed,
            errors,
            bits,
        }
    }
}

pub fn run(cfg: AnalyzeCommandConfig<'_>) {
    let format = InputFormat::parse(cfg.format);
    let samples = match load_samples(cfg.path, format, cfg.sample_bytes, cfg.bits) {
        Ok(samples) => samples,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cfg.path);
            std::process::exit(1);
        }
    };
    let tests = super::make_tests(cfg.block_length, cfg.include_poker);

    println!(
        "Testing {} samples x {} bits from {}...\n",
        samples.len(),
        samples.bits_per_sample(),
        cfg.path
    );

    let t0 = Instant::now();
    let reports: Vec<TestReport> = tests
        .iter()
        .map(|test| {
            TestReport::new(
                test.name(),
                evaluate_each_bit(&samples, test.as_ref()),
                cfg.threshold,
            )
        })
        .collect();
    let elapsed = t0.elapsed().as_secs_f64();

    for report in &reports {
        print_bits(report, cfg.threshold);
    }

    let bits = samples.bits_per_sample();
    println!("\n{}", "=".repeat(60));
    println!("{}", super::summary_header(18));
    println!("{}", "-".repeat(60));
    for report in &reports {
        println!(
            "{}",
            super::summary_row(report.test, 18, &report.passed, bits)
        );
        if report.errors > 0 {
            println!("  {} bit(s) could not be evaluated", report.errors);
        }
    }
    println!("\n[{elapsed:.2}s]");

    if let Some(path) = cfg.output_path {
        super::write_json(
            path,
            &AnalyzeReport {
                path: cfg.path.to_string(),
                samples: samples.len(),
                bits_per_sample: bits,
                threshold: cfg.threshold,
                tests: reports,
            },
        );
    }
}

fn print_bits(report: &TestReport, threshold: f64) {
    println!("── {} ──", report.test);
    println!("  {:>4} {:>12} {:>10} {:>5} {:>4}", "Bit", "Statistic", "p-value", "Grade", "P");
    for b in &report.bits {
        match (&b.error, b.statistic, b.p_value, b.grade) {
            (None, Some(stat), Some(p), Some(grade)) => {
                let ok = if b.passed { "✓" } else { "✗" };
                println!("  {:>4} {stat:>12.4} {p:>10.6} {grade:>5} {ok:>4}", b.bit);
            }
            (Some(e), ..) => println!("  {:>4} error: {e}", b.bit),
            _ => {}
        }
    }
    let failing: Vec<String> = report
        .bits
        .iter()
        .filter(|b| !b.passed)
        .map(|b| b.bit.to_string())
        .collect();
    if !failing.is_empty() {
        println!("  Failing at p < {threshold}: bits {}", failing.join(", "));
    }
    println!();
}

/// Read `path` into a sample collection.
///
/// Raw input needs `sample_bytes`; with `bits` it must equal `ceil(bits / 8)`.
/// A trailing partial sample is an error rather than silently dropped.
fn load_samples(
    path: &str,
    format: InputFormat,
    sample_bytes: Option<usize>,
    bits: Option<usize>,
) -> Result<SampleSet, String> {
    match format {
        InputFormat::Bits => {
            let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
            SampleSet::from_ascii_bits(&text).map_err(|e| e.to_string())
        }
        InputFormat::Raw => {
            let data = std::fs::read(path).map_err(|e| e.to_string())?;
            let width = match (sample_bytes, bits) {
                (Some(w), _) => w,
                (None, Some(b)) => b.div_ceil(8),
                (None, None) => return Err("raw input needs --sample-bytes".to_string()),
            };
            if width == 0 {
                return Err("--sample-bytes must be at least 1".to_string());
            }
            if data.len() % width != 0 {
                return Err(format!(
                    "{} bytes is not a whole number of {width}-byte samples",
                    data.len()
                ));
            }
            match bits {
                Some(b) if b.div_ceil(8) != width => Err(format!(
                    "{b} bits need {}-byte samples, got {width}",
                    b.div_ceil(8)
                )),
                Some(b) => SampleSet::with_bit_length(data.chunks_exact(width), b)
                    .map_err(|e| e.to_string()),
                None => SampleSet::from_samples(data.chunks_exact(width)).map_err(|e| e.to_string()),
            }
        }
    }
}
