use bitsieve_tests::{BatteryConfig, BatteryEntry, DEFAULT_THRESHOLD, SampleSet, run_battery};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scenario {
    /// No change; shows the pass rate of uniform data alone.
    Baseline,
    /// The first `inserted` samples become a counter.
    Embedded,
    /// Counter values land on positions picked with probability 1/4.
    Fragmented,
    /// A 1% subset drawn without replacement, in random order.
    Humanize,
}

impl Scenario {
    fn parse(s: &str) -> Self {
        match s {
            "baseline" => Self::Baseline,
            "embedded" => Self::Embedded,
            "fragmented" => Self::Fragmented,
            "humanize" => Self::Humanize,
            _ => {
                eprintln!("Unknown scenario '{s}', using embedded");
                Self::Embedded
            }
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Embedded => "embedded",
            Self::Fragmented => "fragmented",
            Self::Humanize => "humanize",
        }
    }

    fn apply(
        self,
        mut samples: Vec<Vec<u8>>,
        inserted: usize,
        multiple_of_four: bool,
        rng: &mut StdRng,
    ) -> Vec<Vec<u8>> {
        match self {
            Self::Baseline => samples,
            Self::Embedded => {
                for (i, sample) in samples.iter_mut().take(inserted).enumerate() {
                    write_counter(sample, i as u64);
                }
                samples
            }
            Self::Fragmented => {
                let mut next = 0u64;
                for sample in samples.iter_mut() {
                    if next as usize >= inserted {
                        break;
                    }
                    if rng.random_bool(0.25) {
                        write_counter(sample, next);
                        next += 1;
                    }
                }
                samples
            }
            Self::Humanize => {
                let mut keep = samples.len() / 100;
                if multiple_of_four {
                    keep -= keep % 4;
                }
                rand::seq::index::sample(rng, samples.len(), keep)
                    .into_iter()
                    .map(|i| std::mem::take(&mut samples[i]))
                    .collect()
            }
        }
    }
}

pub struct SimulateCommandConfig<'a> {
    pub scenario: &'a str,
    pub samples: usize,
    pub sample_bytes: usize,
    pub inserted: usize,
    pub seed: Option<u64>,
    pub block_length: usize,
    pub include_poker: bool,
}

pub fn run(cfg: SimulateCommandConfig<'_>) {
    let scenario = Scenario::parse(cfg.scenario);
    if cfg.sample_bytes == 0 {
        eprintln!("--sample-bytes must be at least 1");
        std::process::exit(1);
    }
    let config = BatteryConfig::new(cfg.block_length).with_poker(cfg.include_poker);
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    println!(
        "Simulating '{}' on {} random {}-byte samples...\n",
        scenario.as_str(),
        cfg.samples,
        cfg.sample_bytes
    );

    let samples = random_samples(&mut rng, cfg.samples, cfg.sample_bytes);
    let before = evaluate(&samples, &config);
    let altered = scenario.apply(samples, cfg.inserted, cfg.include_poker, &mut rng);
    let after = evaluate(&altered, &config);

    let bits = cfg.sample_bytes * 8;
    println!(
        "{:<18} {:>10} {:>10}   (bits passing at p >= {DEFAULT_THRESHOLD}, {} -> {} samples)",
        "Test",
        "before",
        "after",
        cfg.samples,
        altered.len()
    );
    println!("{}", "-".repeat(60));
    for (b, a) in before.iter().zip(&after) {
        println!(
            "{:<18} {:>10} {:>10}",
            b.test,
            passing_label(b, bits),
            passing_label(a, bits)
        );
    }

    println!("\nAfter '{}', all thresholds:", scenario.as_str());
    println!("{}", super::summary_header(18));
    for entry in &after {
        match &entry.result {
            Ok(map) => {
                let summary = map.summary();
                println!(
                    "{}",
                    super::summary_row(summary.test, 18, &summary.passed, summary.bits)
                );
            }
            Err(e) => println!("{:<18} error: {e}", entry.test),
        }
    }
}

fn random_samples(rng: &mut StdRng, count: usize, width: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|_| {
            let mut sample = vec![0u8; width];
            rng.fill(&mut sample[..]);
            sample
        })
        .collect()
}

/// Overwrite `sample` with `value` little-endian, zero-padded or truncated.
fn write_counter(sample: &mut [u8], value: u64) {
    let bytes = value.to_le_bytes();
    let n = sample.len().min(bytes.len());
    sample.fill(0);
    sample[..n].copy_from_slice(&bytes[..n]);
}

fn evaluate(samples: &[Vec<u8>], config: &BatteryConfig) -> Vec<BatteryEntry> {
    let entries = SampleSet::from_samples(samples).and_then(|set| run_battery(&set, config));
    match entries {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Cannot test samples: {e}");
            std::process::exit(1);
        }
    }
}

fn passing_label(entry: &BatteryEntry, bits: usize) -> String {
    match &entry.result {
        Ok(map) => format!("{}/{bits}", map.passing(DEFAULT_THRESHOLD)),
        Err(e) => {
            log::warn!("{}: {e}", entry.test);
            "error".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_parse_scenario() {
        assert_eq!(Scenario::parse("baseline"), Scenario::Baseline);
        assert_eq!(Scenario::parse("fragmented"), Scenario::Fragmented);
        assert_eq!(Scenario::parse("humanize"), Scenario::Humanize);
        assert_eq!(Scenario::parse("other"), Scenario::Embedded);
        assert_eq!(Scenario::Humanize.as_str(), "humanize");
    }

    #[test]
    fn test_write_counter_is_little_endian() {
        let mut sample = [0xAAu8; 5];
        write_counter(&mut sample, 0x0102);
        assert_eq!(sample, [0x02, 0x01, 0, 0, 0]);
        let mut short = [0u8; 1];
        write_counter(&mut short, 0x0102);
        assert_eq!(short, [0x02]);
    }

    #[test]
    fn test_embedded_overwrites_prefix() {
        let mut rng = rng();
        let samples = random_samples(&mut rng, 100, 5);
        let tail = samples[10..].to_vec();
        let out = Scenario::Embedded.apply(samples, 10, false, &mut rng);
        assert_eq!(out.len(), 100);
        for (i, sample) in out.iter().take(10).enumerate() {
            assert_eq!(sample, &[i as u8, 0, 0, 0, 0]);
        }
        assert_eq!(&out[10..], &tail[..]);
    }

    #[test]
    fn test_fragmented_inserts_counter_in_order() {
        let mut rng = rng();
        let samples = vec![vec![0xFFu8; 4]; 1_000];
        let out = Scenario::Fragmented.apply(samples, 50, false, &mut rng);
        let counters: Vec<u8> = out
            .iter()
            .filter(|s| s[1..] == [0, 0, 0])
            .map(|s| s[0])
            .collect();
        assert_eq!(counters, (0..50).collect::<Vec<u8>>());
    }

    #[test]
    fn test_humanize_draws_one_percent() {
        let mut rng = rng();
        let samples = random_samples(&mut rng, 2_000, 2);
        assert_eq!(Scenario::Humanize.apply(samples.clone(), 0, false, &mut rng).len(), 20);

        let samples = random_samples(&mut rng, 1_800, 2);
        let drawn = Scenario::Humanize.apply(samples.clone(), 0, true, &mut rng);
        assert_eq!(drawn.len(), 16);
        assert!(drawn.iter().all(|s| samples.contains(s)));
    }

    #[test]
    fn test_baseline_is_unchanged() {
        let mut rng = rng();
        let samples = random_samples(&mut rng, 10, 3);
        let out = Scenario::Baseline.apply(samples.clone(), 5, false, &mut rng);
        assert_eq!(out, samples);
    }

    #[test]
    fn test_embedded_lowers_pass_counts() {
        let mut rng = rng();
        let config = BatteryConfig::new(4).with_poker(true);
        let samples = random_samples(&mut rng, 20_000, 5);
        let before = evaluate(&samples, &config);
        let altered = Scenario::Embedded.apply(samples, 2_000, false, &mut rng);
        let after = evaluate(&altered, &config);
        for (b, a) in before.iter().zip(&after) {
            let b = b.result.as_ref().unwrap().passing(DEFAULT_THRESHOLD);
            let a = a.result.as_ref().unwrap().passing(DEFAULT_THRESHOLD);
            assert!(a < b, "{b} -> {a}");
        }
    }
}
