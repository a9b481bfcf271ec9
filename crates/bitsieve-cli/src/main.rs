//! CLI for bitsieve: per-bit-position randomness tests for sample collections.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bitsieve")]
#[command(about = "bitsieve — test every bit position of a sample collection for randomness")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the per-bit test battery on a file of captured samples
    Analyze {
        /// Input file
        path: String,

        /// Bytes per sample (required for raw input)
        #[arg(long)]
        sample_bytes: Option<usize>,

        /// Significant bits per sample (defaults to every bit of every byte)
        #[arg(long)]
        bits: Option<usize>,

        /// Input format: raw (packed bytes) or bits (ASCII 0/1, one bit per sample)
        #[arg(long, default_value = "raw", value_parser = ["raw", "bits"])]
        format: String,

        /// Block length M for the block frequency test
        #[arg(long, default_value = "4")]
        block_length: usize,

        /// Also run the FIPS 140-1 poker test
        #[arg(long)]
        poker: bool,

        /// Significance threshold for the per-bit pass/fail column
        #[arg(long, default_value = "0.01")]
        threshold: f64,

        /// Write per-bit results as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Generate random samples, apply a degradation scenario and compare pass counts
    Simulate {
        /// Degradation scenario
        #[arg(long, default_value = "embedded", value_parser = ["baseline", "embedded", "fragmented", "humanize"])]
        scenario: String,

        /// Number of random samples to generate
        #[arg(long, default_value = "20000")]
        samples: usize,

        /// Bytes per generated sample
        #[arg(long, default_value = "5")]
        sample_bytes: usize,

        /// Counter values to insert (embedded, fragmented)
        #[arg(long, default_value = "200")]
        inserted: usize,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Block length M for the block frequency test
        #[arg(long, default_value = "4")]
        block_length: usize,

        /// Also run the FIPS 140-1 poker test
        #[arg(long)]
        poker: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            sample_bytes,
            bits,
            format,
            block_length,
            poker,
            threshold,
            output,
        } => commands::analyze::run(commands::analyze::AnalyzeCommandConfig {
            path: &path,
            sample_bytes,
            bits,
            format: &format,
            block_length,
            include_poker: poker,
            threshold,
            output_path: output.as_deref(),
        }),
        Commands::Simulate {
            scenario,
            samples,
            sample_bytes,
            inserted,
            seed,
            block_length,
            poker,
        } => commands::simulate::run(commands::simulate::SimulateCommandConfig {
            scenario: &scenario,
            samples,
            sample_bytes,
            inserted,
            seed,
            block_length,
            include_poker: poker,
        }),
    }
}
