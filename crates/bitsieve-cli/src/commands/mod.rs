pub mod analyze;
pub mod simulate;

use bitsieve_tests::{BatteryConfig, PlaneTest, SIGNIFICANCE_LEVELS};

/// Build the test list for a run, or exit with a message on bad parameters.
pub fn make_tests(block_length: usize, include_poker: bool) -> Vec<Box<dyn PlaneTest>> {
    let config = BatteryConfig::new(block_length).with_poker(include_poker);
    match config.tests() {
        Ok(tests) => tests,
        Err(e) => {
            eprintln!("Invalid test configuration: {e}");
            std::process::exit(1);
        }
    }
}

/// Header row for a passing-count table, one column per conventional threshold.
pub fn summary_header(label_width: usize) -> String {
    let mut row = format!("{:<label_width$}", "Test");
    for t in SIGNIFICANCE_LEVELS {
        row.push_str(&format!(" {:>9}", format!("p>={t}")));
    }
    row
}

/// One table row: `passed[i]` bits out of `bits` at `SIGNIFICANCE_LEVELS[i]`.
pub fn summary_row(label: &str, label_width: usize, passed: &[usize; 4], bits: usize) -> String {
    let mut row = format!("{label:<label_width$}");
    for count in passed {
        row.push_str(&format!(" {:>9}", format!("{count}/{bits}")));
    }
    row
}

/// Write a JSON document, reporting (not aborting on) I/O failure.
pub fn write_json<T: serde::Serialize>(path: &str, value: &T) {
    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to serialize results: {e}");
            return;
        }
    };
    if let Err(e) = std::fs::write(path, json) {
        eprintln!("Failed to write results to {path}: {e}");
    } else {
        println!("\nResults saved to: {path}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_tests_respects_poker_flag() {
        let names: Vec<_> = make_tests(4, false).iter().map(|t| t.name()).collect();
        assert_eq!(names, ["Frequency", "Block Frequency", "Runs"]);
        assert_eq!(make_tests(4, true).len(), 4);
    }

    #[test]
    fn test_summary_row_alignment() {
        let header = summary_header(16);
        let row = summary_row("Runs", 16, &[40, 40, 39, 35], 40);
        assert_eq!(header.len(), row.len());
        assert!(row.starts_with("Runs "));
        assert!(row.ends_with("35/40"));
    }

    #[test]
    fn test_write_json_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(path.to_str().unwrap(), &serde_json::json!({ "bits": 8 }));
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["bits"], 8);
    }
}
