//! Text reports written to the results directory.

use super::queries::QueryResult;
use super::stats::LatencyStats;
use crate::runlog::timestamped_path;
use crate::variant::{TableVariant, PARTITION_COLUMN};
use std::io;
use std::path::{Path, PathBuf};

pub fn read_report(variant: TableVariant, mode: &str, samples: u64, stats: &LatencyStats) -> String {
    [
        format!("# Read benchmark (by {})", PARTITION_COLUMN),
        format!("table={} mode={} samples={}", variant.table_name(), mode, samples),
        String::new(),
        "Min (ms)\tMax (ms)\tAvg (ms)\tMedian (ms)\tN".to_string(),
        format!(
            "{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}",
            stats.min, stats.max, stats.avg, stats.median, stats.n
        ),
    ]
    .join("\n")
}

pub fn queries_report(variant: TableVariant, mode: &str, runs: u64, results: &[QueryResult]) -> String {
    let mut lines = vec![
        "# Queries benchmark".to_string(),
        format!("table={} mode={} runs={}", variant.table_name(), mode, runs),
        String::new(),
        "Query | Name                          |  Min    Max    Avg  Median | N".to_string(),
        "-".repeat(70),
    ];
    for r in results {
        let s = &r.stats;
        lines.push(format!(
            "{:>5} | {:<30} | {:>6.2} {:>6.2} {:>6.2} {:>6.2} | {}",
            r.id, r.name, s.min, s.max, s.avg, s.median, s.n
        ));
    }
    lines.join("\n")
}

/// Write `content` to `<dir>/<prefix>-<variant>-<ts>.txt` and return the path.
pub fn write_report(dir: &Path, prefix: &str, variant: TableVariant, content: &str) -> io::Result<PathBuf> {
    let path = timestamped_path(dir, prefix, variant.as_str(), "txt")?;
    std::fs::write(&path, content)?;
    Ok(path)
}
