use serde::Serialize;
use std::time::Duration;

/// Latency summary in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
    pub n: usize,
}

impl LatencyStats {
    /// Reduce samples to min/max/avg/median. `None` when there are no samples.
    pub fn from_millis(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let sum: f64 = sorted.iter().sum();
        let mid = n / 2;
        let median = if n % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            min: sorted[0],
            max: sorted[n - 1],
            avg: sum / n as f64,
            median,
            n,
        })
    }

    pub fn from_durations(samples: &[Duration]) -> Option<Self> {
        let millis: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        Self::from_millis(&millis)
    }
}
