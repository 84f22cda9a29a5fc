//! Fill, read and query benchmarks.

pub mod fill;
pub mod queries;
pub mod read;
pub mod report;
pub mod stats;

pub use fill::{fill, FillSummary};
pub use queries::{run_queries, QueryOptions, QueryResult, QUERIES};
pub use read::run_read;
pub use stats::LatencyStats;
