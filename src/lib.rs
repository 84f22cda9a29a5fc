pub mod backend;
pub mod bench;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod rows;
pub mod runlog;
pub mod schema;
pub mod sql;
pub mod telemetry;
pub mod variant;

pub use error::BenchError;
pub use variant::TableVariant;
