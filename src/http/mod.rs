pub mod app_server;
pub mod error;
pub mod handlers;
pub mod inserter;
pub mod models;

pub use inserter::{BackendInserter, Inserter};
