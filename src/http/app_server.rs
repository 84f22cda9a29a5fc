use crate::http::handlers::{health_handler, insert_one_handler};
use crate::http::inserter::Inserter;
use crate::variant::TableVariant;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Shared handler state
#[derive(Debug)]
pub struct AppState {
    pub inserter: Arc<dyn Inserter>,
    /// Variant used when a request names no table
    pub default_table: TableVariant,
}

pub struct AppServer {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub const PATH_INSERT_ONE: &str = "/api/insert-one";
pub const PATH_HEALTH: &str = "/health";

impl AppServer {
    pub fn new(inserter: Arc<dyn Inserter>, default_table: TableVariant) -> Self {
        let state = Arc::new(AppState {
            inserter,
            default_table,
        });
        AppServer {
            router: Router::new()
                .route(PATH_INSERT_ONE, post(insert_one_handler))
                .route(PATH_HEALTH, get(health_handler))
                .with_state(state.clone()),
            state,
        }
    }
}
