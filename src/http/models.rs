use serde::{Deserialize, Serialize};

/// Query string for POST /api/insert-one
#[derive(Debug, Default, Deserialize)]
pub struct InsertQuery {
    pub table: Option<String>,
}

/// Response body for POST /api/insert-one
#[derive(Debug, Serialize)]
pub struct InsertResponse {
    pub ok: bool,
    pub table: String,
}

/// Response body for GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}
