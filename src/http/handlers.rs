use crate::http::app_server::AppState;
use crate::http::error::ApiError;
use crate::http::models::{HealthResponse, InsertQuery, InsertResponse};
use crate::rows::RowGenerator;
use crate::variant::TableVariant;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

/// Parse an optional JSON object body. Empty bodies are an empty payload.
fn parse_payload(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(e) => Err(ApiError::bad_request(format!("Invalid JSON body: {}", e))),
    }
}

/// Table from the query string, then the body, then the server default.
fn resolve_table(
    query: &InsertQuery,
    payload: &Map<String, Value>,
    default: TableVariant,
) -> Result<TableVariant, ApiError> {
    let requested = match (&query.table, payload.get("table")) {
        (Some(t), _) => Some(t.clone()),
        (None, Some(Value::String(t))) => Some(t.clone()),
        (None, Some(Value::Null)) | (None, None) => None,
        (None, Some(other)) => {
            return Err(ApiError::bad_request(format!(
                "'table' must be a string, got {}",
                other
            )))
        }
    };
    match requested {
        Some(name) => Ok(name.parse::<TableVariant>()?),
        None => Ok(default),
    }
}

/// Handler for POST /api/insert-one
#[tracing::instrument(name = "handler_insert_one", skip(state, query, body))]
pub async fn insert_one_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InsertQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<InsertResponse>), ApiError> {
    let payload = parse_payload(&body)?;
    let variant = resolve_table(&query, &payload, state.default_table)?;

    let mut row = RowGenerator::new().generate();
    let report = row.overlay(&payload)?;
    if !report.ignored.is_empty() {
        debug!(ignored = ?report.ignored, "Ignored unknown payload keys");
    }

    if let Err(e) = state.inserter.insert_row(variant, &row).await {
        error!(table = %variant, "Insert failed: {}", e);
        return Err(ApiError::internal_error(e.to_string()));
    }

    Ok((
        StatusCode::CREATED,
        Json(InsertResponse {
            ok: true,
            table: variant.table_name(),
        }),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
