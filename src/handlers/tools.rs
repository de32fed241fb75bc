use crate::error::{AppError, Result};
use crate::schema::ToolRecord;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// A missing or null query is treated like an empty one.
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    /// Anything other than an integer matches no tool.
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// POST /send - Generate, validate and store a tool for the query.
///
/// # Flow
/// 1. Build the prompt (400 on blank query, before any external call)
/// 2. Call the completion API and validate the candidate
/// 3. Persist and return the stored record with its id
pub async fn send_handler(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<ToolRecord>> {
    let Json(request) = body.map_err(invalid_body)?;
    let query = request.query.unwrap_or_default();
    let record = state.orchestrator.synthesize(&query).await?;
    Ok(Json(record))
}

/// GET /tools - All stored tools.
pub async fn list_tools_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ToolRecord>>> {
    let tools = state.orchestrator.list_tools().await?;
    tracing::debug!(count = tools.len(), "Listed tools");
    Ok(Json(tools))
}

/// DELETE /tools - Remove a tool by id. Unknown ids are not an error.
pub async fn delete_tool_handler(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>> {
    let Json(request) = body.map_err(invalid_body)?;

    let removed = match request.id.as_i64() {
        Some(id) => state.orchestrator.delete_tool(id).await?,
        None => {
            tracing::debug!(id = %request.id, "Delete requested without an integer id");
            false
        }
    };

    let message = if removed {
        "Deleted successfully"
    } else {
        "Tool not found"
    };
    Ok(Json(DeleteResponse { message }))
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::InvalidQueryError(rejection.body_text())
}
