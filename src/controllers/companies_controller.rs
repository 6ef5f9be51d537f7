use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::AppState;
use crate::controllers::db_error;
use crate::services::alerts_service;

// GET /api/companies — public, read-only list of trackable symbols.
pub async fn get_companies(State(state): State<AppState>) -> Response {
    let companies = match alerts_service::list_companies(&state).await {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    let items: Vec<serde_json::Value> = companies
        .into_iter()
        .map(|c| {
            json!({
                "id": c.id.to_hex(),
                "stock_symbol": c.stock_symbol,
                "current_price": c.current_price,
            })
        })
        .collect();

    (StatusCode::OK, Json(json!(items))).into_response()
}
