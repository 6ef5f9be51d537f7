use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::controllers::{db_error, not_found_detail, unauthorized};
use crate::models::{Alert, AlertKind, Comparator, CurrentUser};
use crate::services::{alerts_service, scheduler};

fn kind_str(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::Threshold => "PRICE_THRESHOLD",
        AlertKind::Duration => "PRICE_DURATION",
    }
}

fn comparator_str(comparator: Comparator) -> &'static str {
    match comparator {
        Comparator::GreaterThan => "GT",
        Comparator::LessThan => "LT",
    }
}

fn alert_json(alert: &Alert, has_triggered: bool) -> serde_json::Value {
    json!({
        "id": alert.id.to_hex(),
        "symbol": alert.symbol,
        "kind": kind_str(alert.kind),
        "comparator": comparator_str(alert.comparator),
        "threshold": alert.threshold,
        "duration_minutes": alert.duration_minutes,
        "is_active": alert.is_active,
        "condition_met_since": alert.condition_met_since,
        "has_triggered": has_triggered,
        "created_at": alert.created_at,
    })
}

fn field_error(field: &str, message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ field: message }))).into_response()
}

fn parse_flag(value: &Option<String>) -> Option<bool> {
    value.as_ref().map(|v| v.to_lowercase() == "true")
}

#[derive(Deserialize)]
pub struct CreateAlertPayload {
    pub symbol: String,
    pub kind: AlertKind,
    pub comparator: Comparator,
    pub threshold: f64,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

#[derive(Deserialize)]
pub struct ListAlertsQuery {
    pub is_active: Option<String>,
    pub triggered: Option<String>,
}

// POST /api/alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(payload): Json<CreateAlertPayload>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    if !payload.threshold.is_finite() {
        return field_error("threshold", "Enter a valid threshold price.");
    }

    match payload.kind {
        AlertKind::Duration => {
            if !payload.duration_minutes.is_some_and(|m| m > 0) {
                return field_error(
                    "duration_minutes",
                    "This field is required for duration-based alerts.",
                );
            }
        }
        AlertKind::Threshold => {
            if payload.duration_minutes.is_some() {
                return field_error(
                    "duration_minutes",
                    "Only duration-based alerts accept this field.",
                );
            }
        }
    }

    match alerts_service::find_company_by_symbol(&state, &payload.symbol).await {
        Ok(Some(_)) => {}
        Ok(None) => return field_error("symbol", "Unknown stock symbol."),
        Err(e) => return db_error(e),
    }

    let alert = match alerts_service::create_alert(
        &state,
        u.id,
        &payload.symbol,
        payload.kind,
        payload.comparator,
        payload.threshold,
        payload.duration_minutes,
    )
    .await
    {
        Ok(a) => a,
        Err(e) => return db_error(e),
    };

    // Scheduling is best-effort: a failure here must not fail the create.
    if let Err(e) =
        scheduler::ensure_user_task(&state.db, u.id, state.settings.stock_interval_minutes).await
    {
        tracing::error!(user_id = %u.id, "failed to enable evaluation task: {e}");
    }

    (StatusCode::CREATED, Json(alert_json(&alert, false))).into_response()
}

// GET /api/alerts?is_active=&triggered=
pub async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListAlertsQuery>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let is_active = parse_flag(&query.is_active);
    let triggered = parse_flag(&query.triggered);

    let alerts = match alerts_service::list_user_alerts(&state, u.id, is_active, triggered).await {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    let items: Vec<serde_json::Value> = alerts
        .iter()
        .map(|(alert, has_triggered)| alert_json(alert, *has_triggered))
        .collect();

    (StatusCode::OK, Json(json!(items))).into_response()
}

// GET /api/alerts/:id
pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return not_found_detail();
    };

    let alert = match alerts_service::get_user_alert(&state, u.id, oid).await {
        Ok(Some(a)) => a,
        Ok(None) => return not_found_detail(),
        Err(e) => return db_error(e),
    };

    let has_triggered = match alerts_service::alert_has_triggered(&state, u.id, oid).await {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    (StatusCode::OK, Json(alert_json(&alert, has_triggered))).into_response()
}

// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return not_found_detail();
    };

    match alerts_service::delete_alert(&state, u.id, oid).await {
        Ok(true) => {}
        Ok(false) => return not_found_detail(),
        Err(e) => return db_error(e),
    }

    if let Err(e) = scheduler::disable_task_if_idle(&state.db, u.id).await {
        tracing::error!(user_id = %u.id, "failed to disable evaluation task: {e}");
    }

    StatusCode::NO_CONTENT.into_response()
}

// PATCH /api/alerts/:id/reactivate
pub async fn patch_reactivate_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return not_found_detail();
    };

    let alert = match alerts_service::reactivate_alert(&state, u.id, oid).await {
        Ok(Some(a)) => a,
        Ok(None) => return not_found_detail(),
        Err(e) => return db_error(e),
    };

    if let Err(e) =
        scheduler::ensure_user_task(&state.db, u.id, state.settings.stock_interval_minutes).await
    {
        tracing::error!(user_id = %u.id, "failed to enable evaluation task: {e}");
    }

    let has_triggered = match alerts_service::alert_has_triggered(&state, u.id, oid).await {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    (StatusCode::OK, Json(alert_json(&alert, has_triggered))).into_response()
}

// GET /api/alerts/triggered
pub async fn get_triggered_alerts(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let records = match alerts_service::list_triggered(&state, u.id).await {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    let items: Vec<serde_json::Value> = records
        .iter()
        .map(|(record, alert)| {
            json!({
                "id": record.id.to_hex(),
                "alert": alert.as_ref().map(|a| alert_json(a, true)),
                "timestamp": record.timestamp,
            })
        })
        .collect();

    (StatusCode::OK, Json(json!(items))).into_response()
}
