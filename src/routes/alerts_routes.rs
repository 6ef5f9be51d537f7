use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/alerts", get(alerts_controller::get_alerts))
        .route("/api/alerts", post(alerts_controller::post_create_alert))
        .route(
            "/api/alerts/triggered",
            get(alerts_controller::get_triggered_alerts),
        )
        .route("/api/alerts/:id", get(alerts_controller::get_alert))
        .route("/api/alerts/:id", delete(alerts_controller::delete_alert))
        .route(
            "/api/alerts/:id/reactivate",
            patch(alerts_controller::patch_reactivate_alert),
        )
}
