use axum::{Router, routing::get};

use crate::{AppState, controllers::companies_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/api/companies", get(companies_controller::get_companies))
}
