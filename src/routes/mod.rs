use axum::Router;
use axum::middleware::from_fn_with_state;

use crate::{AppState, controllers};

pub mod auth_routes;
pub mod companies_routes;
pub mod alerts_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = auth_routes::add_routes(router);
    let router = companies_routes::add_routes(router);
    let router = alerts_routes::add_routes(router);

    router
        .fallback(controllers::not_found)
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .with_state(state)
}
