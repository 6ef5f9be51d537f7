use axum::{
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use mongodb::bson::{doc, oid::ObjectId};

use crate::AppState;
use crate::models::{CurrentUser, User};
use crate::services::auth_service;

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let mut parts = raw.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;

    // Token strings must not contain spaces.
    if parts.next().is_some() {
        return None;
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    Some(token.to_string())
}

/// Decodes the Bearer access token, loads the user, and stashes a
/// `CurrentUser` in request extensions. Invalid, expired, or wrong-type
/// tokens simply inject nothing; protected handlers answer 401 themselves.
pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        if let Ok(claims) = auth_service::decode_token(&state, &token) {
            if claims.token_type == "access" {
                if let Ok(user_id) = ObjectId::parse_str(&claims.sub) {
                    let users = state.db.collection::<User>("users");

                    if let Ok(Some(user)) = users.find_one(doc! { "_id": user_id }, None).await {
                        req.extensions_mut().insert(CurrentUser::from(user));
                    }
                }
            }
        }
    }

    next.run(req).await
}
