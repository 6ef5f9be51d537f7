use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::controllers::unauthorized;
use crate::models::CurrentUser;
use crate::services::auth_service::{self, FieldErrors};

fn is_valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

fn validation_error(errs: FieldErrors) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!(errs))).into_response()
}

#[derive(Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshPayload {
    #[serde(default)]
    pub refresh: String,
}

// POST /api/auth/register
pub async fn post_register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    let username = payload.username.trim();
    let email = payload.email.trim();
    let password = payload.password.as_str();

    let mut errs = FieldErrors::new();
    if username.is_empty() {
        errs.insert("username".into(), "Username is required.".into());
    }
    if email.is_empty() {
        errs.insert("email".into(), "Email is required.".into());
    } else if !is_valid_email(email) {
        errs.insert("email".into(), "Invalid email.".into());
    }
    if password.is_empty() {
        errs.insert("password".into(), "Password is required.".into());
    } else if password.len() < 6 {
        errs.insert("password".into(), "Password must be at least 6 characters.".into());
    }
    if !errs.is_empty() {
        return validation_error(errs);
    }

    match auth_service::register_user(&state, username, email, password).await {
        Ok(user_id) => (
            StatusCode::CREATED,
            Json(json!({
                "id": user_id.to_hex(),
                "username": username,
                "email": email,
            })),
        )
            .into_response(),
        Err(errs) => validation_error(errs),
    }
}

// POST /api/auth/login
pub async fn post_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let email = payload.email.trim();
    let password = payload.password.as_str();

    let mut errs = FieldErrors::new();
    if email.is_empty() {
        errs.insert("email".into(), "Email is required.".into());
    }
    if password.is_empty() {
        errs.insert("password".into(), "Password is required.".into());
    }
    if !errs.is_empty() {
        return validation_error(errs);
    }

    let user = match auth_service::login_user(&state, email, password).await {
        Ok(u) => u,
        Err(detail) => {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response();
        }
    };

    match auth_service::generate_tokens(&state, &user.id) {
        Ok(tokens) => (StatusCode::OK, Json(json!(tokens))).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": format!("token error: {e}") })),
        )
            .into_response(),
    }
}

// POST /api/auth/refresh
pub async fn post_refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Response {
    if payload.refresh.trim().is_empty() {
        let mut errs = FieldErrors::new();
        errs.insert("refresh".into(), "Refresh token is required.".into());
        return validation_error(errs);
    }

    match auth_service::refresh_tokens(&state, payload.refresh.trim()).await {
        Ok(tokens) => (StatusCode::OK, Json(json!(tokens))).into_response(),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired." })),
        )
            .into_response(),
    }
}

// GET /api/auth/me
pub async fn get_me(user: Option<Extension<CurrentUser>>) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    (
        StatusCode::OK,
        Json(json!({
            "id": u.id.to_hex(),
            "username": u.username,
            "email": u.email,
        })),
    )
        .into_response()
}
