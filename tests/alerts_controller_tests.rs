use axum::{
    Router,
    http::{Request, StatusCode, header},
    routing::{delete, get, post},
};
use http_body_util::BodyExt;
use mongodb::{Client, bson::oid::ObjectId};
use stockwatcher::models::CurrentUser;
use stockwatcher::{AppState, config, controllers::alerts_controller, services};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let mut settings = config::load();
    settings.fmp_api_key = String::new();
    settings.smtp_host = String::new();

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    AppState {
        db,
        quotes: services::fmp::FmpClient::new(settings.fmp_api_key.clone()),
        mailer: services::mailer::Mailer::new(&settings),
        settings,
    }
}

fn current_user() -> CurrentUser {
    CurrentUser {
        id: ObjectId::new(),
        username: "test".to_string(),
        email: "test@example.com".to_string(),
    }
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

#[tokio::test]
async fn post_create_alert_unauthorized_returns_401() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/alerts", post(alerts_controller::post_create_alert))
        .with_state(state);

    let req = Request::builder()
        .method("POST")
        .uri("/api/alerts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"symbol":"AAPL","kind":"PRICE_THRESHOLD","comparator":"GT","threshold":200.0}"#,
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = response_body_string(res).await;
    assert!(body.contains("Authentication credentials were not provided."));
}

#[tokio::test]
async fn get_alerts_unauthorized_returns_401() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/alerts", get(alerts_controller::get_alerts))
        .with_state(state);

    let req = Request::builder()
        .method("GET")
        .uri("/api/alerts")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_create_duration_alert_without_minutes_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/alerts", post(alerts_controller::post_create_alert))
        .with_state(state);

    let mut req = Request::builder()
        .method("POST")
        .uri("/api/alerts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"symbol":"TSLA","kind":"PRICE_DURATION","comparator":"LT","threshold":600.0}"#,
        ))
        .unwrap();

    // Authenticated user so we hit the validation branch, not unauthorized.
    req.extensions_mut().insert(current_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("This field is required for duration-based alerts."));
}

#[tokio::test]
async fn post_create_duration_alert_with_zero_minutes_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/alerts", post(alerts_controller::post_create_alert))
        .with_state(state);

    let mut req = Request::builder()
        .method("POST")
        .uri("/api/alerts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"symbol":"TSLA","kind":"PRICE_DURATION","comparator":"LT","threshold":600.0,"duration_minutes":0}"#,
        ))
        .unwrap();

    req.extensions_mut().insert(current_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_create_threshold_alert_with_minutes_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/alerts", post(alerts_controller::post_create_alert))
        .with_state(state);

    let mut req = Request::builder()
        .method("POST")
        .uri("/api/alerts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"symbol":"AAPL","kind":"PRICE_THRESHOLD","comparator":"GT","threshold":200.0,"duration_minutes":30}"#,
        ))
        .unwrap();

    req.extensions_mut().insert(current_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Only duration-based alerts accept this field."));
}

#[tokio::test]
async fn delete_alert_with_malformed_id_returns_404() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/alerts/:id", delete(alerts_controller::delete_alert))
        .with_state(state);

    let mut req = Request::builder()
        .method("DELETE")
        .uri("/api/alerts/not-an-object-id")
        .body(axum::body::Body::empty())
        .unwrap();

    req.extensions_mut().insert(current_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_reactivate_unauthorized_returns_401() {
    let state = test_state().await;
    let app = Router::new()
        .route(
            "/api/alerts/:id/reactivate",
            axum::routing::patch(alerts_controller::patch_reactivate_alert),
        )
        .with_state(state);

    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/api/alerts/{}/reactivate", ObjectId::new().to_hex()))
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn get_triggered_unauthorized_returns_401() {
    let state = test_state().await;
    let app = Router::new()
        .route(
            "/api/alerts/triggered",
            get(alerts_controller::get_triggered_alerts),
        )
        .with_state(state);

    let req = Request::builder()
        .method("GET")
        .uri("/api/alerts/triggered")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
