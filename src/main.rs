use std::net::SocketAddr;

use mongodb::Client;

use stockwatcher::{AppState, config, routes, services};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = services::db_init::ensure_indexes(&db).await {
        tracing::error!("failed to create indexes: {e}");
    }
    if let Err(e) = services::db_init::seed_companies(&db).await {
        tracing::error!("failed to seed companies: {e}");
    }

    let state = AppState {
        db,
        quotes: services::fmp::FmpClient::new(settings.fmp_api_key.clone()),
        mailer: services::mailer::Mailer::new(&settings),
        settings: settings.clone(),
    };

    // Background jobs: one global price refresh, one scan loop driving the
    // per-user evaluation tasks.
    services::price_refresh::spawn_price_refresh(state.clone());
    services::scheduler::spawn_alert_scheduler(state.clone());

    let app = routes::app(state);

    let addr = SocketAddr::from((
        settings.host.parse::<std::net::IpAddr>().expect("invalid HOST"),
        settings.port,
    ));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind failed");
    axum::serve(listener, app).await.expect("server error");
}
