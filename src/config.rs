use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,

    pub fmp_api_key: String,
    // Global interval (minutes) shared by the price refresh job and
    // per-user alert evaluation tasks.
    pub stock_interval_minutes: i64,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub email_from: String,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "stockwatcher".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());

    let fmp_api_key = env::var("FMP_API_KEY").unwrap_or_default();

    let stock_interval_minutes = env::var("STOCK_INTERVAL_IN_MINUTES")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|m| *m > 0)
        .unwrap_or(10);

    let smtp_host = env::var("SMTP_HOST").unwrap_or_default();
    let smtp_port = env::var("SMTP_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(587);
    let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
    let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
    let email_from = env::var("EMAIL_FROM")
        .unwrap_or_else(|_| "noreply@stockwatcher.com".to_string());

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        jwt_secret,
        fmp_api_key,
        stock_interval_minutes,
        smtp_host,
        smtp_port,
        smtp_username,
        smtp_password,
        email_from,
    }
}
