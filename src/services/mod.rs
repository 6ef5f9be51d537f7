pub mod fmp;
pub mod db_init;
pub mod engine;
pub mod price_refresh;
pub mod alert_checker;
pub mod scheduler;
pub mod mailer;

pub mod auth_service;
pub mod alerts_service;
