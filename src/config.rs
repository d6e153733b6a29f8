// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Allowed number of exam sub-forms in one builder batch.
pub const MAX_EXAMS_PER_BATCH: usize = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Origin used when deriving share links (e.g. `https://provas.example.com`).
    pub public_origin: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub reject_duplicate_emails: bool,
    /// Base URL of the remote exam API, when backend-backed generation is enabled.
    pub remote_api_url: Option<String>,
    /// Bearer token sent to the remote exam API.
    pub remote_api_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://exam-desk.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let public_origin = env::var("PUBLIC_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:4200".to_string())
            .trim_end_matches('/')
            .to_string();

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec![public_origin.clone()]);

        let reject_duplicate_emails = env::var("REJECT_DUPLICATE_EMAILS")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            public_origin,
            bind_addr,
            cors_origins,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            reject_duplicate_emails,
            remote_api_url: env::var("REMOTE_API_URL").ok().filter(|v| !v.trim().is_empty()),
            remote_api_token: env::var("REMOTE_API_TOKEN").ok(),
        }
    }
}
