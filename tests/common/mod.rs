// tests/common/mod.rs

#![allow(dead_code)]

use exam_desk::{
    config::Config,
    routes,
    state::AppState,
    store::{Storage, sqlite::SqliteStore},
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;

pub const ADMIN_EMAIL: &str = "admin@exam.test";
pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        public_origin: "http://localhost:4200".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        cors_origins: vec!["http://localhost:4200".to_string()],
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        reject_duplicate_emails: true,
        remote_api_url: None,
        remote_api_token: None,
    }
}

/// Spawns the app on a random port over a private in-memory database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    // A single connection that never recycles keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(&config.database_url)
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let state = AppState::new(config.clone(), Storage::new(SqliteStore::new(pool)))
        .await
        .expect("Failed to build state");

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        state
            .users()
            .seed_admin(email, password, &state.ids)
            .await
            .expect("Failed to seed admin");
    }

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Signs in as the seeded admin and returns the bearer token.
    pub async fn admin_token(&self) -> String {
        let res = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(res.status().as_u16(), 200);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

/// A valid exam payload whose options are worth 0, 1 and 2.
pub fn exam_payload(name: &str, questions: usize) -> Value {
    let questions: Vec<Value> = (1..=questions)
        .map(|i| {
            json!({
                "text": format!("Questão {} de {}", i, name),
                "options": [{"value": 0}, {"value": 1}, {"value": 2}]
            })
        })
        .collect();

    json!({
        "examName": name,
        "examTheme": "Urgência",
        "skillTraining": "th4",
        "clinicalCase": "Paciente de 67 anos com dor torácica.",
        "examRules": "Sem consulta.",
        "questions": questions
    })
}
