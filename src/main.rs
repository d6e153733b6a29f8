// src/main.rs

use exam_desk::config::Config;
use exam_desk::routes;
use exam_desk::state::AppState;
use exam_desk::store::{Storage, sqlite::SqliteStore};
use sqlx::sqlite::SqlitePoolOptions;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Open the store database with retry
    let mut retry_count = 0;
    let pool = loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let storage = Storage::new(SqliteStore::new(pool));
    let state = AppState::new(config.clone(), storage)
        .await
        .expect("Failed to load application state");

    // Seed Admin User
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        match state.users().seed_admin(email, password, &state.ids).await {
            Ok(true) => tracing::info!("Seeded admin user: {}", email),
            Ok(false) => {}
            Err(e) => tracing::error!("Failed to seed admin user: {:?}", e),
        }
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
