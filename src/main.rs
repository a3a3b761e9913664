use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod config;
mod db;
mod error;
mod format;
mod handlers;
mod middleware;
mod models;
mod store;
mod webhooks;

// AppState holds the database connection pool and the webhook client,
// both built once at startup.
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub webhooks: webhooks::WebhookClient,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    // Create the database connection pool (runs migrations)
    let db_pool = db::create_pool()
        .await
        .expect("Failed to create database pool.");

    // Resolve the webhook URL set once; it is read-only afterwards.
    let webhook_config = config::WebhookConfig::from_env();
    let webhooks = webhooks::WebhookClient::new(webhook_config);

    let shared_state = Arc::new(AppState { db_pool, webhooks });

    let app = Router::new()
        .merge(handlers::chat::chat_routes())
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state));

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,research_agent=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,research_agent=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON output for log aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🔎 Research agent starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

// API status endpoint
async fn api_status(
    Extension(state): Extension<Arc<AppState>>,
) -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    let db_status = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let config = state.webhooks.config();

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "webhooks": {
                "environment": config.environment,
                "timeout_secs": config.timeout.as_secs(),
                "retry_attempts": config.retry_attempts,
                "retry_delay_ms": config.retry_delay.as_millis() as u64,
            }
        },
        "endpoints": {
            "status": "/api/status",
            "chat": "/api/chat/*"
        }
    }))
}
