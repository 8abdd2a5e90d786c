use anyhow::Result;
use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use challenge_core::{GuildId, SystemClock, UserId};
use challenge_server::chat::DiscordClient;
use challenge_server::config::Config;
use challenge_server::lifecycle::lifecycle_loop;
use challenge_server::reconciler::reconcile_loop;
use challenge_server::repository::SqliteRepository;
use challenge_server::webhook::webhook_router;
use challenge_server::AppState;

async fn health_check() -> Result<Json<serde_json::Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "challenge-server"
    })))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting challenge competition service");

    let config =
        Config::from_env().expect("Failed to load configuration from environment variables");

    let chat_client = DiscordClient::new(config.bot_token.clone(), config.api_base.clone())
        .expect("Failed to build chat client");

    let db_path = config.state_dir.join("challenge-state.db");
    info!("Using state database: {}", db_path.display());
    let repository = SqliteRepository::new(&db_path).expect("Failed to initialize SQLite database");

    let app_state = Arc::new(AppState {
        chat: Arc::new(chat_client),
        repository: Arc::new(repository),
        clock: Arc::new(SystemClock),
        guild_id: GuildId::from(config.guild_id),
        bot_user_id: UserId::from(config.bot_user_id),
        relay_secret: config.relay_webhook_secret,
        challenge_channel: config.challenge_channel,
        leaderboard_channel: config.leaderboard_channel,
        reconcile_guard: Mutex::new(()),
    });

    // The scheduler and the reconciliation loop coordinate with event
    // handling only through the store.
    tokio::spawn(lifecycle_loop(app_state.clone()));
    tokio::spawn(reconcile_loop(app_state.clone()));

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(webhook_router(app_state.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
