use std::sync::Arc;

use content_analysis::AiManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yegna_api::{build_router, config::Config, db::Database, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connections
    let db = Database::connect(&config).await?;
    tracing::info!("Database connections established");

    // Run database migrations
    db.run_migrations().await?;

    tokio::fs::create_dir_all(std::path::Path::new(&config.uploads.dir).join("avatars")).await?;

    let ai = AiManager::new(&config.ai)?;
    if config.ai.hf_key().is_none() {
        tracing::warn!("Hugging Face API key not configured; analyses run in fallback mode");
    }

    let state = AppState {
        db,
        config: config.clone(),
        ai: Arc::new(ai),
    };
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "yegna_api=debug,content_analysis=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
