//! YegnaConnect API
//!
//! JSON backend for the YegnaConnect social network: accounts, posts, threaded comments,
//! likes, follows and categories. Every post, comment and reply passes through the
//! content-analysis pipeline before it is stored; inappropriate content is rejected.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{routing::get, Router};
use content_analysis::AiManager;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::db::Database;
use crate::services::UPLOADS_URL_PREFIX;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub ai: Arc<AiManager>,
}

pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.uploads.dir);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes(state.clone()))
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
