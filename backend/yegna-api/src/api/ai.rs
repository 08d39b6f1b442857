use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use content_analysis::{ModerationResult, PostAnalysis, SentimentResult, SummaryResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::{require_auth, CurrentUser};
use crate::models::AiDashboard;
use crate::services::PostService;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/analyze-post", post(analyze_post))
        .route("/analyze-comment", post(analyze_comment))
        .route("/moderate-content", post(moderate_content))
        .route("/analyze-sentiment", post(analyze_sentiment))
        .route("/summarize-content", post(summarize_content))
        .route("/posts/:id/analyze", post(analyze_existing_post))
        .route("/posts/:id/analysis", get(get_post_analysis))
        .route("/dashboard", get(dashboard))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

impl ContentRequest {
    fn trimmed(&self) -> Result<&str> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("Content cannot be empty".to_string()));
        }
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: PostAnalysis,
}

#[derive(Debug, Serialize)]
pub struct ModerationResponse {
    pub success: bool,
    #[serde(flatten)]
    pub moderation: ModerationResult,
}

#[derive(Debug, Serialize)]
pub struct SentimentResponse {
    pub success: bool,
    #[serde(flatten)]
    pub sentiment: SentimentResult,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: SummaryResult,
}

async fn analyze_post(
    State(state): State<AppState>,
    Json(payload): Json<ContentRequest>,
) -> Result<Json<AnalysisResponse>> {
    let analysis = state.ai.analyze_post(payload.trimmed()?).await;
    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
    }))
}

/// Comments go through the same analysis as posts
async fn analyze_comment(
    State(state): State<AppState>,
    Json(payload): Json<ContentRequest>,
) -> Result<Json<AnalysisResponse>> {
    let analysis = state.ai.analyze_post(payload.trimmed()?).await;
    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
    }))
}

async fn moderate_content(
    State(state): State<AppState>,
    Json(payload): Json<ContentRequest>,
) -> Result<Json<ModerationResponse>> {
    let moderation = state.ai.moderate_content(payload.trimmed()?).await;
    Ok(Json(ModerationResponse {
        success: true,
        moderation,
    }))
}

async fn analyze_sentiment(
    State(state): State<AppState>,
    Json(payload): Json<ContentRequest>,
) -> Result<Json<SentimentResponse>> {
    let sentiment = state.ai.analyze_sentiment(payload.trimmed()?).await;
    Ok(Json(SentimentResponse {
        success: true,
        sentiment,
    }))
}

async fn summarize_content(
    State(state): State<AppState>,
    Json(payload): Json<ContentRequest>,
) -> Result<Json<SummaryResponse>> {
    let summary = state.ai.summarize_content(payload.trimmed()?).await;
    Ok(Json(SummaryResponse {
        success: true,
        summary,
    }))
}

#[derive(Debug, Serialize)]
pub struct ExistingPostAnalysisResponse {
    pub success: bool,
    pub post_id: Uuid,
    pub analysis: PostAnalysis,
}

async fn analyze_existing_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ExistingPostAnalysisResponse>> {
    let analysis = PostService::new(state.db.clone(), state.ai.clone())
        .analyze_existing(current_user.id, post_id)
        .await?;

    Ok(Json(ExistingPostAnalysisResponse {
        success: true,
        post_id,
        analysis,
    }))
}

#[derive(Debug, Serialize)]
pub struct StoredAnalysisResponse {
    pub success: bool,
    pub analysis: Option<serde_json::Value>,
    pub moderation_score: Option<i32>,
    pub sentiment_score: Option<i32>,
    pub content_summary: Option<String>,
    pub is_ai_processed: bool,
}

async fn get_post_analysis(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<StoredAnalysisResponse>> {
    let post = PostService::new(state.db.clone(), state.ai.clone())
        .stored_analysis(post_id)
        .await?;

    Ok(Json(StoredAnalysisResponse {
        success: true,
        analysis: post.ai_analysis,
        moderation_score: post.moderation_score,
        sentiment_score: post.sentiment_score,
        content_summary: post.content_summary,
        is_ai_processed: post.is_ai_processed,
    }))
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<AiDashboard>> {
    let dashboard = PostService::new(state.db.clone(), state.ai.clone())
        .dashboard(current_user.id)
        .await?;
    Ok(Json(dashboard))
}
