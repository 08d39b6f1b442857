use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub ai_analysis: Option<serde_json::Value>,
    pub moderation_score: Option<i32>,
    pub sentiment_score: Option<i32>,
    pub content_summary: Option<String>,
    pub is_ai_processed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub likes_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Post row joined with its author and the viewer's like state
#[derive(Debug, Clone, FromRow)]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub content: String,
    pub user_id: Uuid,
    pub username: String,
    pub category_id: Option<Uuid>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub content: String,
    pub user_id: Uuid,
    pub username: String,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub likes_count: i32,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub content: String,
    pub user: String,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub time: String,
    pub likes: i32,
    pub comments: i32,
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub user: String,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub time: String,
    pub likes: i32,
    pub liked: bool,
}

/// Outcome of creating gated content
#[derive(Debug, Clone)]
pub enum Submission<T> {
    Created { item: T, warnings: Vec<String> },
    Blocked { warnings: Vec<String> },
}

/// Post with its stored analysis, as listed on the dashboard
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalyzedPost {
    pub id: Uuid,
    pub content: String,
    pub moderation_score: Option<i32>,
    pub sentiment_score: Option<i32>,
    pub content_summary: Option<String>,
    pub ai_analysis: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Per-user analysis statistics
#[derive(Debug, Clone, Serialize)]
pub struct AiDashboard {
    pub total_posts: i64,
    pub ai_processed_posts: i64,
    pub avg_moderation_score: f64,
    pub avg_sentiment_score: f64,
    pub ai_processing_rate: f64,
    pub posts_with_ai: Vec<AnalyzedPost>,
}
