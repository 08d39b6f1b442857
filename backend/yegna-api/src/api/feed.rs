use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Response,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{message, submission_response, viewer_id};
use crate::error::{AppError, Result};
use crate::middleware::{require_auth, resolve_user, CurrentUser};
use crate::models::{CommentView, FeedItem};
use crate::services::{PostService, FEED_LIMIT};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/posts", post(create_post))
        .route("/posts/:id", delete(delete_post))
        .route("/posts/:id/like", post(like_post))
        .route("/posts/:id/unlike", post(unlike_post))
        .route("/posts/:id/comments", post(create_comment))
        .route("/comments/:id", delete(delete_comment))
        .route("/comments/:id/like", post(like_comment))
        .route("/comments/:id/unlike", post(unlike_comment))
        .route("/comments/:id/reply", post(create_reply))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/feed", get(get_feed))
        .route("/posts/:id/comments", get(list_comments))
        .route("/comments/:id/replies", get(list_replies))
        .route_layer(middleware::from_fn_with_state(state, resolve_user));

    protected.merge(public)
}

fn post_service(state: &AppState) -> PostService {
    PostService::new(state.db.clone(), state.ai.clone())
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub posts: Vec<FeedItem>,
}

async fn get_feed(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    let limit = query.limit.unwrap_or(FEED_LIMIT).clamp(1, 100);
    let posts = post_service(&state)
        .feed(viewer_id(&current_user), limit)
        .await?;
    Ok(Json(FeedResponse { posts }))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    pub category_id: Option<Uuid>,
}

async fn create_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Response> {
    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("Post content cannot be empty".to_string()));
    }

    let submission = post_service(&state)
        .create_post(current_user.id, &payload.content, payload.category_id)
        .await?;
    Ok(submission_response(submission, "post", "Post"))
}

async fn delete_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    post_service(&state)
        .delete_post(current_user.id, post_id)
        .await?;
    Ok(message("Post deleted"))
}

async fn like_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if !post_service(&state).like_post(current_user.id, post_id).await? {
        return Err(AppError::BadRequest("Already liked".to_string()));
    }
    Ok(message("Post liked"))
}

async fn unlike_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if !post_service(&state).unlike_post(current_user.id, post_id).await? {
        return Err(AppError::BadRequest("Not liked yet".to_string()));
    }
    Ok(message("Post unliked"))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentView>,
}

async fn create_comment(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<Response> {
    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("Comment content cannot be empty".to_string()));
    }

    let submission = post_service(&state)
        .create_comment(current_user.id, post_id, &payload.content)
        .await?;
    Ok(submission_response(submission, "comment", "Comment"))
}

async fn list_comments(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<CommentsResponse>> {
    let comments = post_service(&state)
        .comments_for_post(post_id, viewer_id(&current_user))
        .await?;
    Ok(Json(CommentsResponse { comments }))
}

async fn create_reply(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<Response> {
    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("Reply content cannot be empty".to_string()));
    }

    let submission = post_service(&state)
        .create_reply(current_user.id, comment_id, &payload.content)
        .await?;
    Ok(submission_response(submission, "reply", "Reply"))
}

async fn list_replies(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentsResponse>> {
    let comments = post_service(&state)
        .replies_for_comment(comment_id, viewer_id(&current_user))
        .await?;
    Ok(Json(CommentsResponse { comments }))
}

async fn delete_comment(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let removed = post_service(&state)
        .delete_comment(current_user.id, comment_id)
        .await?;
    Ok(Json(serde_json::json!({
        "message": "Comment deleted",
        "removed": removed,
    })))
}

async fn like_comment(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if !post_service(&state)
        .like_comment(current_user.id, comment_id)
        .await?
    {
        return Err(AppError::BadRequest("Already liked".to_string()));
    }
    Ok(message("Comment liked"))
}

async fn unlike_comment(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if !post_service(&state)
        .unlike_comment(current_user.id, comment_id)
        .await?
    {
        return Err(AppError::BadRequest("Not liked yet".to_string()));
    }
    Ok(message("Comment unliked"))
}
