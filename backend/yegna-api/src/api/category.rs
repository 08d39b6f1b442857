use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{message, viewer_id};
use crate::error::{AppError, Result};
use crate::middleware::{require_auth, resolve_user, CurrentUser};
use crate::models::{Category, CategoryMemberView, CategoryStats, CreateCategory, FeedItem, MemberRole};
use crate::services::{CategoryService, ProfileService, CATEGORY_POSTS_LIMIT};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_category))
        .route("/mine", get(my_categories))
        .route("/:name/join", post(join_category))
        .route("/:name/leave", post(leave_category))
        .route("/:name/members/:username/role", put(assign_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/", get(list_categories))
        .route("/search", get(search_categories))
        .route("/:name", get(view_category))
        .route("/:name/members", get(list_members))
        .route_layer(middleware::from_fn_with_state(state, resolve_user));

    protected.merge(public)
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

async fn list_categories(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
) -> Result<Json<CategoryListResponse>> {
    let categories = CategoryService::new(state.db.clone())
        .all(viewer_id(&current_user))
        .await?;
    Ok(Json(CategoryListResponse { categories }))
}

async fn my_categories(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<CategoryListResponse>> {
    let categories = CategoryService::new(state.db.clone())
        .user_categories(current_user.id)
        .await?;
    Ok(Json(CategoryListResponse { categories }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 3, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    pub description: Option<String>,
    pub rules: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub is_nsfw: bool,
}

fn default_public() -> bool {
    true
}

async fn create_category(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    payload.validate()?;

    let category = CategoryService::new(state.db.clone())
        .create(
            CreateCategory {
                name: payload.name.trim().to_string(),
                display_name: payload.display_name.trim().to_string(),
                description: payload.description,
                rules: payload.rules,
                is_public: payload.is_public,
                is_nsfw: payload.is_nsfw,
            },
            current_user.id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

async fn search_categories(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<CategoryListResponse>> {
    let q = query.q.unwrap_or_default();
    let q = q.trim();
    if q.is_empty() {
        return Ok(Json(CategoryListResponse {
            categories: Vec::new(),
        }));
    }

    let categories = CategoryService::new(state.db.clone())
        .search(q, viewer_id(&current_user))
        .await?;
    Ok(Json(CategoryListResponse { categories }))
}

#[derive(Debug, Serialize)]
pub struct CategoryDetailResponse {
    pub category: Category,
    pub stats: CategoryStats,
    pub posts: Vec<FeedItem>,
    pub is_member: bool,
    pub user_role: Option<MemberRole>,
    pub can_post: bool,
}

async fn view_category(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Path(name): Path<String>,
) -> Result<Json<CategoryDetailResponse>> {
    let service = CategoryService::new(state.db.clone());
    let viewer = viewer_id(&current_user);
    let category = service.visible_by_name(&name, viewer).await?;

    let stats = service.stats(category.id).await?;
    let posts = service
        .category_posts(category.id, viewer, CATEGORY_POSTS_LIMIT)
        .await?;
    let (user_role, can_post) = match viewer {
        Some(user_id) => (
            service.user_role(user_id, category.id).await?,
            service.can_post_in_category(user_id, category.id).await?,
        ),
        None => (None, false),
    };

    Ok(Json(CategoryDetailResponse {
        category,
        stats,
        posts,
        is_member: user_role.is_some(),
        user_role,
        can_post,
    }))
}

async fn join_category(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let service = CategoryService::new(state.db.clone());
    let category = service
        .by_name(&name)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    if !service.join(current_user.id, &category).await? {
        return Err(AppError::BadRequest("Already a member".to_string()));
    }
    Ok(message("Joined category"))
}

async fn leave_category(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let service = CategoryService::new(state.db.clone());
    let category = service
        .by_name(&name)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    if !service.leave(current_user.id, category.id).await? {
        return Err(AppError::BadRequest("Not a member".to_string()));
    }
    Ok(message("Left category"))
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<CategoryMemberView>,
}

async fn list_members(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Path(name): Path<String>,
) -> Result<Json<MembersResponse>> {
    let service = CategoryService::new(state.db.clone());
    let category = service
        .visible_by_name(&name, viewer_id(&current_user))
        .await?;
    let members = service.members(category.id).await?;
    Ok(Json(MembersResponse { members }))
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

async fn assign_role(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path((name, username)): Path<(String, String)>,
    Json(payload): Json<AssignRoleRequest>,
) -> Result<Json<serde_json::Value>> {
    let role = MemberRole::parse(&payload.role).ok_or_else(|| {
        AppError::BadRequest("Role must be one of member, moderator, admin".to_string())
    })?;

    let service = CategoryService::new(state.db.clone());
    let category = service
        .by_name(&name)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
    let target = ProfileService::new(state.db.clone(), &state.config.uploads.dir)
        .get_by_username(&username)
        .await?;

    service
        .assign_role(category.id, current_user.id, target.id, role)
        .await?;
    Ok(message("Role updated"))
}
