use axum::{
    extract::{Multipart, Path, State},
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{message, viewer_id};
use crate::error::{AppError, Result};
use crate::middleware::{require_auth, resolve_user, CurrentUser};
use crate::models::{FeedItem, UpdateProfile, User, UserStats, UserSummary};
use crate::services::{ProfileService, PROFILE_POSTS_LIMIT};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", put(update_profile))
        .route("/avatar", post(upload_avatar))
        .route("/:username/follow", post(follow_user))
        .route("/:username/unfollow", post(unfollow_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/:username", get(view_profile))
        .route("/:username/followers", get(list_followers))
        .route("/:username/following", get(list_following))
        .route_layer(middleware::from_fn_with_state(state, resolve_user));

    protected.merge(public)
}

fn profile_service(state: &AppState) -> ProfileService {
    ProfileService::new(state.db.clone(), &state.config.uploads.dir)
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub stats: UserStats,
    pub posts: Vec<FeedItem>,
    pub is_following: bool,
    pub is_own_profile: bool,
}

async fn view_profile(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>> {
    let service = profile_service(&state);
    let user = service.get_by_username(&username).await?;
    let viewer = viewer_id(&current_user);

    let stats = service.stats(user.id).await?;
    let posts = service
        .user_posts(user.id, viewer, PROFILE_POSTS_LIMIT)
        .await?;
    let is_following = match viewer {
        Some(viewer) if viewer != user.id => service.is_following(viewer, user.id).await?,
        _ => false,
    };

    Ok(Json(ProfileResponse {
        is_own_profile: viewer == Some(user.id),
        user,
        stats,
        posts,
        is_following,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(length(max = 255))]
    pub website: Option<String>,
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    payload.validate()?;

    let user = profile_service(&state)
        .update_profile(
            current_user.id,
            UpdateProfile {
                full_name: payload.full_name,
                bio: payload.bio,
                location: payload.location,
                website: payload.website,
                avatar_url: None,
            },
        )
        .await?;
    Ok(Json(user))
}

/// Multipart upload with the image in the `avatar` field
async fn upload_avatar(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<User>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Avatar file name missing".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let service = profile_service(&state);
        let avatar_url = service
            .upload_avatar(&current_user.username, &filename, &bytes)
            .await?;
        let user = service
            .update_profile(
                current_user.id,
                UpdateProfile {
                    avatar_url: Some(avatar_url),
                    ..Default::default()
                },
            )
            .await?;
        return Ok(Json(user));
    }

    Err(AppError::BadRequest("Missing avatar field".to_string()))
}

async fn follow_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let service = profile_service(&state);
    let target = service.get_by_username(&username).await?;

    if !service.follow(current_user.id, target.id).await? {
        return Err(AppError::BadRequest("Already following".to_string()));
    }
    Ok(message("User followed"))
}

async fn unfollow_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let service = profile_service(&state);
    let target = service.get_by_username(&username).await?;

    if !service.unfollow(current_user.id, target.id).await? {
        return Err(AppError::BadRequest("Not following".to_string()));
    }
    Ok(message("User unfollowed"))
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub user: UserSummary,
    pub users: Vec<UserSummary>,
}

async fn list_followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserListResponse>> {
    let service = profile_service(&state);
    let user = service.get_by_username(&username).await?;
    let users = service.followers(user.id).await?;
    Ok(Json(UserListResponse {
        user: UserSummary::from(&user),
        users,
    }))
}

async fn list_following(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserListResponse>> {
    let service = profile_service(&state);
    let user = service.get_by_username(&username).await?;
    let users = service.following(user.id).await?;
    Ok(Json(UserListResponse {
        user: UserSummary::from(&user),
        users,
    }))
}
