use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::{require_auth, resolve_user, CurrentUser, ACCESS_TOKEN_COOKIE};
use crate::models::{User, UserSummary};
use crate::services::AuthService;
use crate::utils::IDENTIFIER_RE;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(get_current_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(state, resolve_user));

    protected.merge(public)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserSummary,
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserSummary>)> {
    payload.validate()?;

    if !IDENTIFIER_RE.is_match(&payload.username) {
        return Err(AppError::BadRequest(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }
    if payload.password != payload.confirm_password {
        return Err(AppError::BadRequest("Passwords do not match.".to_string()));
    }

    let auth_service = AuthService::new(state.db.clone(), state.config.clone());
    let user = auth_service
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    payload.validate()?;

    let auth_service = AuthService::new(state.db.clone(), state.config.clone());
    let user = auth_service
        .authenticate(payload.username.trim(), &payload.password)
        .await?;
    let access_token = auth_service.issue_token(&user)?;

    tracing::info!(user_id = %user.id, "User logged in");

    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, access_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            access_token,
            token_type: "bearer",
            user: UserSummary::from(&user),
        }),
    ))
}

/// Clears the cookie; a valid token is also revoked
async fn logout(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    if let Some(Extension(user)) = current_user {
        let auth_service = AuthService::new(state.db.clone(), state.config.clone());
        auth_service.revoke_token(&user.token).await?;
        tracing::info!(user_id = %user.id, "User logged out");
    }

    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    Ok((jar, super::message("Logged out successfully")))
}

async fn get_current_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<User>> {
    let auth_service = AuthService::new(state.db.clone(), state.config.clone());
    let user = auth_service.find_user(current_user.id).await?;
    Ok(Json(user))
}
