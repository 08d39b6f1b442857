mod ai;
mod auth;
mod category;
mod feed;
mod profile;
mod search;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::middleware::CurrentUser;
use crate::models::Submission;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes(state.clone()))
        .merge(feed::routes(state.clone()))
        .nest("/profile", profile::routes(state.clone()))
        .nest("/search", search::routes(state.clone()))
        .nest("/categories", category::routes(state.clone()))
        .nest("/ai", ai::routes(state))
}

/// Id of the signed-in user on routes where auth is optional
pub(crate) fn viewer_id(user: &Option<Extension<CurrentUser>>) -> Option<uuid::Uuid> {
    user.as_ref().map(|Extension(user)| user.id)
}

pub(crate) fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

/// 201 with the created item, or 400 when moderation blocked it
pub(crate) fn submission_response<T: Serialize>(
    submission: Submission<T>,
    key: &str,
    noun: &str,
) -> Response {
    match submission {
        Submission::Created { item, warnings } => {
            let message = if warnings.is_empty() {
                format!("{} created", noun)
            } else {
                format!("{} created with warnings", noun)
            };
            let mut body = json!({
                "success": true,
                "message": message,
                "warnings": warnings,
            });
            body[key] = json!(item);
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Submission::Blocked { warnings } => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": format!("{} blocked: Content appears to be inappropriate", noun),
                "warnings": warnings,
            })),
        )
            .into_response(),
    }
}
