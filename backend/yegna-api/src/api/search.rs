use axum::{
    extract::{Query, State},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::middleware::{require_auth, CurrentUser};
use crate::models::UserSearchResult;
use crate::services::{ProfileService, SEARCH_LIMIT};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(search_users))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub users: Vec<UserSearchResult>,
}

async fn search_users(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let q = query.q.unwrap_or_default().trim().to_string();
    if q.is_empty() {
        return Ok(Json(SearchResponse {
            query: q,
            users: Vec::new(),
        }));
    }

    let users = ProfileService::new(state.db.clone(), &state.config.uploads.dir)
        .search_users(&q, current_user.id, SEARCH_LIMIT)
        .await?;

    Ok(Json(SearchResponse { query: q, users }))
}
