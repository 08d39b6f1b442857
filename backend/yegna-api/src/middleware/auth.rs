use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, DecodingKey, Validation};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    /// Raw token, kept so logout can revoke it
    pub token: String,
}

/// Token from `Authorization: Bearer`, else from the `access_token` cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(ACCESS_TOKEN_COOKIE)?;
    let value = cookie.value().trim();
    let value = value.strip_prefix("Bearer ").unwrap_or(value);
    (!value.is_empty()).then(|| value.to_string())
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

async fn is_revoked(state: &AppState, token: &str) -> Result<bool> {
    let Some(mut conn) = state.db.get_redis_conn().await? else {
        return Ok(false);
    };
    let key = format!("token_blacklist:{}", token);
    let revoked: bool = conn.exists(&key).await?;
    Ok(revoked)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Option<CurrentUser>> {
    let Some(token) = extract_token(headers) else {
        return Ok(None);
    };

    let claims = match decode_token(&token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(_) => return Ok(None),
    };

    if is_revoked(state, &token).await? {
        tracing::debug!(username = %claims.username, "Rejected revoked token");
        return Ok(None);
    }

    let id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return Ok(None),
    };

    Ok(Some(CurrentUser {
        id,
        username: claims.username,
        token,
    }))
}

/// Rejects the request with 401 unless a valid, unrevoked token is present
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let current_user = authenticate(&state, request.headers())
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Attaches the user when a valid token is present; anonymous requests pass through
pub async fn resolve_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(current_user) = authenticate(&state, request.headers()).await? {
        request.extensions_mut().insert(current_user);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc.def.ghi"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer xyz"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_bearer_header_wins_over_stale_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=stale.cookie.token"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer fresh.header.token"));
        assert_eq!(extract_token(&headers).as_deref(), Some("fresh.header.token"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn test_decode_rejects_wrong_secret() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "abebe".into(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"right"),
        )
        .unwrap();

        assert!(decode_token(&token, "right").is_ok());
        assert!(matches!(
            decode_token(&token, "wrong"),
            Err(AppError::Unauthorized)
        ));
    }
}
