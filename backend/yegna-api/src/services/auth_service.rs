use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use redis::AsyncCommands;
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::middleware::{decode_token, Claims};
use crate::models::User;

pub struct AuthService {
    db: Database,
    config: Config,
}

impl AuthService {
    pub fn new(db: Database, config: Config) -> Self {
        Self { db, config }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.db.pg)
                .await?;
        if username_taken {
            return Err(AppError::Conflict("Username already exists.".to_string()));
        }

        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.db.pg)
                .await?;
        if email_taken {
            return Err(AppError::Conflict("Email already exists.".to_string()));
        }

        let password_hash = hash_password(password)?;

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db.pg)
        .await
        .map_err(registration_error)?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Looks the user up by username or email and checks the password
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<User> {
        let user: User = sqlx::query_as("SELECT * FROM users WHERE username = $1 OR email = $1")
            .bind(login)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::InvalidCredentials("User not found.".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(username = %user.username, "Rejected login with wrong password");
            return Err(AppError::InvalidCredentials("Incorrect password.".to_string()));
        }

        Ok(user)
    }

    pub async fn find_user(&self, id: Uuid) -> Result<User> {
        sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        generate_token(
            user.id,
            &user.username,
            &self.config.jwt.secret,
            self.config.jwt.expiry_minutes,
        )
    }

    /// Blacklists the token until it would have expired. No-op without Redis.
    pub async fn revoke_token(&self, token: &str) -> Result<()> {
        let Some(mut conn) = self.db.get_redis_conn().await? else {
            tracing::debug!("Redis not configured; token not blacklisted");
            return Ok(());
        };

        let ttl = match decode_token(token, &self.config.jwt.secret) {
            Ok(claims) => (claims.exp as i64 - Utc::now().timestamp()).max(1) as u64,
            Err(_) => return Ok(()),
        };

        let key = format!("token_blacklist:{}", token);
        conn.set_ex::<_, _, ()>(&key, "1", ttl).await?;

        Ok(())
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?
        .to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn generate_token(
    user_id: Uuid,
    username: &str,
    secret: &str,
    expiry_minutes: i64,
) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::minutes(expiry_minutes);

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Token generation failed: {}", e)))
}

/// A concurrent registration can pass the existence checks and still hit the unique index
fn registration_error(err: sqlx::Error) -> AppError {
    let conflict = err
        .as_database_error()
        .and_then(|db_err| duplicate_user_conflict(db_err.code().as_deref(), db_err.constraint()));
    conflict.unwrap_or(AppError::Database(err))
}

/// PostgreSQL unique violation (23505) on `users`, named after the violated column
fn duplicate_user_conflict(code: Option<&str>, constraint: Option<&str>) -> Option<AppError> {
    if code != Some("23505") {
        return None;
    }
    let message = if constraint.is_some_and(|name| name.contains("email")) {
        "Email already exists."
    } else {
        "Username already exists."
    };
    Some(AppError::Conflict(message.to_string()))
}
