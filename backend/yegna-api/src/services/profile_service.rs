use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{FeedItem, PostWithAuthor, UpdateProfile, User, UserSearchResult, UserStats, UserSummary};
use crate::services::category_service::like_pattern;
use crate::services::post_service::{feed_item, POST_WITH_AUTHOR_SELECT};
use crate::utils::avatar_extension;

pub const PROFILE_POSTS_LIMIT: i64 = 10;
pub const SEARCH_LIMIT: i64 = 10;

/// Public URL prefix that `ServeDir` maps onto the uploads directory
pub const UPLOADS_URL_PREFIX: &str = "/static/uploads";

pub struct ProfileService {
    db: Database,
    uploads_dir: PathBuf,
}

impl ProfileService {
    pub fn new(db: Database, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            uploads_dir: uploads_dir.into(),
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<UserStats> {
        let (posts, followers, following, total_likes, total_comments): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM posts WHERE user_id = $1),
                    (SELECT COUNT(*) FROM user_follows WHERE followed_id = $1),
                    (SELECT COUNT(*) FROM user_follows WHERE follower_id = $1),
                    (SELECT COALESCE(SUM(likes_count), 0)::int8 FROM posts WHERE user_id = $1),
                    (SELECT COALESCE(SUM(comments_count), 0)::int8 FROM posts WHERE user_id = $1)
                "#,
            )
            .bind(user_id)
            .fetch_one(&self.db.pg)
            .await?;

        Ok(UserStats {
            posts,
            followers,
            following,
            total_likes,
            total_comments,
        })
    }

    pub async fn user_posts(
        &self,
        user_id: Uuid,
        viewer: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<FeedItem>> {
        let query = format!(
            "{} WHERE p.user_id = $2 ORDER BY p.created_at DESC LIMIT $3",
            POST_WITH_AUTHOR_SELECT
        );
        let rows: Vec<PostWithAuthor> = sqlx::query_as(&query)
            .bind(viewer)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.db.pg)
            .await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|row| feed_item(row, now)).collect())
    }

    /// Returns false when already following
    pub async fn follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        if follower_id == followed_id {
            return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_follows (id, follower_id, followed_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, followed_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(follower_id)
        .bind(followed_id)
        .execute(&self.db.pg)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    /// Returns false when not following
    pub async fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        let deleted = sqlx::query(
            "DELETE FROM user_follows WHERE follower_id = $1 AND followed_id = $2",
        )
        .bind(follower_id)
        .bind(followed_id)
        .execute(&self.db.pg)
        .await?
        .rows_affected();

        Ok(deleted > 0)
    }

    pub async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_follows WHERE follower_id = $1 AND followed_id = $2)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.db.pg)
        .await?)
    }

    pub async fn followers(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        Ok(sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.full_name, u.avatar_url
            FROM user_follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.followed_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pg)
        .await?)
    }

    pub async fn following(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        Ok(sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.full_name, u.avatar_url
            FROM user_follows f
            JOIN users u ON u.id = f.followed_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pg)
        .await?)
    }

    /// Only fields present in `update` change
    pub async fn update_profile(&self, user_id: Uuid, update: UpdateProfile) -> Result<User> {
        let user: User = sqlx::query_as(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                bio = COALESCE($3, bio),
                location = COALESCE($4, location),
                website = COALESCE($5, website),
                avatar_url = COALESCE($6, avatar_url)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(update.full_name)
        .bind(update.bio)
        .bind(update.location)
        .bind(update.website)
        .bind(update.avatar_url)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::debug!(user_id = %user_id, "Profile updated");
        Ok(user)
    }

    /// Writes the image under `avatars/` and returns its public URL
    pub async fn upload_avatar(&self, username: &str, filename: &str, bytes: &[u8]) -> Result<String> {
        let ext = avatar_extension(filename).ok_or_else(|| {
            AppError::BadRequest("Avatar must be a png, jpg, jpeg, gif or webp image".to_string())
        })?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Avatar file is empty".to_string()));
        }

        let file_name = avatar_file_name(username, &ext, Utc::now());
        let dir = self.uploads_dir.join("avatars");

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create avatar dir: {}", e)))?;
        tokio::fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to write avatar: {}", e)))?;

        tracing::info!(username = %username, file = %file_name, "Avatar stored");
        Ok(format!("{}/avatars/{}", UPLOADS_URL_PREFIX, file_name))
    }

    /// Username or full name match, excluding the viewer
    pub async fn search_users(
        &self,
        query: &str,
        viewer: Uuid,
        limit: i64,
    ) -> Result<Vec<UserSearchResult>> {
        let rows: Vec<(Uuid, String, Option<String>, Option<String>, bool)> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.full_name, u.avatar_url,
                   EXISTS(SELECT 1 FROM user_follows f
                          WHERE f.follower_id = $1 AND f.followed_id = u.id) AS is_following
            FROM users u
            WHERE u.id <> $1
              AND (u.username ILIKE $2 OR u.full_name ILIKE $2)
            ORDER BY u.username
            LIMIT $3
            "#,
        )
        .bind(viewer)
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, username, full_name, avatar_url, is_following)| UserSearchResult {
                id,
                username,
                full_name,
                avatar_url,
                is_following,
            })
            .collect())
    }
}

fn avatar_file_name(username: &str, ext: &str, at: chrono::DateTime<Utc>) -> String {
    format!("{}_{}.{}", username, at.format("%Y%m%d_%H%M%S"), ext)
}
