use std::sync::Arc;

use chrono::{DateTime, Utc};
use content_analysis::{AiManager, PostAnalysis};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    AiDashboard, AnalyzedPost, Comment, CommentView, CommentWithAuthor, FeedItem, Post,
    PostWithAuthor, Submission,
};
use crate::services::CategoryService;
use crate::utils::format_time;

pub const FEED_LIMIT: i64 = 50;
const DASHBOARD_RECENT_LIMIT: i64 = 10;

/// Columns for `PostWithAuthor`; `$1` is the viewer id (NULL for anonymous)
pub(crate) const POST_WITH_AUTHOR_SELECT: &str = r#"
    SELECT p.id, p.content, p.user_id, u.username, p.category_id,
           p.likes_count, p.comments_count,
           EXISTS(SELECT 1 FROM post_likes pl WHERE pl.post_id = p.id AND pl.user_id = $1) AS liked,
           p.created_at
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

const COMMENT_WITH_AUTHOR_SELECT: &str = r#"
    SELECT c.id, c.content, c.user_id, u.username, c.post_id, c.parent_id, c.likes_count,
           EXISTS(SELECT 1 FROM comment_likes cl WHERE cl.comment_id = c.id AND cl.user_id = $1) AS liked,
           c.created_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

#[derive(Debug, Clone, Copy)]
enum LikeTarget {
    Post,
    Comment,
}

impl LikeTarget {
    fn like_table(&self) -> &'static str {
        match self {
            LikeTarget::Post => "post_likes",
            LikeTarget::Comment => "comment_likes",
        }
    }

    fn target_table(&self) -> &'static str {
        match self {
            LikeTarget::Post => "posts",
            LikeTarget::Comment => "comments",
        }
    }

    fn fk_column(&self) -> &'static str {
        match self {
            LikeTarget::Post => "post_id",
            LikeTarget::Comment => "comment_id",
        }
    }

    fn not_found(&self) -> AppError {
        match self {
            LikeTarget::Post => AppError::NotFound("Post not found".to_string()),
            LikeTarget::Comment => AppError::NotFound("Comment not found".to_string()),
        }
    }
}

pub struct PostService {
    db: Database,
    ai: Arc<AiManager>,
}

impl PostService {
    pub fn new(db: Database, ai: Arc<AiManager>) -> Self {
        Self { db, ai }
    }

    /// Trims the content and runs the full analysis on it
    async fn screen(&self, content: &str) -> Result<(String, PostAnalysis)> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("Content cannot be empty".to_string()));
        }

        let analysis = self.ai.analyze_post(content).await;
        Ok((content.to_string(), analysis))
    }

    pub async fn create_post(
        &self,
        user_id: Uuid,
        content: &str,
        category_id: Option<Uuid>,
    ) -> Result<Submission<Post>> {
        if let Some(category_id) = category_id {
            CategoryService::new(self.db.clone())
                .ensure_can_post(category_id, user_id)
                .await?;
        }

        let (content, analysis) = self.screen(content).await?;
        let warnings = analysis.warnings();

        if !analysis.is_appropriate() {
            tracing::info!(user_id = %user_id, flags = ?analysis.moderation.flags, "Post blocked by moderation");
            return Ok(Submission::Blocked { warnings });
        }

        let (analysis_json, moderation_score, sentiment_score) = stored_fields(&analysis)?;

        let post: Post = sqlx::query_as(
            r#"
            INSERT INTO posts (id, content, user_id, category_id, ai_analysis,
                               moderation_score, sentiment_score, content_summary, is_ai_processed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&content)
        .bind(user_id)
        .bind(category_id)
        .bind(analysis_json)
        .bind(moderation_score)
        .bind(sentiment_score)
        .bind(&analysis.summary.summary)
        .fetch_one(&self.db.pg)
        .await?;

        tracing::info!(post_id = %post.id, user_id = %user_id, warnings = warnings.len(), "Post created");
        Ok(Submission::Created { item: post, warnings })
    }

    pub async fn create_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> Result<Submission<Comment>> {
        self.find_post(post_id).await?;
        self.insert_comment(user_id, post_id, None, content).await
    }

    /// Reply to a comment; the reply belongs to the parent's post
    pub async fn create_reply(
        &self,
        user_id: Uuid,
        parent_id: Uuid,
        content: &str,
    ) -> Result<Submission<Comment>> {
        let parent = self.find_comment(parent_id).await?;
        self.insert_comment(user_id, parent.post_id, Some(parent.id), content)
            .await
    }

    async fn insert_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        parent_id: Option<Uuid>,
        content: &str,
    ) -> Result<Submission<Comment>> {
        let (content, analysis) = self.screen(content).await?;
        let warnings = analysis.warnings();

        if !analysis.is_appropriate() {
            tracing::info!(user_id = %user_id, post_id = %post_id, "Comment blocked by moderation");
            return Ok(Submission::Blocked { warnings });
        }

        let mut tx = self.db.pg.begin().await?;

        let comment: Comment = sqlx::query_as(
            r#"
            INSERT INTO comments (id, content, user_id, post_id, parent_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&content)
        .bind(user_id)
        .bind(post_id)
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(comment_id = %comment.id, post_id = %post_id, "Comment created");
        Ok(Submission::Created {
            item: comment,
            warnings,
        })
    }

    pub async fn find_post(&self, post_id: Uuid) -> Result<Post> {
        sqlx::query_as("SELECT * FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    pub async fn find_comment(&self, comment_id: Uuid) -> Result<Comment> {
        sqlx::query_as("SELECT * FROM comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// Newest posts first, across all authors
    pub async fn feed(&self, viewer: Option<Uuid>, limit: i64) -> Result<Vec<FeedItem>> {
        let query = format!(
            "{} ORDER BY p.created_at DESC LIMIT $2",
            POST_WITH_AUTHOR_SELECT
        );
        let rows: Vec<PostWithAuthor> = sqlx::query_as(&query)
            .bind(viewer)
            .bind(limit)
            .fetch_all(&self.db.pg)
            .await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|row| feed_item(row, now)).collect())
    }

    pub async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Post not found or not owned by you".to_string(),
            ));
        }

        tracing::info!(post_id = %post_id, user_id = %user_id, "Post deleted");
        Ok(())
    }

    pub async fn like_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        self.add_like(LikeTarget::Post, user_id, post_id).await
    }

    pub async fn unlike_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        self.remove_like(LikeTarget::Post, user_id, post_id).await
    }

    pub async fn like_comment(&self, user_id: Uuid, comment_id: Uuid) -> Result<bool> {
        self.add_like(LikeTarget::Comment, user_id, comment_id).await
    }

    pub async fn unlike_comment(&self, user_id: Uuid, comment_id: Uuid) -> Result<bool> {
        self.remove_like(LikeTarget::Comment, user_id, comment_id).await
    }

    /// Returns false when the like already existed
    async fn add_like(&self, target: LikeTarget, user_id: Uuid, target_id: Uuid) -> Result<bool> {
        let mut tx = self.db.pg.begin().await?;

        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            target.target_table()
        ))
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(target.not_found());
        }

        let inserted = sqlx::query(&format!(
            "INSERT INTO {} (id, user_id, {}) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            target.like_table(),
            target.fk_column()
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Ok(false);
        }

        sqlx::query(&format!(
            "UPDATE {} SET likes_count = likes_count + 1 WHERE id = $1",
            target.target_table()
        ))
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Returns false when there was no like to remove
    async fn remove_like(
        &self,
        target: LikeTarget,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool> {
        let mut tx = self.db.pg.begin().await?;

        let deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
            target.like_table(),
            target.fk_column()
        ))
        .bind(user_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            return Ok(false);
        }

        sqlx::query(&format!(
            "UPDATE {} SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1",
            target.target_table()
        ))
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// All comments of a post, replies included, oldest first
    pub async fn comments_for_post(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Vec<CommentView>> {
        self.find_post(post_id).await?;

        let query = format!(
            "{} WHERE c.post_id = $2 ORDER BY c.created_at ASC",
            COMMENT_WITH_AUTHOR_SELECT
        );
        self.comment_views(&query, viewer, post_id).await
    }

    pub async fn replies_for_comment(
        &self,
        comment_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Vec<CommentView>> {
        self.find_comment(comment_id).await?;

        let query = format!(
            "{} WHERE c.parent_id = $2 ORDER BY c.created_at ASC",
            COMMENT_WITH_AUTHOR_SELECT
        );
        self.comment_views(&query, viewer, comment_id).await
    }

    async fn comment_views(
        &self,
        query: &str,
        viewer: Option<Uuid>,
        id: Uuid,
    ) -> Result<Vec<CommentView>> {
        let rows: Vec<CommentWithAuthor> = sqlx::query_as(query)
            .bind(viewer)
            .bind(id)
            .fetch_all(&self.db.pg)
            .await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|row| comment_view(row, now)).collect())
    }

    /// Deletes the comment and every reply beneath it. Returns the number of rows removed.
    pub async fn delete_comment(&self, user_id: Uuid, comment_id: Uuid) -> Result<u64> {
        let comment = self.find_comment(comment_id).await?;
        if comment.user_id != user_id {
            return Err(AppError::NotFound(
                "Comment not found or not owned by you".to_string(),
            ));
        }

        let mut tx = self.db.pg.begin().await?;

        let removed = sqlx::query(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id FROM comments WHERE id = $1
                UNION ALL
                SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id
            )
            DELETE FROM comments WHERE id IN (SELECT id FROM subtree)
            "#,
        )
        .bind(comment_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            "UPDATE posts SET comments_count = GREATEST(comments_count - $2, 0) WHERE id = $1",
        )
        .bind(comment.post_id)
        .bind(removed as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(comment_id = %comment_id, removed, "Comment thread deleted");
        Ok(removed)
    }

    /// Re-runs the analysis on an existing post and stores it. Owner only.
    pub async fn analyze_existing(&self, user_id: Uuid, post_id: Uuid) -> Result<PostAnalysis> {
        let post = self.find_post(post_id).await?;
        if post.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        let analysis = self.ai.analyze_post(&post.content).await;
        let (analysis_json, moderation_score, sentiment_score) = stored_fields(&analysis)?;

        sqlx::query(
            r#"
            UPDATE posts
            SET ai_analysis = $2, moderation_score = $3, sentiment_score = $4,
                content_summary = $5, is_ai_processed = TRUE
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(analysis_json)
        .bind(moderation_score)
        .bind(sentiment_score)
        .bind(&analysis.summary.summary)
        .execute(&self.db.pg)
        .await?;

        Ok(analysis)
    }

    /// Stored analysis of a post; NotFound when it has never been analysed
    pub async fn stored_analysis(&self, post_id: Uuid) -> Result<Post> {
        let post = self.find_post(post_id).await?;
        if post.ai_analysis.is_none() {
            return Err(AppError::NotFound("No AI analysis available".to_string()));
        }
        Ok(post)
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<AiDashboard> {
        let (total_posts, ai_processed_posts, avg_moderation, avg_sentiment): (
            i64,
            i64,
            Option<f64>,
            Option<f64>,
        ) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE is_ai_processed),
                   (AVG(moderation_score) FILTER (WHERE is_ai_processed))::float8,
                   (AVG(sentiment_score) FILTER (WHERE is_ai_processed))::float8
            FROM posts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db.pg)
        .await?;

        let posts_with_ai: Vec<AnalyzedPost> = sqlx::query_as(
            r#"
            SELECT id, content, moderation_score, sentiment_score, content_summary,
                   ai_analysis, created_at
            FROM posts
            WHERE user_id = $1 AND is_ai_processed
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(DASHBOARD_RECENT_LIMIT)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(AiDashboard {
            total_posts,
            ai_processed_posts,
            avg_moderation_score: round1(avg_moderation.unwrap_or(0.0)),
            avg_sentiment_score: round1(avg_sentiment.unwrap_or(50.0)),
            ai_processing_rate: processing_rate(ai_processed_posts, total_posts),
            posts_with_ai,
        })
    }
}

/// JSON blob plus the two percentage columns persisted with a post
fn stored_fields(analysis: &PostAnalysis) -> Result<(serde_json::Value, i32, i32)> {
    let json = serde_json::to_value(analysis)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode analysis: {}", e)))?;
    Ok((
        json,
        percent(analysis.moderation.confidence),
        percent(analysis.sentiment.sentiment_score),
    ))
}

fn percent(score: f64) -> i32 {
    (score * 100.0).trunc() as i32
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn processing_rate(processed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(processed as f64 / total as f64 * 100.0)
}

pub(crate) fn feed_item(row: PostWithAuthor, now: DateTime<Utc>) -> FeedItem {
    FeedItem {
        id: row.id,
        content: row.content,
        user: row.username,
        user_id: row.user_id,
        category_id: row.category_id,
        time: format_time(row.created_at, now),
        likes: row.likes_count,
        comments: row.comments_count,
        liked: row.liked,
    }
}

fn comment_view(row: CommentWithAuthor, now: DateTime<Utc>) -> CommentView {
    CommentView {
        id: row.id,
        content: row.content,
        user: row.username,
        user_id: row.user_id,
        post_id: row.post_id,
        parent_id: row.parent_id,
        time: format_time(row.created_at, now),
        likes: row.likes_count,
        liked: row.liked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_stored_fields_percentages() {
        let analysis = AiManager::fallback_analysis("hello there");
        let (json, moderation, sentiment) = stored_fields(&analysis).unwrap();

        assert_eq!(moderation, 50);
        assert_eq!(sentiment, 50);
        assert_eq!(json["overall_score"], 0.5);
        assert_eq!(json["summary"]["summary"], "hello there");
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(0.876), 87);
        assert_eq!(percent(0.999), 99);
        assert_eq!(percent(0.0), 0);
        assert_eq!(percent(1.0), 100);
    }

    #[test]
    fn test_processing_rate() {
        assert_eq!(processing_rate(0, 0), 0.0);
        assert_eq!(processing_rate(1, 3), 33.3);
        assert_eq!(processing_rate(4, 4), 100.0);
    }

    #[test]
    fn test_feed_item_mapping() {
        let now = Utc::now();
        let row = PostWithAuthor {
            id: Uuid::new_v4(),
            content: "Selam".into(),
            user_id: Uuid::new_v4(),
            username: "abebe".into(),
            category_id: None,
            likes_count: 3,
            comments_count: 1,
            liked: true,
            created_at: now - Duration::hours(2),
        };

        let item = feed_item(row, now);
        assert_eq!(item.user, "abebe");
        assert_eq!(item.time, "2 hours ago");
        assert_eq!(item.likes, 3);
        assert!(item.liked);
    }
}
