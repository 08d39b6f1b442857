use chrono::Utc;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    Category, CategoryMemberView, CategoryStats, CreateCategory, FeedItem, MemberRole,
    PostWithAuthor,
};
use crate::services::post_service::{feed_item, POST_WITH_AUTHOR_SELECT};
use crate::utils::IDENTIFIER_RE;

pub const CATEGORY_POSTS_LIMIT: i64 = 20;

/// Public categories, plus private ones where `$1` is a member
const VISIBLE_TO_VIEWER: &str = r#"
    (c.is_public OR EXISTS(
        SELECT 1 FROM category_members m WHERE m.category_id = c.id AND m.user_id = $1
    ))
"#;

pub struct CategoryService {
    db: Database,
}

impl CategoryService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates the category and makes the creator its admin
    pub async fn create(&self, input: CreateCategory, creator: Uuid) -> Result<Category> {
        if !IDENTIFIER_RE.is_match(&input.name) {
            return Err(AppError::BadRequest(
                "Category name can only contain letters, numbers, and underscores".to_string(),
            ));
        }

        if self.by_name(&input.name).await?.is_some() {
            return Err(AppError::Conflict("Category name already exists".to_string()));
        }

        let mut tx = self.db.pg.begin().await?;

        let category: Category = sqlx::query_as(
            r#"
            INSERT INTO categories (id, name, display_name, description, rules,
                                    is_public, is_nsfw, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.display_name)
        .bind(&input.description)
        .bind(&input.rules)
        .bind(input.is_public)
        .bind(input.is_nsfw)
        .bind(creator)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO category_members (id, user_id, category_id, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(creator)
        .bind(category.id)
        .bind(MemberRole::Admin.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(category = %category.name, creator = %creator, "Category created");
        Ok(category)
    }

    pub async fn by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(sqlx::query_as("SELECT * FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.db.pg)
            .await?)
    }

    pub async fn by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(sqlx::query_as("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pg)
            .await?)
    }

    /// Looks the category up and checks the viewer may see it
    pub async fn visible_by_name(&self, name: &str, viewer: Option<Uuid>) -> Result<Category> {
        let category = self
            .by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        if !category.is_public {
            let member = match viewer {
                Some(user_id) => self.is_member(user_id, category.id).await?,
                None => false,
            };
            if !member {
                return Err(AppError::Forbidden);
            }
        }

        Ok(category)
    }

    pub async fn all(&self, viewer: Option<Uuid>) -> Result<Vec<Category>> {
        let query = format!(
            "SELECT c.* FROM categories c WHERE {} ORDER BY c.display_name",
            VISIBLE_TO_VIEWER
        );
        Ok(sqlx::query_as(&query)
            .bind(viewer)
            .fetch_all(&self.db.pg)
            .await?)
    }

    pub async fn user_categories(&self, user_id: Uuid) -> Result<Vec<Category>> {
        Ok(sqlx::query_as(
            r#"
            SELECT c.* FROM categories c
            JOIN category_members m ON m.category_id = c.id
            WHERE m.user_id = $1
            ORDER BY c.display_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pg)
        .await?)
    }

    /// Returns false when already a member. Private categories cannot be joined.
    pub async fn join(&self, user_id: Uuid, category: &Category) -> Result<bool> {
        if self.is_member(user_id, category.id).await? {
            return Ok(false);
        }
        if !category.is_public {
            return Err(AppError::Forbidden);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO category_members (id, user_id, category_id, role)
            VALUES ($1, $2, $3, 'member')
            ON CONFLICT (user_id, category_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(category.id)
        .execute(&self.db.pg)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    /// Returns false when not a member. Admins must hand over the role first.
    pub async fn leave(&self, user_id: Uuid, category_id: Uuid) -> Result<bool> {
        match self.user_role(user_id, category_id).await? {
            None => Ok(false),
            Some(MemberRole::Admin) => Err(AppError::BadRequest(
                "Admins cannot leave a category; assign another admin first".to_string(),
            )),
            Some(_) => {
                sqlx::query("DELETE FROM category_members WHERE user_id = $1 AND category_id = $2")
                    .bind(user_id)
                    .bind(category_id)
                    .execute(&self.db.pg)
                    .await?;
                Ok(true)
            }
        }
    }

    /// Admins first, then moderators, then members; earliest joiners first within a role
    pub async fn members(&self, category_id: Uuid) -> Result<Vec<CategoryMemberView>> {
        Ok(sqlx::query_as(
            r#"
            SELECT m.id, m.user_id, u.username, u.full_name, u.avatar_url, m.role, m.joined_at
            FROM category_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.category_id = $1
            ORDER BY CASE m.role WHEN 'admin' THEN 0 WHEN 'moderator' THEN 1 ELSE 2 END,
                     m.joined_at
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.db.pg)
        .await?)
    }

    pub async fn stats(&self, category_id: Uuid) -> Result<CategoryStats> {
        let (posts, members): (i64, i64) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM posts WHERE category_id = $1),
                   (SELECT COUNT(*) FROM category_members WHERE category_id = $1)
            "#,
        )
        .bind(category_id)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(CategoryStats { posts, members })
    }

    pub async fn is_member(&self, user_id: Uuid, category_id: Uuid) -> Result<bool> {
        Ok(self.user_role(user_id, category_id).await?.is_some())
    }

    pub async fn user_role(&self, user_id: Uuid, category_id: Uuid) -> Result<Option<MemberRole>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM category_members WHERE user_id = $1 AND category_id = $2",
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_optional(&self.db.pg)
        .await?;

        Ok(role.as_deref().and_then(MemberRole::parse))
    }

    /// Only members may post into a category
    pub async fn can_post_in_category(&self, user_id: Uuid, category_id: Uuid) -> Result<bool> {
        if self.by_id(category_id).await?.is_none() {
            return Ok(false);
        }
        self.is_member(user_id, category_id).await
    }

    /// Like `can_post_in_category`, but distinguishes a missing category from a non-member
    pub async fn ensure_can_post(&self, category_id: Uuid, user_id: Uuid) -> Result<()> {
        if self.by_id(category_id).await?.is_none() {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        if !self.is_member(user_id, category_id).await? {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    pub async fn category_posts(
        &self,
        category_id: Uuid,
        viewer: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<FeedItem>> {
        let query = format!(
            "{} WHERE p.category_id = $2 ORDER BY p.created_at DESC LIMIT $3",
            POST_WITH_AUTHOR_SELECT
        );
        let rows: Vec<PostWithAuthor> = sqlx::query_as(&query)
            .bind(viewer)
            .bind(category_id)
            .bind(limit)
            .fetch_all(&self.db.pg)
            .await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|row| feed_item(row, now)).collect())
    }

    /// Case-insensitive match on name, display name or description
    pub async fn search(&self, query: &str, viewer: Option<Uuid>) -> Result<Vec<Category>> {
        let sql = format!(
            r#"
            SELECT c.* FROM categories c
            WHERE {}
              AND (c.name ILIKE $2 OR c.display_name ILIKE $2 OR c.description ILIKE $2)
            ORDER BY c.display_name
            "#,
            VISIBLE_TO_VIEWER
        );
        Ok(sqlx::query_as(&sql)
            .bind(viewer)
            .bind(like_pattern(query))
            .fetch_all(&self.db.pg)
            .await?)
    }

    /// Changes a member's role. Only category admins may do this.
    ///
    /// The category's admin rows are locked for the whole transaction, so two admins demoting
    /// each other at once cannot leave the category without an admin.
    pub async fn assign_role(
        &self,
        category_id: Uuid,
        actor: Uuid,
        target: Uuid,
        role: MemberRole,
    ) -> Result<()> {
        let mut tx = self.db.pg.begin().await?;

        let admins: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM category_members
            WHERE category_id = $1 AND role = 'admin'
            FOR UPDATE
            "#,
        )
        .bind(category_id)
        .fetch_all(&mut *tx)
        .await?;

        let current: Option<String> = sqlx::query_scalar(
            "SELECT role FROM category_members WHERE category_id = $1 AND user_id = $2",
        )
        .bind(category_id)
        .bind(target)
        .fetch_optional(&mut *tx)
        .await?;
        let current = current.as_deref().and_then(MemberRole::parse);

        if !check_role_change(&admins, actor, current, role)? {
            return Ok(());
        }

        sqlx::query("UPDATE category_members SET role = $3 WHERE category_id = $1 AND user_id = $2")
            .bind(category_id)
            .bind(target)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(category_id = %category_id, target = %target, role = role.as_str(), "Member role changed");
        Ok(())
    }
}

/// Validates a role change against the category's current admins.
/// `Ok(false)` means the target already has the requested role.
fn check_role_change(
    admins: &[Uuid],
    actor: Uuid,
    current: Option<MemberRole>,
    role: MemberRole,
) -> Result<bool> {
    if !admins.contains(&actor) {
        return Err(AppError::Forbidden);
    }

    let current = current
        .ok_or_else(|| AppError::NotFound("User is not a member of this category".to_string()))?;

    if current == role {
        return Ok(false);
    }
    if current == MemberRole::Admin && admins.len() <= 1 {
        return Err(AppError::BadRequest(
            "A category must keep at least one admin".to_string(),
        ));
    }
    Ok(true)
}

/// `%query%` with LIKE wildcards in the query escaped
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
