use super::{PostFilter, RecordStore, StoreError, StoreResult};
use crate::models::{
    Category, Comment, FeedPost, Location, NewComment, NewPost, PostDraft, ProfileChanges, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

const FEED_COLUMNS: &str = r#"
    p.id,
    p.title,
    p.text,
    p.pub_date,
    p.is_published,
    p.created_at,
    p.author_id,
    u.username AS author_username,
    p.category_id,
    c.title AS category_title,
    c.slug AS category_slug,
    c.is_published AS category_is_published,
    p.location_id,
    l.name AS location_name,
    (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
"#;

const FEED_JOINS: &str = r#"
    JOIN users u ON u.id = p.author_id
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

// $1 author, $2 category, $3 visibility instant
const FEED_FILTER: &str = r#"
    ($1::BIGINT IS NULL OR p.author_id = $1)
    AND
    ($2::BIGINT IS NULL OR p.category_id = $2)
    AND
    ($3::TIMESTAMPTZ IS NULL OR (p.is_published AND p.pub_date <= $3 AND c.is_published))
"#;

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, is_staff";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unique_violation(err: sqlx::Error, field: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(field),
        _ => StoreError::Database(err),
    }
}

// the referenced row went away between the gate's lookup and the insert
fn missing_reference(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::Missing,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, description, slug, is_published, created_at
            FROM categories
            WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, description, slug, is_published, created_at
            FROM categories
            WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn location_by_id(&self, id: i64) -> StoreResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, name, created_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    async fn post_by_id(&self, id: i64) -> StoreResult<Option<FeedPost>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM posts p {FEED_JOINS} WHERE p.id = $1");
        let post = sqlx::query_as::<_, FeedPost>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn count_posts(&self, filter: &PostFilter) -> StoreResult<i64> {
        let query = format!("SELECT COUNT(*) FROM posts p {FEED_JOINS} WHERE {FEED_FILTER}");
        let (count,) = sqlx::query_as::<_, (i64,)>(&query)
            .bind(filter.author_id)
            .bind(filter.category_id)
            .bind(filter.visible_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FeedPost>> {
        let query = format!(
            r#"SELECT {FEED_COLUMNS}
            FROM
                posts p
            {FEED_JOINS}
            WHERE
                {FEED_FILTER}
            ORDER BY
                p.pub_date DESC, p.id ASC
            LIMIT $4 OFFSET $5"#
        );
        let posts = sqlx::query_as::<_, FeedPost>(&query)
            .bind(filter.author_id)
            .bind(filter.category_id)
            .bind(filter.visible_at)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn comment_by_id(&self, id: i64) -> StoreResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, text, created_at, author_id, post_id FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn comments_for_post(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT id, text, created_at, author_id, post_id
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<FeedPost> {
        let query = format!(
            r#"WITH p AS (
                INSERT INTO posts (
                    title,
                    text,
                    pub_date,
                    is_published,
                    author_id,
                    category_id,
                    location_id
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {FEED_COLUMNS} FROM p {FEED_JOINS}"#
        );
        let draft = post.draft;
        let created = sqlx::query_as::<_, FeedPost>(&query)
            .bind(&draft.title)
            .bind(&draft.text)
            .bind(draft.pub_date)
            .bind(draft.is_published)
            .bind(post.author_id)
            .bind(draft.category_id)
            .bind(draft.location_id)
            .fetch_one(&self.pool)
            .await?;
        debug!(post_id = created.id, author_id = created.author_id, "post inserted");
        Ok(created)
    }

    async fn update_post(&self, id: i64, draft: PostDraft) -> StoreResult<FeedPost> {
        let query = format!(
            r#"WITH p AS (
                UPDATE
                    posts
                SET
                    title = $1,
                    text = $2,
                    pub_date = $3,
                    is_published = $4,
                    category_id = $5,
                    location_id = $6
                WHERE
                    id = $7
                RETURNING *
            )
            SELECT {FEED_COLUMNS} FROM p {FEED_JOINS}"#
        );
        sqlx::query_as::<_, FeedPost>(&query)
            .bind(&draft.title)
            .bind(&draft.text)
            .bind(draft.pub_date)
            .bind(draft.is_published)
            .bind(draft.category_id)
            .bind(draft.location_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::Missing)
    }

    async fn delete_post(&self, id: i64) -> StoreResult<()> {
        // comments go with it through ON DELETE CASCADE
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (text, author_id, post_id)
            VALUES ($1, $2, $3)
            RETURNING id, text, created_at, author_id, post_id
            "#,
        )
        .bind(&comment.text)
        .bind(comment.author_id)
        .bind(comment.post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(missing_reference)?;
        Ok(created)
    }

    async fn update_comment(&self, id: i64, text: String) -> StoreResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments SET text = $1 WHERE id = $2
            RETURNING id, text, created_at, author_id, post_id
            "#,
        )
        .bind(&text)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::Missing)
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(&self, user_id: i64, changes: ProfileChanges) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE
                users
            SET
                username = $1,
                first_name = $2,
                last_name = $3,
                email = $4
            WHERE
                id = $5
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&changes.username)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "username"))?
        .ok_or(StoreError::Missing)
    }
}
