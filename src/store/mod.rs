pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
    Category, Comment, FeedPost, Location, NewComment, NewPost, PostDraft, ProfileChanges, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} is already taken")]
    Conflict(&'static str),

    /// The record was removed between lookup and write.
    #[error("Record no longer exists")]
    Missing,
}

/// Narrows a post listing. Every field left as `None` matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    /// Keep only posts a non-author may see at this instant.
    pub visible_at: Option<DateTime<Utc>>,
}

impl PostFilter {
    pub fn visible_at(now: DateTime<Utc>) -> Self {
        Self {
            visible_at: Some(now),
            ..Self::default()
        }
    }

    pub fn by_author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Record storage shared by every request.
///
/// Listings come back ordered newest publication first with ties broken by
/// ascending id, and each post carries its comment count at fetch time.
/// Each write is a single atomic operation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>>;

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>>;

    async fn location_by_id(&self, id: i64) -> StoreResult<Option<Location>>;

    async fn post_by_id(&self, id: i64) -> StoreResult<Option<FeedPost>>;

    async fn count_posts(&self, filter: &PostFilter) -> StoreResult<i64>;

    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FeedPost>>;

    async fn comment_by_id(&self, id: i64) -> StoreResult<Option<Comment>>;

    /// Comments of a post, oldest first.
    async fn comments_for_post(&self, post_id: i64) -> StoreResult<Vec<Comment>>;

    async fn create_post(&self, post: NewPost) -> StoreResult<FeedPost>;

    async fn update_post(&self, id: i64, draft: PostDraft) -> StoreResult<FeedPost>;

    /// Removes the post together with its comments.
    async fn delete_post(&self, id: i64) -> StoreResult<()>;

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    async fn update_comment(&self, id: i64, text: String) -> StoreResult<Comment>;

    async fn delete_comment(&self, id: i64) -> StoreResult<()>;

    async fn update_profile(&self, user_id: i64, changes: ProfileChanges) -> StoreResult<User>;
}
