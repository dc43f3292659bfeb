//! Process-local record store, used for development runs and the test suite.

use super::{PostFilter, RecordStore, StoreError, StoreResult};
use crate::models::{
    Category, Comment, FeedPost, Location, NewComment, NewPost, PostDraft, ProfileChanges, User,
};
use crate::policy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct PostRow {
    id: i64,
    title: String,
    text: String,
    pub_date: DateTime<Utc>,
    is_published: bool,
    created_at: DateTime<Utc>,
    author_id: i64,
    category_id: i64,
    location_id: Option<i64>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    locations: BTreeMap<i64, Location>,
    posts: BTreeMap<i64, PostRow>,
    comments: BTreeMap<i64, Comment>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn join(&self, row: &PostRow) -> Option<FeedPost> {
        let author = self.users.get(&row.author_id)?;
        let category = self.categories.get(&row.category_id)?;
        let location = row.location_id.and_then(|id| self.locations.get(&id));
        let comment_count = self
            .comments
            .values()
            .filter(|c| c.post_id == row.id)
            .count() as i64;

        Some(FeedPost {
            id: row.id,
            title: row.title.clone(),
            text: row.text.clone(),
            pub_date: row.pub_date,
            is_published: row.is_published,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: author.username.clone(),
            category_id: category.id,
            category_title: category.title.clone(),
            category_slug: category.slug.clone(),
            category_is_published: category.is_published,
            location_id: location.map(|l| l.id),
            location_name: location.map(|l| l.name.clone()),
            comment_count,
        })
    }

    fn matching(&self, filter: &PostFilter) -> Vec<FeedPost> {
        let mut posts: Vec<FeedPost> = self
            .posts
            .values()
            .filter(|row| filter.author_id.is_none_or(|id| row.author_id == id))
            .filter(|row| filter.category_id.is_none_or(|id| row.category_id == id))
            .filter_map(|row| self.join(row))
            .filter(|post| {
                filter
                    .visible_at
                    .is_none_or(|now| policy::is_publicly_visible(post, now))
            })
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(a.id.cmp(&b.id)));
        posts
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str, is_staff: bool) -> User {
        let mut tables = self.tables.write().await;
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_staff,
        };
        tables.users.insert(user.id, user.clone());
        user
    }

    pub async fn add_category(&self, title: &str, slug: &str, is_published: bool) -> Category {
        let mut tables = self.tables.write().await;
        let category = Category {
            id: tables.next_id(),
            title: title.to_string(),
            description: String::new(),
            slug: slug.to_string(),
            is_published,
            created_at: Utc::now(),
        };
        tables.categories.insert(category.id, category.clone());
        category
    }

    pub async fn set_category_published(&self, id: i64, is_published: bool) {
        if let Some(category) = self.tables.write().await.categories.get_mut(&id) {
            category.is_published = is_published;
        }
    }

    pub async fn add_location(&self, name: &str) -> Location {
        let mut tables = self.tables.write().await;
        let location = Location {
            id: tables.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.locations.insert(location.id, location.clone());
        location
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn location_by_id(&self, id: i64) -> StoreResult<Option<Location>> {
        Ok(self.tables.read().await.locations.get(&id).cloned())
    }

    async fn post_by_id(&self, id: i64) -> StoreResult<Option<FeedPost>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).and_then(|row| tables.join(row)))
    }

    async fn count_posts(&self, filter: &PostFilter) -> StoreResult<i64> {
        Ok(self.tables.read().await.matching(filter).len() as i64)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FeedPost>> {
        let posts = self.tables.read().await.matching(filter);
        Ok(posts
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn comment_by_id(&self, id: i64) -> StoreResult<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn comments_for_post(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<FeedPost> {
        let mut tables = self.tables.write().await;
        let draft = post.draft;
        let row = PostRow {
            id: tables.next_id(),
            title: draft.title,
            text: draft.text,
            pub_date: draft.pub_date,
            is_published: draft.is_published,
            created_at: Utc::now(),
            author_id: post.author_id,
            category_id: draft.category_id,
            location_id: draft.location_id,
        };
        let created = tables.join(&row).ok_or(StoreError::Missing)?;
        tables.posts.insert(row.id, row);
        Ok(created)
    }

    async fn update_post(&self, id: i64, draft: PostDraft) -> StoreResult<FeedPost> {
        let mut tables = self.tables.write().await;
        let mut row = tables.posts.get(&id).cloned().ok_or(StoreError::Missing)?;
        row.title = draft.title;
        row.text = draft.text;
        row.pub_date = draft.pub_date;
        row.is_published = draft.is_published;
        row.category_id = draft.category_id;
        row.location_id = draft.location_id;
        let updated = tables.join(&row).ok_or(StoreError::Missing)?;
        tables.posts.insert(id, row);
        Ok(updated)
    }

    async fn delete_post(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.posts.remove(&id);
        tables.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(StoreError::Missing);
        }
        let created = Comment {
            id: tables.next_id(),
            text: comment.text,
            created_at: Utc::now(),
            author_id: comment.author_id,
            post_id: comment.post_id,
        };
        tables.comments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_comment(&self, id: i64, text: String) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        let comment = tables.comments.get_mut(&id).ok_or(StoreError::Missing)?;
        comment.text = text;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<()> {
        self.tables.write().await.comments.remove(&id);
        Ok(())
    }

    async fn update_profile(&self, user_id: i64, changes: ProfileChanges) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.id != user_id && u.username == changes.username);
        if taken {
            return Err(StoreError::Conflict("username"));
        }
        let user = tables.users.get_mut(&user_id).ok_or(StoreError::Missing)?;
        user.username = changes.username;
        user.first_name = changes.first_name;
        user.last_name = changes.last_name;
        user.email = changes.email;
        Ok(user.clone())
    }
}
