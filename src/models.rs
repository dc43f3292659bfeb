use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A post row joined with everything a reader needs to see it: author name,
/// category (including its publication flag) and location label.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeedPost {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub author_username: String,
    pub category_id: i64,
    pub category_title: String,
    pub category_slug: String,
    pub category_is_published: bool,
    pub location_id: Option<i64>,
    pub location_name: Option<String>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub post_id: i64,
}

/// Fields of a post as written by its author. The author itself is never
/// part of a draft; the mutation gate supplies it.
#[derive(Debug, Clone, Validate)]
pub struct PostDraft {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(min = 1))]
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub category_id: i64,
    pub location_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub draft: PostDraft,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentDraft {
    #[validate(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub author_id: i64,
    pub post_id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ProfileChanges {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}
