//! Paginated post listings and the single-post view.

use crate::error::AppError;
use crate::models::{Comment, FeedPost};
use crate::params::{PAGE_SIZE, clamp_page};
use crate::policy::{self, Viewer};
use crate::store::{PostFilter, RecordStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub enum FeedContext<'a> {
    Global,
    Profile { username: &'a str },
    Category { slug: &'a str },
}

/// What a feed is about, handed to the renderer next to the posts.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedSubject {
    Index,
    Profile {
        username: String,
        first_name: String,
        last_name: String,
    },
    Category {
        title: String,
        description: String,
        slug: String,
    },
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub has_previous: bool,
    pub has_next: bool,
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct Feed {
    pub subject: FeedSubject,
    pub page: Page<FeedPost>,
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: FeedPost,
    pub comments: Vec<Comment>,
}

pub async fn assemble_feed(
    store: &dyn RecordStore,
    context: FeedContext<'_>,
    viewer: &Viewer,
    page: i64,
    now: DateTime<Utc>,
) -> Result<Feed, AppError> {
    let (subject, filter) = match context {
        FeedContext::Global => (FeedSubject::Index, PostFilter::visible_at(now)),
        FeedContext::Profile { username } => {
            let owner = store
                .user_by_username(username)
                .await?
                .ok_or(AppError::NotFound)?;
            // the owner previews everything they wrote
            let filter = if viewer.is(owner.id) {
                PostFilter::default().by_author(owner.id)
            } else {
                PostFilter::visible_at(now).by_author(owner.id)
            };
            let subject = FeedSubject::Profile {
                username: owner.username,
                first_name: owner.first_name,
                last_name: owner.last_name,
            };
            (subject, filter)
        }
        FeedContext::Category { slug } => {
            let category = store
                .category_by_slug(slug)
                .await?
                .filter(|c| c.is_published)
                .ok_or(AppError::NotFound)?;
            let filter = PostFilter::visible_at(now).in_category(category.id);
            let subject = FeedSubject::Category {
                title: category.title,
                description: category.description,
                slug: category.slug,
            };
            (subject, filter)
        }
    };

    let count = store.count_posts(&filter).await?;
    let (number, num_pages) = clamp_page(page, count);
    let items = store
        .list_posts(&filter, PAGE_SIZE, (number - 1) * PAGE_SIZE)
        .await?;

    debug!(?context, requested = page, number, count, "feed assembled");

    Ok(Feed {
        subject,
        page: Page {
            number,
            num_pages,
            count,
            has_previous: number > 1,
            has_next: number < num_pages,
            items,
        },
    })
}

pub async fn post_detail(
    store: &dyn RecordStore,
    post_id: i64,
    viewer: &Viewer,
    now: DateTime<Utc>,
) -> Result<PostDetail, AppError> {
    let post = store
        .post_by_id(post_id)
        .await?
        .filter(|p| policy::is_visible(p, viewer, now))
        .ok_or(AppError::NotFound)?;
    let comments = store
        .comments_for_post(post.id)
        .await?
        .into_iter()
        .filter(|c| policy::is_comment_visible(c, &post, viewer, now))
        .collect();
    Ok(PostDetail { post, comments })
}
