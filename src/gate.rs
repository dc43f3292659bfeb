//! Create, update and delete for posts, comments and profiles.
//!
//! Callers arrive here already authenticated. Every operation ends in a
//! redirect target: either the record was written, or it was left alone and
//! the caller is sent to a read-only view. Not-found is the only error a
//! permission check produces, and only on the comment edit path. Drafts are
//! validated after the permission check, so a refused caller never learns
//! anything about their input.

use crate::error::AppError;
use crate::models::{
    Comment, CommentDraft, FeedPost, NewComment, NewPost, PostDraft, ProfileChanges, User,
};
use crate::policy::{self, Mutation, Viewer};
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use tracing::info;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Profile(String),
    Post(i64),
}

impl Target {
    pub fn path(&self) -> String {
        match self {
            Target::Profile(username) => {
                format!("/api/profiles/{}", urlencoding::encode(username))
            }
            Target::Post(id) => format!("/api/posts/{id}"),
        }
    }
}

#[derive(Debug)]
pub enum Outcome<T> {
    Applied(T, Target),
    /// Nothing was written.
    Refused(Target),
}

impl<T> Outcome<T> {
    pub fn target(&self) -> &Target {
        match self {
            Outcome::Applied(_, target) | Outcome::Refused(target) => target,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(..))
    }
}

async fn check_draft(store: &dyn RecordStore, draft: &PostDraft) -> Result<(), AppError> {
    draft.validate()?;
    if store.category_by_id(draft.category_id).await?.is_none() {
        return Err(AppError::invalid("category_id", "does_not_exist"));
    }
    if let Some(location_id) = draft.location_id {
        if store.location_by_id(location_id).await?.is_none() {
            return Err(AppError::invalid("location_id", "does_not_exist"));
        }
    }
    Ok(())
}

/// The new post always belongs to `author`; drafts carry no author field.
pub async fn create_post(
    store: &dyn RecordStore,
    author: &User,
    draft: PostDraft,
) -> Result<Outcome<FeedPost>, AppError> {
    check_draft(store, &draft).await?;
    let post = store
        .create_post(NewPost {
            author_id: author.id,
            draft,
        })
        .await?;
    info!(post_id = post.id, author = %author.username, "post created");
    Ok(Outcome::Applied(post, Target::Profile(author.username.clone())))
}

pub async fn update_post(
    store: &dyn RecordStore,
    viewer: &User,
    post_id: i64,
    draft: PostDraft,
) -> Result<Outcome<FeedPost>, AppError> {
    let post = store.post_by_id(post_id).await?.ok_or(AppError::NotFound)?;
    if !policy::can_mutate(&post, &Viewer::from(viewer.clone()), Mutation::Update) {
        info!(post_id, user = %viewer.username, "post update refused");
        return Ok(Outcome::Refused(Target::Post(post_id)));
    }
    check_draft(store, &draft).await?;
    let post = store.update_post(post_id, draft).await?;
    info!(post_id, "post updated");
    Ok(Outcome::Applied(post, Target::Post(post_id)))
}

pub async fn delete_post(
    store: &dyn RecordStore,
    viewer: &User,
    post_id: i64,
) -> Result<Outcome<()>, AppError> {
    let post = store.post_by_id(post_id).await?.ok_or(AppError::NotFound)?;
    if !policy::can_mutate(&post, &Viewer::from(viewer.clone()), Mutation::Delete) {
        info!(post_id, user = %viewer.username, "post delete refused");
        return Ok(Outcome::Refused(Target::Post(post_id)));
    }
    store.delete_post(post_id).await?;
    info!(post_id, user = %viewer.username, "post deleted");
    Ok(Outcome::Applied((), Target::Profile(post.author_username)))
}

/// Comments can only be left on posts the commenter is able to see.
pub async fn create_comment(
    store: &dyn RecordStore,
    author: &User,
    post_id: i64,
    draft: CommentDraft,
    now: DateTime<Utc>,
) -> Result<Outcome<Comment>, AppError> {
    let viewer = Viewer::from(author.clone());
    store
        .post_by_id(post_id)
        .await?
        .filter(|p| policy::is_visible(p, &viewer, now))
        .ok_or(AppError::NotFound)?;
    draft.validate()?;
    let comment = store
        .create_comment(NewComment {
            author_id: author.id,
            post_id,
            text: draft.text,
        })
        .await?;
    info!(comment_id = comment.id, post_id, "comment created");
    Ok(Outcome::Applied(comment, Target::Post(post_id)))
}

async fn comment_under(
    store: &dyn RecordStore,
    post_id: i64,
    comment_id: i64,
) -> Result<Comment, AppError> {
    store
        .comment_by_id(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or(AppError::NotFound)
}

/// Unlike every other refusal this one surfaces as not-found.
pub async fn update_comment(
    store: &dyn RecordStore,
    viewer: &User,
    post_id: i64,
    comment_id: i64,
    draft: CommentDraft,
) -> Result<Outcome<Comment>, AppError> {
    let comment = comment_under(store, post_id, comment_id).await?;
    if !policy::can_mutate(&comment, &Viewer::from(viewer.clone()), Mutation::Update) {
        info!(comment_id, user = %viewer.username, "comment update refused");
        return Err(AppError::NotFound);
    }
    draft.validate()?;
    let comment = store.update_comment(comment_id, draft.text).await?;
    Ok(Outcome::Applied(comment, Target::Post(post_id)))
}

pub async fn delete_comment(
    store: &dyn RecordStore,
    viewer: &User,
    post_id: i64,
    comment_id: i64,
) -> Result<Outcome<()>, AppError> {
    let comment = comment_under(store, post_id, comment_id).await?;
    if !policy::can_mutate(&comment, &Viewer::from(viewer.clone()), Mutation::Delete) {
        info!(comment_id, user = %viewer.username, "comment delete refused");
        return Ok(Outcome::Refused(Target::Post(post_id)));
    }
    store.delete_comment(comment_id).await?;
    Ok(Outcome::Applied((), Target::Post(post_id)))
}

pub async fn update_profile(
    store: &dyn RecordStore,
    viewer: &User,
    changes: ProfileChanges,
) -> Result<Outcome<User>, AppError> {
    let user = store.update_profile(viewer.id, changes).await?;
    info!(user_id = user.id, username = %user.username, "profile updated");
    let target = Target::Profile(user.username.clone());
    Ok(Outcome::Applied(user, target))
}
