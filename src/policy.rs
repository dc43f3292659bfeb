//! Who may see a record and who may change it.
//!
//! Every predicate here is pure: it looks only at the record snapshot, the
//! viewer and the instant passed in by the caller. Handlers read the clock
//! once per request and thread that value through.

use crate::models::{Comment, FeedPost, User};
use chrono::{DateTime, Utc};

/// The identity a read or mutation is evaluated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(User),
}

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(user) => Some(user),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    /// True when the viewer is the given user.
    pub fn is(&self, user_id: i64) -> bool {
        self.id() == Some(user_id)
    }

    pub fn is_staff(&self) -> bool {
        self.user().is_some_and(|u| u.is_staff)
    }
}

impl From<User> for Viewer {
    fn from(user: User) -> Self {
        Viewer::User(user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Update,
    Delete,
}

/// A record with a permanent author.
pub trait Owned {
    /// Whether staff members may delete records of this kind they don't own.
    const STAFF_MAY_DELETE: bool;

    fn author_id(&self) -> i64;
}

impl Owned for FeedPost {
    const STAFF_MAY_DELETE: bool = true;

    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Owned for Comment {
    const STAFF_MAY_DELETE: bool = false;

    fn author_id(&self) -> i64 {
        self.author_id
    }
}

/// Visibility of a post to someone who is not its author.
pub fn is_publicly_visible(post: &FeedPost, now: DateTime<Utc>) -> bool {
    post.is_published && post.pub_date <= now && post.category_is_published
}

/// Authors always see their own posts, published or not.
pub fn is_visible(post: &FeedPost, viewer: &Viewer, now: DateTime<Utc>) -> bool {
    viewer.is(post.author_id) || is_publicly_visible(post, now)
}

/// Comments carry no flag of their own and follow their parent post.
pub fn is_comment_visible(
    comment: &Comment,
    parent: &FeedPost,
    viewer: &Viewer,
    now: DateTime<Utc>,
) -> bool {
    debug_assert_eq!(comment.post_id, parent.id);
    viewer.is(comment.author_id) || is_visible(parent, viewer, now)
}

/// Anonymous viewers are neither an author nor staff, so they never pass.
pub fn can_mutate<R: Owned>(record: &R, viewer: &Viewer, mutation: Mutation) -> bool {
    viewer.is(record.author_id())
        || (mutation == Mutation::Delete && R::STAFF_MAY_DELETE && viewer.is_staff())
}
