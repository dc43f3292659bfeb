use crate::{
    error::AppError,
    extractors::Authenticated,
    feed::{self, Feed, FeedContext, PostDetail},
    gate,
    models::PostDraft,
    params::PageParams,
    policy::Viewer,
    routes::follow,
    store::RecordStore,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

fn default_published() -> bool {
    true
}

/// Checked by the gate once the caller is known to own the post.
#[derive(Deserialize)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    /// Defaults to the moment of the request.
    pub pub_date: Option<DateTime<Utc>>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub category_id: i64,
    pub location_id: Option<i64>,
}

impl PostForm {
    fn into_draft(self, now: DateTime<Utc>) -> PostDraft {
        PostDraft {
            title: self.title,
            text: self.text,
            pub_date: self.pub_date.unwrap_or(now),
            is_published: self.is_published,
            category_id: self.category_id,
            location_id: self.location_id,
        }
    }
}

pub async fn get_posts(
    State(store): State<Arc<dyn RecordStore>>,
    viewer: Viewer,
    Query(params): Query<PageParams>,
) -> Result<Json<Feed>, AppError> {
    let feed = feed::assemble_feed(
        store.as_ref(),
        FeedContext::Global,
        &viewer,
        params.page(),
        Utc::now(),
    )
    .await?;
    Ok(Json(feed))
}

pub async fn get_one_post(
    State(store): State<Arc<dyn RecordStore>>,
    viewer: Viewer,
    Path(post_id): Path<i64>,
) -> Result<Json<PostDetail>, AppError> {
    let detail = feed::post_detail(store.as_ref(), post_id, &viewer, Utc::now()).await?;
    Ok(Json(detail))
}

pub async fn create_post(
    State(store): State<Arc<dyn RecordStore>>,
    Authenticated(user): Authenticated,
    Json(form): Json<PostForm>,
) -> Result<Redirect, AppError> {
    let outcome = gate::create_post(store.as_ref(), &user, form.into_draft(Utc::now())).await?;
    Ok(follow(&outcome))
}

pub async fn update_post(
    State(store): State<Arc<dyn RecordStore>>,
    Authenticated(user): Authenticated,
    Path(post_id): Path<i64>,
    Json(form): Json<PostForm>,
) -> Result<Redirect, AppError> {
    let draft = form.into_draft(Utc::now());
    let outcome = gate::update_post(store.as_ref(), &user, post_id, draft).await?;
    Ok(follow(&outcome))
}

pub async fn delete_post(
    State(store): State<Arc<dyn RecordStore>>,
    Authenticated(user): Authenticated,
    Path(post_id): Path<i64>,
) -> Result<Redirect, AppError> {
    let outcome = gate::delete_post(store.as_ref(), &user, post_id).await?;
    Ok(follow(&outcome))
}
