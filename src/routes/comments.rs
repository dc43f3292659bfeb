use crate::{
    error::AppError, extractors::Authenticated, gate, models::CommentDraft, routes::follow,
    store::RecordStore,
};
use axum::{
    Json,
    extract::{Path, State},
    response::Redirect,
};
use chrono::Utc;
use std::sync::Arc;

pub async fn create_comment(
    State(store): State<Arc<dyn RecordStore>>,
    Authenticated(user): Authenticated,
    Path(post_id): Path<i64>,
    Json(draft): Json<CommentDraft>,
) -> Result<Redirect, AppError> {
    let outcome = gate::create_comment(store.as_ref(), &user, post_id, draft, Utc::now()).await?;
    Ok(follow(&outcome))
}

pub async fn update_comment(
    State(store): State<Arc<dyn RecordStore>>,
    Authenticated(user): Authenticated,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Json(draft): Json<CommentDraft>,
) -> Result<Redirect, AppError> {
    let outcome =
        gate::update_comment(store.as_ref(), &user, post_id, comment_id, draft).await?;
    Ok(follow(&outcome))
}

pub async fn delete_comment(
    State(store): State<Arc<dyn RecordStore>>,
    Authenticated(user): Authenticated,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Redirect, AppError> {
    let outcome = gate::delete_comment(store.as_ref(), &user, post_id, comment_id).await?;
    Ok(follow(&outcome))
}
