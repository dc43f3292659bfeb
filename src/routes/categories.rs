use crate::{
    error::AppError,
    feed::{self, Feed, FeedContext},
    params::PageParams,
    policy::Viewer,
    store::RecordStore,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use std::sync::Arc;

pub async fn get_category(
    State(store): State<Arc<dyn RecordStore>>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Feed>, AppError> {
    let feed = feed::assemble_feed(
        store.as_ref(),
        FeedContext::Category { slug: &slug },
        &viewer,
        params.page(),
        Utc::now(),
    )
    .await?;
    Ok(Json(feed))
}
