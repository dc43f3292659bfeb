use crate::{
    error::AppError,
    extractors::Authenticated,
    feed::{self, Feed, FeedContext},
    gate,
    models::ProfileChanges,
    params::PageParams,
    policy::Viewer,
    routes::follow,
    store::RecordStore,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::sync::Arc;
use validator::{Validate, ValidationError};

// letters, digits and @ . + - _
static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.@+-]+$").expect("hardcoded username regex is invalid - fix source code")
});

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username"))
    }
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

#[derive(Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
}

pub async fn get_profile(
    State(store): State<Arc<dyn RecordStore>>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Feed>, AppError> {
    let feed = feed::assemble_feed(
        store.as_ref(),
        FeedContext::Profile {
            username: &username,
        },
        &viewer,
        params.page(),
        Utc::now(),
    )
    .await?;
    Ok(Json(feed))
}

pub async fn edit_profile(
    State(store): State<Arc<dyn RecordStore>>,
    Authenticated(user): Authenticated,
    Json(form): Json<ProfileForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let changes = ProfileChanges {
        username: form.username,
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
    };
    let outcome = gate::update_profile(store.as_ref(), &user, changes).await?;
    Ok(follow(&outcome))
}

/// Where anonymous writers are sent. Signing in happens in front of this service.
pub async fn login() -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Login required" })),
    )
}
