use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::User;
use crate::policy::Viewer;
use crate::store::RecordStore;
use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::request::Parts,
};
use std::sync::Arc;

// The fronting auth proxy puts the signed-in username in a trusted header.
// Unknown names are treated like no name at all.
impl<S> FromRequestParts<S> for Viewer
where
    Arc<dyn RecordStore>: FromRef<S>,
    AppConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = <Arc<dyn RecordStore> as FromRef<S>>::from_ref(state);
        let config = AppConfig::from_ref(state);

        let Some(username) = parts
            .headers
            .get(config.identity_header.as_str())
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            return Ok(Viewer::Anonymous);
        };

        match store.user_by_username(username).await? {
            Some(user) => Ok(Viewer::User(user)),
            None => {
                tracing::debug!(username, "identity header names an unknown user");
                Ok(Viewer::Anonymous)
            }
        }
    }
}

/// A signed-in user. Anonymous callers are sent to the login page with a
/// `next` parameter pointing back at what they asked for.
pub struct Authenticated(pub User);

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<dyn RecordStore>: FromRef<S>,
    AppConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Viewer::from_request_parts(parts, state).await? {
            Viewer::User(user) => Ok(Authenticated(user)),
            Viewer::Anonymous => {
                let config = AppConfig::from_ref(state);
                // nested routers see a stripped uri
                let uri = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map(|original| original.0.clone())
                    .unwrap_or_else(|| parts.uri.clone());
                let next = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
                Err(AppError::LoginRequired {
                    location: format!("{}?next={}", config.login_url, urlencoding::encode(next)),
                })
            }
        }
    }
}
