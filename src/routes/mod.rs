pub mod categories;
pub mod comments;
pub mod posts;
pub mod profiles;

use crate::AppState;
use crate::gate::Outcome;
use axum::{
    Router,
    response::Redirect,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/posts", post_routes())
        .nest("/api/profiles", profile_routes())
        .nest("/api/categories", category_routes())
        .route("/api/profile", put(profiles::edit_profile))
        .route("/api/login", get(profiles::login))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::get_posts).post(posts::create_post))
        .route(
            "/{post_id}",
            get(posts::get_one_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/{post_id}/comments", post(comments::create_comment))
        .route(
            "/{post_id}/comments/{comment_id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/{username}", get(profiles::get_profile))
}

pub fn category_routes() -> Router<AppState> {
    Router::new().route("/{slug}", get(categories::get_category))
}

/// Applied and refused mutations look the same on the wire.
pub(crate) fn follow<T>(outcome: &Outcome<T>) -> Redirect {
    Redirect::to(&outcome.target().path())
}
