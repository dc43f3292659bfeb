use axum::{
    Router,
    body::{Body, to_bytes},
    http::StatusCode,
    response::Response,
};
use blogicum::{
    AppState,
    config::AppConfig,
    routes::create_router,
    store::{MemoryStore, PostFilter, RecordStore},
};
use chrono::{Duration, Utc};
use http::{Request, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct Harness {
    store: Arc<MemoryStore>,
    router: Router,
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "memory:".to_string(),
        run_migrations: false,
        server_addr: "127.0.0.1:0".to_string(),
        identity_header: "x-remote-user".to_string(),
        login_url: "/api/login".to_string(),
    }
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        config: test_config(),
    };
    Harness {
        store,
        router: create_router(state),
    }
}

impl Harness {
    async fn send(&self, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-remote-user", user);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let request = builder
            .body(body)
            .unwrap_or_else(|err| panic!("failed to build request: {err}"));
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(err) => panic!("router request failed: {err}"),
        }
    }

    async fn post_ids_of(&self, author_id: i64) -> Vec<i64> {
        self.store
            .list_posts(&PostFilter::default().by_author(author_id), 100, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect()
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_else(|| panic!("no Location header, status {}", response.status()))
}

async fn response_json(response: Response) -> Value {
    let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(err) => panic!("failed to read response body: {err}"),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => panic!("response body is not JSON: {err}"),
    }
}

fn item_ids(feed: &Value) -> Vec<i64> {
    feed["page"]["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|p| p["id"].as_i64()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn hidden_post_lifecycle_across_viewers() {
    let h = harness();
    let alice = h.store.add_user("alice", false).await;
    let bob = h.store.add_user("bob", false).await;
    h.store.add_user("admin", true).await;
    let travel = h.store.add_category("Travel", "travel", true).await;

    // bob's name in the body must not stick
    let response = h
        .send(
            "POST",
            "/api/posts",
            Some("alice"),
            Some(json!({
                "title": "Draft",
                "text": "not yet",
                "is_published": false,
                "category_id": travel.id,
                "author": "bob",
                "author_id": bob.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/api/profiles/alice");

    let ids = h.post_ids_of(alice.id).await;
    assert_eq!(ids.len(), 1);
    assert!(h.post_ids_of(bob.id).await.is_empty());
    let post_id = ids[0];

    let response = h.send("GET", "/api/profiles/alice", Some("bob"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!item_ids(&response_json(response).await).contains(&post_id));

    let response = h.send("GET", "/api/profiles/alice", Some("alice"), None).await;
    assert!(item_ids(&response_json(response).await).contains(&post_id));

    let uri = format!("/api/posts/{post_id}");
    let response = h.send("DELETE", &uri, Some("bob"), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), uri);
    assert_eq!(h.send("GET", &uri, Some("alice"), None).await.status(), StatusCode::OK);

    let response = h.send("DELETE", &uri, Some("admin"), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/api/profiles/alice");
    assert_eq!(h.send("GET", &uri, Some("alice"), None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_writes_go_to_login() {
    let h = harness();
    let travel = h.store.add_category("Travel", "travel", true).await;
    let response = h
        .send(
            "POST",
            "/api/posts",
            None,
            Some(json!({ "title": "t", "text": "x", "category_id": travel.id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/api/login?next=%2Fapi%2Fposts");

    // unknown names count as anonymous
    let response = h.send("DELETE", "/api/posts/1", Some("ghost"), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/api/login?next="));

    let response = h.send("GET", "/api/login", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stranger_comment_edit_is_not_found() {
    let h = harness();
    h.store.add_user("alice", false).await;
    h.store.add_user("bob", false).await;
    let travel = h.store.add_category("Travel", "travel", true).await;

    let response = h
        .send(
            "POST",
            "/api/posts",
            Some("alice"),
            Some(json!({ "title": "Trip", "text": "north", "category_id": travel.id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let feed = response_json(h.send("GET", "/api/posts", None, None).await).await;
    let post_id = item_ids(&feed)[0];

    let comments_uri = format!("/api/posts/{post_id}/comments");
    let response = h
        .send("POST", &comments_uri, Some("alice"), Some(json!({ "text": "first!" })))
        .await;
    assert_eq!(location(&response), format!("/api/posts/{post_id}"));

    let detail = response_json(h.send("GET", &format!("/api/posts/{post_id}"), None, None).await).await;
    let comment_id = detail["comments"][0]["id"].as_i64().unwrap();
    assert_eq!(detail["post"]["comment_count"], 1);

    let comment_uri = format!("{comments_uri}/{comment_id}");
    let response = h
        .send("PUT", &comment_uri, Some("bob"), Some(json!({ "text": "mine now" })))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stored = h.store.comment_by_id(comment_id).await.unwrap().unwrap();
    assert_eq!(stored.text, "first!");

    let response = h.send("DELETE", &comment_uri, Some("bob"), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/api/posts/{post_id}"));
    assert!(h.store.comment_by_id(comment_id).await.unwrap().is_some());
}

#[tokio::test]
async fn category_feed_disappears_when_unpublished() {
    let h = harness();
    h.store.add_user("alice", false).await;
    let travel = h.store.add_category("Travel", "travel", true).await;
    h.send(
        "POST",
        "/api/posts",
        Some("alice"),
        Some(json!({
            "title": "Trip",
            "text": "north",
            "category_id": travel.id,
            "pub_date": Utc::now() - Duration::hours(1),
        })),
    )
    .await;

    let response = h.send("GET", "/api/categories/travel", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let feed = response_json(response).await;
    assert_eq!(feed["subject"]["kind"], "category");
    assert_eq!(item_ids(&feed).len(), 1);

    h.store.set_category_published(travel.id, false).await;
    for user in [None, Some("alice")] {
        let response = h.send("GET", "/api/categories/travel", user, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    let feed = response_json(h.send("GET", "/api/posts", None, None).await).await;
    assert!(item_ids(&feed).is_empty());

    let response = h.send("GET", "/api/categories/nowhere", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn out_of_range_pages_clamp() {
    let h = harness();
    let alice = h.store.add_user("alice", false).await;
    let travel = h.store.add_category("Travel", "travel", true).await;
    for i in 0..12 {
        h.send(
            "POST",
            "/api/posts",
            Some("alice"),
            Some(json!({
                "title": format!("post {i}"),
                "text": "x",
                "category_id": travel.id,
                "pub_date": Utc::now() - Duration::minutes(i),
            })),
        )
        .await;
    }
    assert_eq!(h.post_ids_of(alice.id).await.len(), 12);

    let feed = response_json(h.send("GET", "/api/posts?page=99", None, None).await).await;
    assert_eq!(feed["page"]["number"], 2);
    assert_eq!(item_ids(&feed).len(), 2);

    let feed = response_json(h.send("GET", "/api/posts?page=nope", None, None).await).await;
    assert_eq!(feed["page"]["number"], 1);
    assert_eq!(feed["page"]["num_pages"], 2);
    assert_eq!(item_ids(&feed).len(), 10);
}

#[tokio::test]
async fn invalid_forms_are_rejected() {
    let h = harness();
    h.store.add_user("alice", false).await;
    h.store.add_user("bob", false).await;
    let travel = h.store.add_category("Travel", "travel", true).await;

    let response = h
        .send(
            "POST",
            "/api/posts",
            Some("alice"),
            Some(json!({ "title": "", "text": "x", "category_id": travel.id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert!(body["fields"]["title"].is_array());

    let response = h
        .send(
            "PUT",
            "/api/profile",
            Some("alice"),
            Some(json!({ "username": "bob", "email": "alice@example.com" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn profile_edit_redirects_to_renamed_profile() {
    let h = harness();
    let alice = h.store.add_user("alice", false).await;

    let response = h
        .send(
            "PUT",
            "/api/profile",
            Some("alice"),
            Some(json!({
                "username": "alicia",
                "first_name": "Alice",
                "last_name": "Liddell",
                "email": "alice@example.com",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/api/profiles/alicia");

    let stored = h.store.user_by_id(alice.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "alicia");
    assert_eq!(stored.first_name, "Alice");

    let response = h.send("GET", "/api/profiles/alice", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unusable_usernames_are_rejected() {
    let h = harness();
    let alice = h.store.add_user("alice", false).await;

    for username in ["   ", "a/b?page=2", "a b"] {
        let response = h
            .send(
                "PUT",
                "/api/profile",
                Some("alice"),
                Some(json!({ "username": username, "email": "alice@example.com" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{username:?} accepted");
        let body = response_json(response).await;
        assert!(body["fields"]["username"].is_array());
    }
    let stored = h.store.user_by_id(alice.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "alice");

    // surrounding whitespace is dropped, not rejected
    let response = h
        .send(
            "PUT",
            "/api/profile",
            Some("alice"),
            Some(json!({ "username": "  a.b@c+d-e_f  ", "email": "alice@example.com" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/api/profiles/a.b%40c%2Bd-e_f");
    let response = h.send("GET", location(&response).to_string().as_str(), None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stranger_with_invalid_body_gets_the_refusal() {
    let h = harness();
    let alice = h.store.add_user("alice", false).await;
    h.store.add_user("bob", false).await;
    let travel = h.store.add_category("Travel", "travel", true).await;

    let response = h
        .send(
            "POST",
            "/api/posts",
            Some("alice"),
            Some(json!({ "title": "Trip", "text": "north", "category_id": travel.id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let post_id = h.post_ids_of(alice.id).await[0];

    let response = h
        .send(
            "POST",
            &format!("/api/posts/{post_id}/comments"),
            Some("alice"),
            Some(json!({ "text": "mine" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let comment_id = h.store.comments_for_post(post_id).await.unwrap()[0].id;

    let response = h
        .send(
            "PUT",
            &format!("/api/posts/{post_id}"),
            Some("bob"),
            Some(json!({ "title": "", "text": "x", "category_id": travel.id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/api/posts/{post_id}"));

    let response = h
        .send(
            "PUT",
            &format!("/api/posts/{post_id}/comments/{comment_id}"),
            Some("bob"),
            Some(json!({ "text": "" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // the author still gets the form errors
    let response = h
        .send(
            "PUT",
            &format!("/api/posts/{post_id}/comments/{comment_id}"),
            Some("alice"),
            Some(json!({ "text": "" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let post = h.store.post_by_id(post_id).await.unwrap().unwrap();
    assert_eq!(post.title, "Trip");
    let comment = h.store.comment_by_id(comment_id).await.unwrap().unwrap();
    assert_eq!(comment.text, "mine");
}

#[tokio::test]
async fn post_detail_shows_location() {
    let h = harness();
    let alice = h.store.add_user("alice", false).await;
    let travel = h.store.add_category("Travel", "travel", true).await;
    let moscow = h.store.add_location("Moscow").await;

    let response = h
        .send(
            "POST",
            "/api/posts",
            Some("alice"),
            Some(json!({
                "title": "Red Square",
                "text": "cold",
                "category_id": travel.id,
                "location_id": moscow.id,
                "pub_date": (Utc::now() - Duration::minutes(5)).to_rfc3339(),
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let post_id = h.post_ids_of(alice.id).await[0];

    let response = h.send("GET", &format!("/api/posts/{post_id}"), None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = response_json(response).await;
    assert_eq!(detail["post"]["location_name"], "Moscow");
    assert_eq!(detail["post"]["location_id"], moscow.id);
}
