use std::sync::Arc;

use uuid::Uuid;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feed_client::{
    FeedClient, FeedClientError, MemoryTokenStore, PostFilter, PostPatch, TokenStore,
};

fn token_pair_json() -> serde_json::Value {
    serde_json::json!({
        "access_token": "access.jwt",
        "refresh_token": "refresh.jwt",
        "token_type": "bearer",
        "expires_in": 1800
    })
}

fn user_json(username: &str) -> serde_json::Value {
    serde_json::json!({
        "id": Uuid::new_v4(),
        "username": username,
        "email": format!("{username}@example.com"),
        "is_active": true,
        "is_superuser": false,
        "created_at": "2026-01-01T00:00:00Z"
    })
}

fn post_json(id: Uuid, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "content": "content",
        "owner": user_json("author"),
        "tags": [],
        "created_at": "2026-02-01T00:00:00Z",
        "updated_at": "2026-02-02T00:00:00Z"
    })
}

fn authorized_client(server: &MockServer) -> FeedClient {
    let store = Arc::new(MemoryTokenStore::new());
    store.set("access.jwt").expect("memory store set must succeed");
    FeedClient::with_store(server.uri(), store)
}

#[tokio::test]
async fn register_sends_json_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/register"))
        .and(body_json(serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "secret123"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(user_json("alice")))
        .expect(1)
        .mount(&server)
        .await;

    let client = FeedClient::new(server.uri());
    let user = client
        .register("alice", "alice@example.com", "secret123")
        .await
        .expect("register must succeed");

    assert_eq!(user.username, "alice");
    // Регистрация токен не выдаёт.
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn login_sends_form_and_stores_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(header(
            "content-type",
            "application/x-www-form-urlencoded",
        ))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=secret123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_pair_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = FeedClient::new(server.uri());
    let pair = client
        .login("alice", "secret123")
        .await
        .expect("login must succeed");

    assert_eq!(pair.token_type, "bearer");
    assert_eq!(client.access_token().as_deref(), Some("access.jwt"));
}

#[tokio::test]
async fn refresh_rotates_stored_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(serde_json::json!({ "refresh_token": "refresh.jwt" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "rotated.jwt",
            "refresh_token": "refresh2.jwt",
            "token_type": "bearer",
            "expires_in": 1800
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    client
        .refresh("refresh.jwt")
        .await
        .expect("refresh must succeed");

    assert_eq!(client.access_token().as_deref(), Some("rotated.jwt"));
}

#[tokio::test]
async fn me_attaches_bearer_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer access.jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("alice")))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let user = client.me().await.expect("me must succeed");
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn me_without_token_maps_401() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "detail": "Not authenticated" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = FeedClient::new(server.uri());
    let result = client.me().await;
    assert!(matches!(result, Err(FeedClientError::Unauthorized)));
}

#[tokio::test]
async fn logout_forgets_token_without_requests() {
    let server = MockServer::start().await;

    let client = authorized_client(&server);
    assert!(client.is_authenticated());

    client.logout().expect("logout must succeed");
    assert!(!client.is_authenticated());

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn get_post_maps_404_to_not_found() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/posts/{id}")))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "detail": "Post not found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let result = client.get_post(id).await;
    assert!(matches!(result, Err(FeedClientError::NotFound)));
}

#[tokio::test]
async fn create_post_sends_tags_and_auth() {
    let server = MockServer::start().await;
    let post_id = Uuid::new_v4();
    let tag_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/v1/posts"))
        .and(header("authorization", "Bearer access.jwt"))
        .and(body_json(serde_json::json!({
            "title": "title",
            "content": "content",
            "tag_ids": [tag_id]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(post_json(post_id, "title")))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let post = client
        .create_post("title", "content", &[tag_id])
        .await
        .expect("create_post must succeed");
    assert_eq!(post.id, post_id);
}

#[tokio::test]
async fn create_post_without_token_short_circuits() {
    let server = MockServer::start().await;

    let client = FeedClient::new(server.uri());
    let result = client.create_post("title", "content", &[]).await;
    assert!(matches!(result, Err(FeedClientError::Unauthorized)));

    // До сервера запрос не дошёл.
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn update_post_serializes_only_changed_fields() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path(format!("/api/v1/posts/{id}")))
        .and(body_json(serde_json::json!({ "title": "renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(post_json(id, "renamed")))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let patch = PostPatch {
        title: Some("renamed".to_string()),
        ..PostPatch::default()
    };
    let post = client
        .update_post(id, &patch)
        .await
        .expect("update_post must succeed");
    assert_eq!(post.title, "renamed");
}

#[tokio::test]
async fn delete_post_accepts_204() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/posts/{id}")))
        .and(header("authorization", "Bearer access.jwt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    client.delete_post(id).await.expect("delete must succeed");
}

#[tokio::test]
async fn forbidden_delete_is_not_unauthorized() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/posts/{id}")))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(serde_json::json!({ "detail": "Not enough permissions" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let result = client.delete_post(id).await;
    assert!(matches!(result, Err(FeedClientError::Forbidden)));
}

#[tokio::test]
async fn list_posts_passes_filters_as_query() {
    let server = MockServer::start().await;
    let owner_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(query_param("limit", "20"))
        .and(query_param("q", "rust"))
        .and(query_param("owner_id", owner_id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let filter = PostFilter {
        limit: Some(20),
        q: Some("rust".to_string()),
        owner_id: Some(owner_id),
        ..PostFilter::default()
    };
    let posts = client
        .list_posts(&filter)
        .await
        .expect("list_posts must succeed");
    assert!(posts.is_empty());
}

#[tokio::test]
async fn resolve_tags_normalizes_before_sending() {
    let server = MockServer::start().await;
    let rust_id = Uuid::new_v4();
    let web_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/v1/tags/resolve"))
        .and(body_json(serde_json::json!({ "names": ["rust", "web"] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ids": [rust_id, web_id] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let names = vec![
        "  Rust ".to_string(),
        "rust".to_string(),
        "Web".to_string(),
        "  ".to_string(),
    ];
    let resolved = client
        .resolve_tags(&names)
        .await
        .expect("resolve_tags must succeed");
    assert_eq!(resolved, vec![rust_id, web_id]);
}

#[tokio::test]
async fn resolve_tags_with_no_names_skips_request() {
    let server = MockServer::start().await;

    let client = authorized_client(&server);
    let resolved = client
        .resolve_tags(&["   ".to_string()])
        .await
        .expect("resolve_tags must succeed");
    assert!(resolved.is_empty());

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn create_tag_conflict_reports_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/tags"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({ "detail": "Tag already exists" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let result = client.create_tag("rust").await;
    match result {
        Err(FeedClientError::InvalidRequest(message)) => {
            assert_eq!(message, "Tag already exists");
        }
        other => panic!("expected InvalidRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn list_users_requires_token_and_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "10"))
        .and(header("authorization", "Bearer access.jwt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([user_json("admin")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let users = client
        .list_users(50, 10)
        .await
        .expect("list_users must succeed");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "admin");
}
