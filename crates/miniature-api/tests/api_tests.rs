//! API Integration Tests
//!
//! Every test drives the full router over a fresh in-memory store.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use miniature_api::create_router_for_testing;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn authorized(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &Router, username: &str, password: &str) -> String {
    let (status, json) = send(
        app,
        create_json_request(
            "POST",
            "/register",
            Some(json!({"username": username, "name": username, "password": password})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {json}");
    json["token"].as_str().unwrap().to_string()
}

async fn create_post(app: &Router, token: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        authorized(create_json_request("POST", "/post", Some(body)), token),
    )
    .await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let (status, json) = send(&app, create_json_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_register_login_and_current_user() {
    let app = create_router_for_testing();
    register(&app, "admin", "azerty123").await;

    let (status, login) = send(
        &app,
        create_json_request(
            "POST",
            "/login",
            Some(json!({"username": "admin", "password": "azerty123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["token_type"], "Bearer");
    assert_eq!(login["expires_in"], 3600);

    let token = login["token"].as_str().unwrap();
    let (status, me) = send(
        &app,
        authorized(create_json_request("GET", "/users/current", None), token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin");
    assert_eq!(me["display_name"], "admin");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_username() {
    let app = create_router_for_testing();
    register(&app, "Alice", "wonderland").await;

    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/login",
            Some(json!({"username": "alice", "password": "wonderland"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_with_wrong_credentials() {
    let app = create_router_for_testing();
    register(&app, "admin", "azerty123").await;

    for body in [
        json!({"username": "admin", "password": "azerty124"}),
        json!({"username": "nobody", "password": "azerty123"}),
    ] {
        let (status, json) = send(&app, create_json_request("POST", "/login", Some(body))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], true);
        assert_eq!(json["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let app = create_router_for_testing();
    register(&app, "test", "qwerty123").await;

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/register",
            Some(json!({"username": "TEST", "name": "Impostor", "password": "other"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "CONSTRAINT_VIOLATION");

    // The original account still logs in with its own secret
    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/login",
            Some(json!({"username": "test", "password": "qwerty123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_requires_password() {
    let app = create_router_for_testing();

    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/register",
            Some(json!({"username": "ghost", "name": "Ghost", "password": ""})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_register_without_display_name() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/register",
            Some(json!({"username": "x", "password": "y"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    let token = json["token"].as_str().unwrap();

    let (status, me) = send(
        &app,
        authorized(create_json_request("GET", "/users/current", None), token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "x");
    assert_eq!(me["display_name"], "");
}

#[tokio::test]
async fn test_register_with_missing_fields_is_unprocessable() {
    let app = create_router_for_testing();

    for body in [json!({"password": "secret"}), json!({"username": "nopass"})] {
        let (status, json) =
            send(&app, create_json_request("POST", "/register", Some(body))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["code"], "CONSTRAINT_VIOLATION");
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = create_router_for_testing();

    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], true);
    assert_eq!(json["code"], "BAD_REQUEST");
}

// =============================================================================
// Authorization Tests
// =============================================================================

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_router_for_testing();

    let (status, json) = send(&app, create_json_request("GET", "/users/current", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Token missing");
}

#[tokio::test]
async fn test_protected_route_with_forged_token() {
    let app = create_router_for_testing();
    let token = register(&app, "admin", "azerty123").await;
    let (head, last) = token.split_at(token.len() - 1);
    let forged = format!("{head}{}", if last == "x" { "y" } else { "x" });

    let (status, json) = send(
        &app,
        authorized(create_json_request("GET", "/users/current", None), &forged),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["message"], "Forbidden");
}

#[tokio::test]
async fn test_post_creation_requires_token() {
    let app = create_router_for_testing();

    let (status, _) = send(
        &app,
        create_json_request("POST", "/post", Some(json!({"content": "hello"}))),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, newest) = send(&app, create_json_request("GET", "/posts/newest", None)).await;
    assert_eq!(newest, json!([]));
}

// =============================================================================
// Post Tests
// =============================================================================

#[tokio::test]
async fn test_create_post_and_reply() {
    let app = create_router_for_testing();
    let token = register(&app, "alice", "secret").await;

    let (status, root) = create_post(&app, &token, json!({"content": "hello world"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(root["content"], "hello world");
    assert!(root["parent_id"].is_null());

    let root_id = root["id"].as_i64().unwrap();
    let (status, reply) =
        create_post(&app, &token, json!({"content": "first!", "parent": root_id})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["parent_id"], root_id);
    assert_eq!(reply["owner_id"], root["owner_id"]);

    let (status, fetched) = send(
        &app,
        create_json_request("GET", &format!("/post/{root_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, root);

    let (status, replies) = send(
        &app,
        create_json_request("GET", &format!("/post/{root_id}/replies"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replies, json!([reply]));

    let (status, mine) = send(
        &app,
        authorized(create_json_request("GET", "/users/current/posts", None), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_reply_to_missing_parent_is_rejected() {
    let app = create_router_for_testing();
    let token = register(&app, "alice", "secret").await;

    let (status, json) =
        create_post(&app, &token, json!({"content": "orphan", "parent": 4242})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "CONSTRAINT_VIOLATION");
}

#[tokio::test]
async fn test_blank_post_is_rejected() {
    let app = create_router_for_testing();
    let token = register(&app, "alice", "secret").await;

    let (status, _) = create_post(&app, &token, json!({"content": "   "})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_feeds_show_only_top_level_posts() {
    let app = create_router_for_testing();
    let token = register(&app, "alice", "secret").await;

    let (_, quiet) = create_post(&app, &token, json!({"content": "quiet"})).await;
    let (_, popular) = create_post(&app, &token, json!({"content": "popular"})).await;
    for reply in ["one", "two"] {
        let (status, _) = create_post(
            &app,
            &token,
            json!({"content": reply, "parent": popular["id"]}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, trending) = send(&app, create_json_request("GET", "/posts/trending", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trending, json!([popular.clone(), quiet.clone()]));

    let (status, newest) = send(&app, create_json_request("GET", "/posts/newest", None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = newest
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&quiet["id"].as_i64().unwrap()));
    assert!(ids.contains(&popular["id"].as_i64().unwrap()));
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[tokio::test]
async fn test_unknown_resources_are_not_found() {
    let app = create_router_for_testing();

    for uri in ["/post/999", "/post/abc", "/post/999/replies", "/users/999", "/users/xyz"] {
        let (status, json) = send(&app, create_json_request("GET", uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(json["error"], true);
        assert_eq!(json["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_public_user_lookup() {
    let app = create_router_for_testing();
    let token = register(&app, "bob", "builder").await;

    let (_, me) = send(
        &app,
        authorized(create_json_request("GET", "/users/current", None), &token),
    )
    .await;
    let id = me["id"].as_i64().unwrap();

    let (status, user) = send(
        &app,
        create_json_request("GET", &format!("/users/{id}"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "bob");
    assert!(user.get("password_hash").is_none());
}
