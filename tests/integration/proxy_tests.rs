//! Trusted proxy forwarding tests

use std::collections::HashSet;

use uuid::Uuid;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, ResponseTemplate,
};

use crate::common::factories::{seed_permission_set, seed_profile, seed_user};
use crate::common::{TestApp, test_app::TEST_PROXY_SECRET};

#[tokio::test]
async fn authorized_request_is_forwarded_with_the_envelope() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let token = app.authenticated_user(user_id, "ana@example.com").await;
    let profile = seed_profile(
        &app.state.db,
        "sales_user",
        &["sales:proposals:read", "chat:messages:read"],
    )
    .await;
    seed_user(&app.state.db, user_id, "ana@example.com", Some(&profile)).await;

    Mock::given(method("GET"))
        .and(path("/api/proposals/list"))
        .and(header("x-proxy-secret", TEST_PROXY_SECRET))
        .and(header("x-trusted-user-id", user_id.to_string()))
        .and(header("x-trusted-user-email", "ana@example.com"))
        .and(header("x-trusted-user-profile", "sales_user"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"proposals": []})),
        )
        .mount(&app.studio_server)
        .await;

    let response = app.get("/api/v1/studio/proposals/list", Some(&token)).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.json()["proposals"], serde_json::json!([]));

    // The permissions header decodes to exactly the resolved set
    let requests = app.studio_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let permissions_header = requests[0]
        .headers
        .get("x-trusted-user-permissions")
        .unwrap()
        .to_str()
        .unwrap();
    let sent: HashSet<String> = serde_json::from_str(permissions_header).unwrap();
    let expected: HashSet<String> =
        ["sales:proposals:read", "chat:messages:read"]
            .into_iter()
            .map(String::from)
            .collect();
    assert_eq!(sent, expected);

    // The original bearer token never crosses the trust boundary
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn spoofed_trusted_headers_are_stripped() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let token = app.authenticated_user(user_id, "ana@example.com").await;
    let profile = seed_profile(&app.state.db, "sales_user", &["sales:*:*"]).await;
    seed_user(&app.state.db, user_id, "ana@example.com", Some(&profile)).await;

    Mock::given(method("GET"))
        .and(path("/api/proposals/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&app.studio_server)
        .await;

    // Hand-build a request smuggling trusted headers
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;
    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/studio/proposals/list")
        .header("Authorization", format!("Bearer {}", token))
        .header("X-Trusted-User-Id", Uuid::new_v4().to_string())
        .header("X-Trusted-User-Permissions", "[\"*:*:*\"]")
        .header("X-Proxy-Secret", "attacker-guess")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), 200);

    let requests = app.studio_server.received_requests().await.unwrap();
    let forwarded = &requests[0];
    // The gateway's own values won, not the client's
    assert_eq!(
        forwarded.headers.get("x-proxy-secret").unwrap(),
        TEST_PROXY_SECRET
    );
    assert_eq!(
        forwarded.headers.get("x-trusted-user-id").unwrap(),
        &user_id.to_string()
    );
    let sent: HashSet<String> = serde_json::from_str(
        forwarded
            .headers
            .get("x-trusted-user-permissions")
            .unwrap()
            .to_str()
            .unwrap(),
    )
    .unwrap();
    assert!(!sent.contains("*:*:*"));
}

#[tokio::test]
async fn missing_permission_is_403_then_grant_plus_invalidation_allows() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let token = app.authenticated_user(user_id, "u@example.com").await;
    // sales_user profile without write permission
    let profile = seed_profile(&app.state.db, "sales_user", &["sales:proposals:read"]).await;
    seed_user(&app.state.db, user_id, "u@example.com", Some(&profile)).await;

    Mock::given(method("POST"))
        .and(path("/api/proposals/create"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 1})))
        .mount(&app.studio_server)
        .await;

    // Write requires sales:proposals:write, which the profile lacks
    let response = app
        .post_json(
            "/api/v1/studio/proposals/create",
            Some(&token),
            serde_json::json!({"title": "Q3"}),
        )
        .await;
    assert_eq!(response.status, 403);
    assert_eq!(response.json()["code"], "FORBIDDEN");

    // Grant a permission set carrying the write permission and invalidate
    seed_permission_set(
        &app.state.db,
        user_id,
        "proposal-writers",
        &["sales:proposals:write"],
        None,
    )
    .await;
    app.state.rbac.invalidate(user_id).await;

    // The immediately following request succeeds and carries the permission
    let response = app
        .post_json(
            "/api/v1/studio/proposals/create",
            Some(&token),
            serde_json::json!({"title": "Q3"}),
        )
        .await;
    assert_eq!(response.status, 201);

    let requests = app.studio_server.received_requests().await.unwrap();
    let forwarded = requests.last().unwrap();
    let sent: HashSet<String> = serde_json::from_str(
        forwarded
            .headers
            .get("x-trusted-user-permissions")
            .unwrap()
            .to_str()
            .unwrap(),
    )
    .unwrap();
    assert!(sent.contains("sales:proposals:write"));
}

#[tokio::test]
async fn request_bodies_and_status_codes_relay_unmodified() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let token = app.authenticated_user(user_id, "ana@example.com").await;
    let profile = seed_profile(&app.state.db, "sales_user", &["chat:*:*"]).await;
    seed_user(&app.state.db, user_id, "ana@example.com", Some(&profile)).await;

    Mock::given(method("POST"))
        .and(path("/api/chat/messages"))
        .and(body_json(serde_json::json!({"message": "hello"})))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(serde_json::json!({"error": "too short"})),
        )
        .mount(&app.studio_server)
        .await;

    let response = app
        .post_json(
            "/api/v1/studio/chat/messages",
            Some(&token),
            serde_json::json!({"message": "hello"}),
        )
        .await;
    // Upstream's verdict relays as-is, even when it is an error
    assert_eq!(response.status, 422);
    assert_eq!(response.json()["error"], "too short");
}

#[tokio::test]
async fn event_stream_responses_disable_buffering() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let token = app.authenticated_user(user_id, "ana@example.com").await;
    let profile = seed_profile(&app.state.db, "sales_user", &["chat:*:*"]).await;
    seed_user(&app.state.db, user_id, "ana@example.com", Some(&profile)).await;

    Mock::given(method("GET"))
        .and(path("/api/chat/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {\"delta\":\"hi\"}\n\n".as_bytes(), "text/event-stream"),
        )
        .mount(&app.studio_server)
        .await;

    let response = app.get("/api/v1/studio/chat/stream", Some(&token)).await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.headers.get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(response.headers.get("x-accel-buffering").unwrap(), "no");
    assert_eq!(response.headers.get("cache-control").unwrap(), "no-cache");
    assert!(response.text().contains("data:"));
}

#[tokio::test]
async fn unreachable_studio_is_502_upstream_unavailable() {
    let app = TestApp::with_config(|config| {
        // A port nothing listens on
        config.studio.url = "http://127.0.0.1:9".to_string();
    })
    .await;
    let user_id = Uuid::new_v4();
    let token = app.authenticated_user(user_id, "ana@example.com").await;
    let profile = seed_profile(&app.state.db, "sales_user", &["sales:*:*"]).await;
    seed_user(&app.state.db, user_id, "ana@example.com", Some(&profile)).await;

    let response = app.get("/api/v1/studio/proposals/list", Some(&token)).await;
    assert_eq!(response.status, 502);
    assert_eq!(response.json()["code"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn super_admin_wildcard_opens_every_mount() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let token = app.authenticated_user(user_id, "root@example.com").await;
    let profile = seed_profile(&app.state.db, "admin", &["*:*:*"]).await;
    seed_user(&app.state.db, user_id, "root@example.com", Some(&profile)).await;

    for mount_path in [
        "/api/v1/studio/chat/history",
        "/api/v1/studio/proposals/list",
        "/api/v1/studio/mockups/list",
    ] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&app.studio_server)
            .await;
        let response = app.get(mount_path, Some(&token)).await;
        assert_eq!(response.status, 200, "expected 200 for {}", mount_path);
    }
}
