//! Invite lifecycle tests over the HTTP surface

use uuid::Uuid;

use crate::common::factories::{seed_profile, seed_user};
use crate::common::TestApp;

async fn admin_token(app: &TestApp) -> String {
    let admin_id = Uuid::new_v4();
    let token = app.authenticated_user(admin_id, "admin@example.com").await;
    let profile = seed_profile(&app.state.db, "admin", &["admin:*:*"]).await;
    seed_user(&app.state.db, admin_id, "admin@example.com", Some(&profile)).await;
    token
}

#[tokio::test]
async fn admin_creates_and_lists_invites() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    seed_profile(&app.state.db, "sales_user", &["sales:proposals:read"]).await;

    let response = app
        .post_json(
            "/api/v1/invites",
            Some(&token),
            serde_json::json!({"email": "new@example.com", "profile_name": "sales_user"}),
        )
        .await;
    assert_eq!(response.status, 201);
    let body = response.json();
    assert_eq!(body["invite"]["email"], "new@example.com");
    assert_eq!(body["invite"]["status"], "pending");
    assert_eq!(body["email_sent"], false);
    assert!(body["token"].as_str().unwrap().len() >= 43);

    let response = app.get("/api/v1/invites", Some(&token)).await;
    assert_eq!(response.status, 200);
    let list = response.json();
    assert_eq!(list.as_array().unwrap().len(), 1);
    // Listings never expose the token value
    assert!(list[0].get("token").is_none());
}

#[tokio::test]
async fn non_admin_cannot_create_invites() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let token = app.authenticated_user(user_id, "sales@example.com").await;
    let profile = seed_profile(&app.state.db, "sales_user", &["sales:*:*"]).await;
    seed_user(&app.state.db, user_id, "sales@example.com", Some(&profile)).await;

    let response = app
        .post_json(
            "/api/v1/invites",
            Some(&token),
            serde_json::json!({"email": "new@example.com", "profile_name": "sales_user"}),
        )
        .await;
    assert_eq!(response.status, 403);
    assert_eq!(response.json()["code"], "FORBIDDEN");
}

#[tokio::test]
async fn second_pending_invite_for_same_email_conflicts() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    seed_profile(&app.state.db, "sales_user", &[]).await;

    let payload =
        serde_json::json!({"email": "new@example.com", "profile_name": "sales_user"});
    let response = app.post_json("/api/v1/invites", Some(&token), payload.clone()).await;
    assert_eq!(response.status, 201);

    let response = app.post_json("/api/v1/invites", Some(&token), payload).await;
    assert_eq!(response.status, 409);
    assert_eq!(response.json()["code"], "INVITE_CONFLICT");
}

#[tokio::test]
async fn unknown_profile_is_rejected() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    let response = app
        .post_json(
            "/api/v1/invites",
            Some(&token),
            serde_json::json!({"email": "new@example.com", "profile_name": "ghost"}),
        )
        .await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn ttl_outside_bounds_is_rejected() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    seed_profile(&app.state.db, "sales_user", &[]).await;

    let response = app
        .post_json(
            "/api/v1/invites",
            Some(&token),
            serde_json::json!({
                "email": "new@example.com",
                "profile_name": "sales_user",
                "ttl_days": 45,
            }),
        )
        .await;
    assert_eq!(response.status, 422);
}

#[tokio::test]
async fn validation_failures_share_one_generic_answer() {
    let app = TestApp::new().await;
    let admin = admin_token(&app).await;
    seed_profile(&app.state.db, "sales_user", &[]).await;

    let created = app
        .post_json(
            "/api/v1/invites",
            Some(&admin),
            serde_json::json!({"email": "new@example.com", "profile_name": "sales_user"}),
        )
        .await
        .json();
    let token_value = created["token"].as_str().unwrap().to_string();
    let invite_id = created["invite"]["id"].as_str().unwrap().to_string();

    // Valid token + matching email validates
    let ok = app
        .post_json(
            "/api/v1/invites/validate",
            None,
            serde_json::json!({"token": token_value, "email": "new@example.com"}),
        )
        .await;
    assert_eq!(ok.status, 200);
    assert_eq!(ok.json()["profile_name"], "sales_user");

    // Unknown token and wrong email fail identically
    let unknown = app
        .post_json(
            "/api/v1/invites/validate",
            None,
            serde_json::json!({"token": "nope", "email": "new@example.com"}),
        )
        .await;
    let wrong_email = app
        .post_json(
            "/api/v1/invites/validate",
            None,
            serde_json::json!({"token": token_value, "email": "other@example.com"}),
        )
        .await;
    assert_eq!(unknown.status, 400);
    assert_eq!(wrong_email.status, 400);
    assert_eq!(unknown.json()["message"], wrong_email.json()["message"]);

    // Revoked token: same generic answer again
    let response = app
        .delete(&format!("/api/v1/invites/{}", invite_id), Some(&admin))
        .await;
    assert_eq!(response.status, 204);
    let revoked = app
        .post_json(
            "/api/v1/invites/validate",
            None,
            serde_json::json!({"token": token_value, "email": "new@example.com"}),
        )
        .await;
    assert_eq!(revoked.status, 400);
    assert_eq!(revoked.json()["message"], unknown.json()["message"]);
}

#[tokio::test]
async fn consume_onboards_the_user_and_is_idempotent() {
    let app = TestApp::new().await;
    let admin = admin_token(&app).await;
    seed_profile(&app.state.db, "sales_user", &["sales:proposals:read"]).await;

    let created = app
        .post_json(
            "/api/v1/invites",
            Some(&admin),
            serde_json::json!({"email": "new@example.com", "profile_name": "sales_user"}),
        )
        .await
        .json();
    let token_value = created["token"].as_str().unwrap().to_string();

    // The invitee exists at the identity provider but not as a business user
    let invitee_id = Uuid::new_v4();
    let invitee_token = app.authenticated_user(invitee_id, "new@example.com").await;

    let payload = serde_json::json!({
        "token": token_value,
        "email": "new@example.com",
        "name": "New Person",
    });
    let response = app
        .post_json("/api/v1/invites/consume", Some(&invitee_token), payload.clone())
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.json()["profile_name"], "sales_user");

    // The new user's session now carries the invited profile
    let session = app.get("/api/v1/session", Some(&invitee_token)).await.json();
    assert_eq!(session["authenticated"], true);
    assert_eq!(session["profile"], "sales_user");

    // Consuming again succeeds without side effects
    let response = app
        .post_json("/api/v1/invites/consume", Some(&invitee_token), payload)
        .await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn consumed_invite_frees_the_email_for_a_new_one() {
    let app = TestApp::new().await;
    let admin = admin_token(&app).await;
    seed_profile(&app.state.db, "sales_user", &[]).await;

    let payload =
        serde_json::json!({"email": "new@example.com", "profile_name": "sales_user"});
    let created = app
        .post_json("/api/v1/invites", Some(&admin), payload.clone())
        .await
        .json();

    let invitee_id = Uuid::new_v4();
    let invitee_token = app.authenticated_user(invitee_id, "new@example.com").await;
    app.post_json(
        "/api/v1/invites/consume",
        Some(&invitee_token),
        serde_json::json!({
            "token": created["token"],
            "email": "new@example.com",
            "name": "New Person",
        }),
    )
    .await;

    let response = app.post_json("/api/v1/invites", Some(&admin), payload).await;
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn listing_defaults_to_pending_only() {
    let app = TestApp::new().await;
    let admin = admin_token(&app).await;
    seed_profile(&app.state.db, "sales_user", &[]).await;

    let first = app
        .post_json(
            "/api/v1/invites",
            Some(&admin),
            serde_json::json!({"email": "one@example.com", "profile_name": "sales_user"}),
        )
        .await
        .json();
    app.post_json(
        "/api/v1/invites",
        Some(&admin),
        serde_json::json!({"email": "two@example.com", "profile_name": "sales_user"}),
    )
    .await;

    app.delete(
        &format!("/api/v1/invites/{}", first["invite"]["id"].as_str().unwrap()),
        Some(&admin),
    )
    .await;

    let pending = app.get("/api/v1/invites", Some(&admin)).await.json();
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let all = app
        .get("/api/v1/invites?include_used=true", Some(&admin))
        .await
        .json();
    assert_eq!(all.as_array().unwrap().len(), 2);
}
