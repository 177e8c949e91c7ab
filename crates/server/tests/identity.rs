mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn register_then_login_issues_token_and_audit_entry() {
    let app = TestApp::new().await;
    let user_id = app.register("alice").await;

    let (status, body) = app
        .post(
            "/login",
            json!({ "email": "alice@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user_id"], user_id.as_str());
    let token = body["auth_token"].as_str().unwrap();
    assert!(!token.is_empty());

    let logins = app.state.audit.logins_for(&user_id).await.unwrap();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].username, "alice");
    assert_eq!(logins[0].email, "alice@example.com");
    assert_eq!(logins[0].auth_token, token);
}

#[tokio::test]
async fn duplicate_email_is_rejected_and_first_account_survives() {
    let app = TestApp::new().await;
    let user_id = app.register("alice").await;

    let (status, body) = app
        .post(
            "/register",
            json!({ "username": "impostor", "email": "alice@example.com", "password": "other" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email_exists");

    // The original credentials still log in to the original account.
    let (status, body) = app
        .post(
            "/login",
            json!({ "email": "alice@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.as_str());
}

#[tokio::test]
async fn register_requires_every_field() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/register", json!({ "username": "bob", "email": "bob@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_fields");

    let (status, body) = app
        .post(
            "/register",
            json!({ "username": "  ", "email": "bob@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_fields");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/register")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new().await;
    let user_id = app.register("alice").await;

    let (status, wrong_pw) = app
        .post(
            "/login",
            json!({ "email": "alice@example.com", "password": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = app
        .post(
            "/login",
            json!({ "email": "ghost@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw, unknown);
    assert_eq!(unknown["error"], "invalid_credentials");

    let (status, body) = app.post("/login", json!({ "email": "alice@example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_fields");

    assert!(app.state.audit.logins_for(&user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn profile_starts_empty_and_hides_password() {
    let app = TestApp::new().await;
    let user_id = app.register("alice").await;

    let (status, body) = app.get(&format!("/profile/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["bio"], "");
    assert_eq!(body["avatar_url"], "");
    assert_eq!(body["library"], json!([]));
    assert_eq!(body["wishlist"], json!([]));
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/profile/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user_not_found");

    let (status, body) = app
        .post("/profile/nobody/update", json!({ "bio": "hi" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() {
    let app = TestApp::new().await;
    let user_id = app.register("alice").await;

    let (status, body) = app
        .post(
            &format!("/profile/{user_id}/update"),
            json!({ "bio": "Speedruns on weekends" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated");

    let (_, profile) = app.get(&format!("/profile/{user_id}")).await;
    assert_eq!(profile["bio"], "Speedruns on weekends");
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["email"], "alice@example.com");

    app.post(
        &format!("/profile/{user_id}/update"),
        json!({ "username": "alice_r", "avatar_url": "https://img.example.com/a.png" }),
    )
    .await;

    let (_, profile) = app.get(&format!("/profile/{user_id}")).await;
    assert_eq!(profile["username"], "alice_r");
    assert_eq!(profile["avatar_url"], "https://img.example.com/a.png");
    assert_eq!(profile["bio"], "Speedruns on weekends");
}

#[tokio::test]
async fn update_accepts_camel_case_avatar_url() {
    let app = TestApp::new().await;
    let user_id = app.register("alice").await;

    let (status, _) = app
        .post(
            &format!("/profile/{user_id}/update"),
            json!({ "avatarUrl": "https://img.example.com/camel.png" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, profile) = app.get(&format!("/profile/{user_id}")).await;
    assert_eq!(profile["avatar_url"], "https://img.example.com/camel.png");
}

#[tokio::test]
async fn session_cannot_edit_someone_elses_profile() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;
    let bob_token = app.login("bob").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/profile/{alice}/update"),
            Some(json!({ "email": "bob-owns-this@example.com", "username": "pwned" })),
            Some(&bob_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (_, profile) = app.get(&format!("/profile/{alice}")).await;
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["email"], "alice@example.com");

    let alice_token = app.login("alice").await;
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/profile/{alice}/update"),
            Some(json!({ "bio": "mine" })),
            Some(&alice_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn oversized_session_lifetime_fails_login_cleanly() {
    let app = TestApp::with_env(&[("SESSION_TTL_HOURS", "9000000000000000")]).await;
    app.register("alice").await;

    let (status, body) = app
        .post(
            "/login",
            json!({ "email": "alice@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "server_error");

    // The server keeps answering afterwards.
    let (status, _) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn update_cannot_take_another_users_email() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;

    let (status, body) = app
        .post(
            &format!("/profile/{alice}/update"),
            json!({ "email": "bob@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email_exists");

    let (_, profile) = app.get(&format!("/profile/{alice}")).await;
    assert_eq!(profile["email"], "alice@example.com");
}

#[tokio::test]
async fn invalid_bearer_token_is_unauthorized() {
    let app = TestApp::new().await;
    let user_id = app.register("alice").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/threads",
            Some(json!({ "title": "t", "content": "c", "user_id": user_id })),
            Some("garbage"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn health_and_unknown_routes_answer_json() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, body) = app.get("/nowhere/at/all").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
