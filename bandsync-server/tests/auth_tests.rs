//! Access guard and login/verify tests

mod helpers;

use axum::http::StatusCode;
use chrono::Utc;
use helpers::*;
use serde_json::json;

#[tokio::test]
async fn test_get_requests_need_no_token() {
    let app = spawn_app().await;
    let song_id = app.create_song("Open Song").await;

    let (status, body) = app.send(get("/songs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app.send(get(&format!("/songs/{}", song_id))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(get(&format!("/recordings/song/{}", song_id))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_mutations_without_token_rejected() {
    let app = spawn_app().await;
    let song_id = app.create_song("Locked").await;

    let (status, body) = app
        .send(json_request("POST", "/songs", None, json!({ "title": "x", "bandId": "default" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = app
        .send(json_request("PUT", &format!("/songs/{}", song_id), None, json!({ "title": "y" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(authed("DELETE", &format!("/songs/{}", song_id), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.count("songs").await, 1);
}

#[tokio::test]
async fn test_login_token_accepted_by_verify() {
    let app = spawn_app().await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "username": ADMIN_USER, "password": ADMIN_PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().expect("access_token").to_string();

    let (status, body) = app.send(authed("GET", "/auth/verify", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": true }));
}

#[tokio::test]
async fn test_bad_login_rejected() {
    let app = spawn_app().await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "username": ADMIN_USER, "password": "wrong" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_login_with_missing_fields_is_validation_error() {
    let app = spawn_app().await;

    let (status, body) = app
        .send(json_request("POST", "/auth/login", None, json!({ "username": ADMIN_USER })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_verify_requires_token_even_for_get() {
    let app = spawn_app().await;

    let (status, body) = app.send(get("/auth/verify")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let app = spawn_app().await;
    let forged = token_signed_with("some-other-secret-0123456789abcdef", Utc::now().timestamp());

    let (status, body) = app.send(authed("GET", "/auth/verify", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = app
        .send(json_request("POST", "/songs", Some(&forged), json!({ "title": "x", "bandId": "b" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = spawn_app().await;
    let two_hours_ago = Utc::now().timestamp() - 2 * 60 * 60;
    let expired = token_signed_with(SIGNING_SECRET, two_hours_ago);

    let (status, body) = app.send(authed("GET", "/auth/verify", Some(&expired))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_comments_open_by_default() {
    let app = spawn_app_with(FakeRelay::succeeding(30.0), false).await;
    let song_id = app.create_song("Feedback").await;
    let (_, recording) = app.upload(&song_id, &[]).await;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/comments",
            None,
            json!({
                "recordingId": recording["id"],
                "text": "great groove",
                "authorName": "Fan",
                "timestampSeconds": 3.5
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_comments_guarded_when_configured() {
    let app = spawn_app_with(FakeRelay::succeeding(30.0), true).await;
    let song_id = app.create_song("Private").await;
    let (_, recording) = app.upload(&song_id, &[]).await;

    let body = json!({
        "recordingId": recording["id"],
        "text": "tempo drifts",
        "authorName": "Drummer",
        "timestampSeconds": 12.0
    });

    let (status, _) = app.send(json_request("POST", "/comments", None, body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(json_request("POST", "/comments", Some(&admin_token()), body))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let (status, body) = app.send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");
}
