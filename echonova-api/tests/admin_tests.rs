//! Integration tests for administration endpoints

mod common;

use axum::http::StatusCode;
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let app = spawn_app().await;
    let token = app.signup("ann", "ann@example.com").await;

    for (method, uri) in [
        ("GET", "/admin/songs"),
        ("GET", "/admin/users"),
        ("POST", "/admin/recommendations/send-now"),
    ] {
        let (status, body) = app.request(method, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    let (status, _) = app.request("GET", "/admin/songs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_song_lifecycle() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, created) = app
        .request(
            "POST",
            "/admin/songs",
            Some(&admin),
            Some(json!({
                "title": "Blue Sky",
                "artist": "Ann",
                "genre": ["pop"],
                "audioFeature": {"energy": 0.8},
                "s3Url": "https://cdn.example/blue.mp3"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["audioFeature"]["energy"], 0.8);
    assert_eq!(created["audioFeature"]["valence"], 0.0);
    let track_id = created["trackId"].as_str().unwrap().to_string();

    let (status, page) = app.request("GET", "/admin/songs", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, updated) = app
        .request(
            "PUT",
            &format!("/admin/songs/{}", track_id),
            Some(&admin),
            Some(json!({"title": "Blue Skies", "coverUrl": "https://cdn.example/blue.jpg"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Blue Skies");
    assert_eq!(updated["artist"], "Ann");
    assert_eq!(updated["coverUrl"], "https://cdn.example/blue.jpg");

    let (_, public) = app
        .request("GET", &format!("/songs/{}", track_id), None, None)
        .await;
    assert_eq!(public["title"], "Blue Skies");

    let (status, _) = app
        .request("DELETE", &format!("/admin/songs/{}", track_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request("DELETE", &format!("/admin/songs/{}", track_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("PUT", &format!("/admin/songs/{}", track_id), Some(&admin), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_create_song_requires_s3_url() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .request("POST", "/admin/songs", Some(&admin), Some(json!({"title": "No file"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "S3Url required for this endpoint.");
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.signup("ann", "ann@example.com").await;

    let (status, created) = app
        .request(
            "POST",
            "/admin/users",
            Some(&admin),
            Some(json!({"username": "bob", "email": "bob@example.com", "password": "pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["email"], "bob@example.com");
    assert!(created.get("passwordHash").is_none());

    let (status, _) = app
        .request(
            "POST",
            "/admin/users",
            Some(&admin),
            Some(json!({"username": "again", "email": "ann@example.com", "password": "pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, list) = app.request("GET", "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (_, page) = app
        .request("GET", "/admin/users?page=1&pageSize=1", Some(&admin), None)
        .await;
    assert_eq!(page.as_array().unwrap().len(), 1);

    // Created user can log in
    let (status, _) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "bob@example.com", "password": "pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_send_recommendations_now_mails_subscribers() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    for (title, genre) in [("One", "rock"), ("Two", "Rock"), ("Three", "rock"), ("Four", "jazz")] {
        app.add_song(title, "Band", &[genre]).await;
    }

    let subscribed = app.signup("ann", "ann@example.com").await;
    app.request(
        "PATCH",
        "/users/me",
        Some(&subscribed),
        Some(json!({"preference": ["ROCK"], "receiveRecommendationEmails": true})),
    )
    .await;
    app.signup("bob", "bob@example.com").await;

    let (status, body) = app
        .request("POST", "/admin/recommendations/send-now", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], 1);

    let mails = app.mailer.with_subject("Your music recommendations");
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, "ann@example.com");
    assert_eq!(mails[0].html_body.matches("<li>").count(), 3);
    assert!(!mails[0].html_body.contains("Four"));
}
