//! Like, vote, comment and follow endpoints.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use domains::PostLocation;
use serde_json::json;

async fn seeded_post(app: &TestApp) -> String {
    app.create_board("olivia", "Tech").await;
    app.create_section("olivia", "Tech", "General").await;
    app.create_post("olivia", "Tech", "General", "hello").await
}

fn post_ref(filename: &str) -> serde_json::Value {
    json!({ "board": "Tech", "section": "General", "filename": filename })
}

#[tokio::test]
async fn like_is_a_toggle_with_count() {
    let app = TestApp::spawn().await;
    let filename = seeded_post(&app).await;

    let (status, body) = app.post("/api/post/like", post_ref(&filename), Some("ben")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    assert_eq!(body["count"], 1);

    let (_, body) = app.post("/api/post/like", post_ref(&filename), Some("ben")).await;
    assert_eq!(body["liked"], false);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn unliking_from_an_existing_set_reports_the_remainder() {
    let app = TestApp::spawn().await;
    let filename = seeded_post(&app).await;
    app.content
        .update_post(
            &PostLocation::new("Tech", "General", filename.clone()),
            Box::new(|post| {
                post.likes = vec!["x".into(), "y".into()];
                Ok(())
            }),
        )
        .await
        .unwrap();

    let (status, body) = app.post("/api/post/like", post_ref(&filename), Some("x")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], false);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn votes_are_single_choice_per_user() {
    let app = TestApp::spawn().await;
    let filename = seeded_post(&app).await;
    let mut vote = post_ref(&filename);
    vote["option"] = json!("yes");

    let (status, body) = app.post("/api/post/vote", vote.clone(), Some("ben")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votes"]["yes"], json!(["ben"]));

    // Second vote, different option, still refused.
    vote["option"] = json!("no");
    let (status, body) = app.post("/api/post/vote", vote, Some("ben")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn comments_append_in_order() {
    let app = TestApp::spawn().await;
    let filename = seeded_post(&app).await;
    let mut comment = post_ref(&filename);
    comment["content"] = json!("first!");

    let (status, _) = app.post("/api/comment/add", comment, Some("ben")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/posts?board=Tech&section=General", None).await;
    let comments = body.as_array().unwrap()[0]["comments"].as_array().unwrap().clone();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["author"], "ben");
    assert_eq!(comments[0]["content"], "first!");
    assert!(comments[0]["time"].is_i64());
}

#[tokio::test]
async fn social_endpoints_require_a_session() {
    let app = TestApp::spawn().await;
    let filename = seeded_post(&app).await;
    let (status, _) = app.post("/api/post/like", post_ref(&filename), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn follow_toggles_and_reads_back() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post("/api/user/follow", json!({ "type": "board", "target": "Tech" }), Some("ben"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFollowing"], true);

    let (_, body) = app
        .post(
            "/api/user/follow",
            json!({ "type": "section", "target": "Tech/General" }),
            Some("ben"),
        )
        .await;
    assert_eq!(body["isFollowing"], true);

    let (_, body) = app.get("/api/user/follows", Some("ben")).await;
    assert_eq!(body["boards"], json!(["Tech"]));
    assert_eq!(body["sections"], json!(["Tech/General"]));

    let (_, body) = app
        .post("/api/user/follow", json!({ "type": "board", "target": "Tech" }), Some("ben"))
        .await;
    assert_eq!(body["isFollowing"], false);

    // Anonymous readers get empty lists, not an error.
    let (status, body) = app.get("/api/user/follows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["boards"], json!([]));
}

#[tokio::test]
async fn settings_round_trip_through_the_user_document() {
    let app = TestApp::spawn().await;
    let (status, _) = app
        .post("/api/user/settings", json!({ "theme": "dark", "perPage": 20 }), Some("ben"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let doc = app.users.read_user("ben").await.unwrap().unwrap();
    assert_eq!(doc.settings.unwrap()["theme"], "dark");
}
