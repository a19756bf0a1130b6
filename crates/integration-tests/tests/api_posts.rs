//! Post lifecycle over the wire: publish, listings, edit, move, pin.

mod common;

use axum::http::StatusCode;
use common::{TestApp, SUPER_ADMIN};
use serde_json::json;

async fn seeded(app: &TestApp) {
    app.create_board("olivia", "Tech").await;
    app.create_section("olivia", "Tech", "General").await;
}

#[tokio::test]
async fn publishing_returns_the_filename_and_lists_back() {
    let app = TestApp::spawn().await;
    seeded(&app).await;

    let filename = app.create_post("ben", "Tech", "General", "hello").await;
    assert!(filename.ends_with(".json"));

    let (status, body) = app.get("/api/posts?board=Tech&section=General", None).await;
    assert_eq!(status, StatusCode::OK);
    let posts = body.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["filename"], filename.as_str());
    assert_eq!(posts[0]["title"], "hello");
    assert_eq!(posts[0]["author"], "ben");
    assert_eq!(posts[0]["likes"], json!([]));
    assert_eq!(posts[0]["shares"], 0);

    let (_, body) = app.get("/api/all-posts", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn listing_a_missing_section_is_empty_not_an_error() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/api/posts?board=Ghost&section=Nope", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn muted_sections_refuse_posts_and_write_nothing() {
    let app = TestApp::spawn().await;
    seeded(&app).await;
    app.post(
        "/api/manage/update",
        json!({ "board": "Tech", "section": "General", "action": "setMuted", "data": { "muted": true } }),
        Some("olivia"),
    )
    .await;

    let before = std::fs::read_dir(app.data_dir().join("Tech").join("General"))
        .unwrap()
        .count();
    let (status, body) = app
        .post(
            "/api/post",
            json!({ "board": "Tech", "section": "General", "title": "t", "content": "c" }),
            Some("ben"),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let after = std::fs::read_dir(app.data_dir().join("Tech").join("General"))
        .unwrap()
        .count();
    assert_eq!(before, after);
}

#[tokio::test]
async fn blacklisted_users_get_403() {
    let app = TestApp::spawn().await;
    seeded(&app).await;
    app.post(
        "/api/manage/update",
        json!({ "board": "Tech", "action": "updateBlacklist", "data": { "type": "add", "user": "troll" } }),
        Some("olivia"),
    )
    .await;

    let (status, _) = app
        .post(
            "/api/post",
            json!({ "board": "Tech", "section": "General", "title": "t", "content": "c" }),
            Some("troll"),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn posting_into_a_missing_section_is_400() {
    let app = TestApp::spawn().await;
    app.create_board("olivia", "Tech").await;
    let (status, _) = app
        .post(
            "/api/post",
            json!({ "board": "Tech", "section": "Nowhere", "title": "t", "content": "c" }),
            Some("ben"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn editing_is_author_or_moderator_only() {
    let app = TestApp::spawn().await;
    seeded(&app).await;
    let filename = app.create_post("ben", "Tech", "General", "draft").await;

    let (status, _) = app
        .post(
            "/api/post/edit",
            json!({
                "board": "Tech", "section": "General", "filename": filename,
                "title": "hijacked", "content": "x"
            }),
            Some("zoe"),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/post/edit",
            json!({
                "board": "Tech", "section": "General", "filename": filename,
                "title": "final", "content": "polished"
            }),
            Some("ben"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/posts?board=Tech&section=General", None).await;
    let post = &body.as_array().unwrap()[0];
    assert_eq!(post["title"], "final");
    let history = post["history"].as_array().unwrap();
    let edit = history.last().unwrap();
    assert_eq!(edit["type"], "edit");
    assert_eq!(edit["oldTitle"], "draft");
    assert_eq!(edit["oldContent"], "draft body");
}

#[tokio::test]
async fn moving_relocates_the_file_and_records_endpoints() {
    let app = TestApp::spawn().await;
    seeded(&app).await;
    app.create_section("olivia", "Tech", "Archive").await;
    let filename = app.create_post("ben", "Tech", "General", "old news").await;

    let (status, _) = app
        .post(
            "/api/post/move",
            json!({
                "board": "Tech", "section": "General", "filename": filename,
                "newBoard": "Tech", "newSection": "Archive"
            }),
            Some("ben"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert!(!app.data_dir().join("Tech/General").join(&filename).exists());
    assert!(app.data_dir().join("Tech/Archive").join(&filename).exists());

    let (_, body) = app.get("/api/posts?board=Tech&section=Archive", None).await;
    let entry = body.as_array().unwrap()[0]["history"]
        .as_array()
        .unwrap()
        .last()
        .cloned()
        .unwrap();
    assert_eq!(entry["type"], "move");
    assert_eq!(entry["from"], "Tech/General");
    assert_eq!(entry["to"], "Tech/Archive");

    // Destination must exist.
    let filename = app.create_post("ben", "Tech", "General", "stuck").await;
    let (status, _) = app
        .post(
            "/api/post/move",
            json!({
                "board": "Tech", "section": "General", "filename": filename,
                "newBoard": "Tech", "newSection": "Void"
            }),
            Some("ben"),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pin_scopes_gate_by_level() {
    let app = TestApp::spawn().await;
    seeded(&app).await;
    let filename = app.create_post("ben", "Tech", "General", "notice").await;
    let body = |level: &str| {
        json!({
            "board": "Tech", "section": "General", "filename": filename,
            "level": level, "duration": -1
        })
    };

    // The author has no standing to pin.
    let (status, _) = app.post("/api/post/pin", body("section"), Some("ben")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post("/api/post/pin", body("board"), Some("olivia")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/api/post/pin", body("today"), Some("olivia")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post("/api/post/pin", body("today"), Some(SUPER_ADMIN)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/posts?board=Tech&section=General", None).await;
    assert_eq!(
        body.as_array().unwrap()[0]["pinned"],
        json!({ "level": "today", "expireAt": -1 })
    );
}

#[tokio::test]
async fn absurd_pin_durations_are_400_not_a_crash() {
    let app = TestApp::spawn().await;
    seeded(&app).await;
    let filename = app.create_post("ben", "Tech", "General", "notice").await;

    let (status, body) = app
        .post(
            "/api/post/pin",
            json!({
                "board": "Tech", "section": "General", "filename": filename,
                "level": "board", "duration": 4_000_000_000_000i64
            }),
            Some("olivia"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // The post stays unpinned.
    let (_, body) = app.get("/api/posts?board=Tech&section=General", None).await;
    assert_eq!(body.as_array().unwrap()[0]["pinned"], json!(null));
}

#[tokio::test]
async fn pinning_a_missing_post_is_404() {
    let app = TestApp::spawn().await;
    seeded(&app).await;
    let (status, _) = app
        .post(
            "/api/post/pin",
            json!({
                "board": "Tech", "section": "General", "filename": "1_zzzzz.json",
                "level": "today", "duration": -1
            }),
            Some(SUPER_ADMIN),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn share_record_touches_history_only() {
    let app = TestApp::spawn().await;
    seeded(&app).await;
    let filename = app.create_post("ben", "Tech", "General", "viral").await;

    let (status, _) = app
        .post(
            "/api/post/share-record",
            json!({ "board": "Tech", "section": "General", "filename": filename }),
            Some("zoe"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/posts?board=Tech&section=General", None).await;
    let post = &body.as_array().unwrap()[0];
    assert_eq!(post["shares"], 0);
    assert_eq!(post["history"].as_array().unwrap().last().unwrap()["type"], "share");
}
