//! Route handlers and the router assembly.
//!
//! Handlers stay thin: decode the request, call one service, shape the
//! response. Success envelopes are `{"success": true, ...}`; failures go
//! through [`crate::error::ApiError`].

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, Method};
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json as Reply, Router};
use domains::{now_millis, Error, PinScope, PostLocation};
use serde::Deserialize;
use serde_json::{json, Value};
use services::{FollowKind, RankedKind};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiResult;
use crate::extract::{CurrentUser, Json, MaybeUser, Query};
use crate::metrics;
use crate::state::AppState;

/// The full application router with its middleware stack.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/api/structure", get(structure))
        .route("/api/posts", get(list_posts))
        .route("/api/all-posts", get(all_posts))
        .route("/api/board", post(create_board))
        .route("/api/board/rename", post(rename_board))
        .route("/api/board/delete", post(delete_board))
        .route("/api/board/admin", post(set_board_admin))
        .route("/api/board/manage-info", get(manage_info))
        .route("/api/section", post(create_section))
        .route("/api/post", post(create_post))
        .route("/api/post/edit", post(edit_post))
        .route("/api/post/move", post(move_post))
        .route("/api/post/like", post(like_post))
        .route("/api/post/vote", post(vote_post))
        .route("/api/post/pin", post(pin_post))
        .route("/api/post/share-record", post(share_record))
        .route("/api/comment/add", post(add_comment))
        .route("/api/manage/update", post(manage_update))
        .route("/api/search", get(search))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/user", get(current_user))
        .route("/api/user/permissions", get(user_permissions))
        .route("/api/user/follow", post(follow))
        .route("/api/user/follows", get(follows))
        .route("/api/user/settings", post(save_settings))
        .route("/api/user/profile/{username}", get(user_profile))
        .route("/api/admin/reorder-boards", post(reorder_boards))
        .route("/api/system/stats", get(system_stats))
        .route("/api/summary", get(summary))
        .route("/logout", get(logout))
        .route("/metrics", get(metrics::serve_metrics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .layer(CompressionLayer::new())
        .with_state(state)
}

// ── Structure & listings ────────────────────────────────────────────────────

async fn structure(State(state): State<Arc<AppState>>) -> ApiResult<Reply<Value>> {
    let structure = state.boards.structure().await?;
    Ok(Reply(serde_json::to_value(structure).map_err(Error::from)?))
}

#[derive(Deserialize)]
struct PostsQuery {
    board: String,
    section: String,
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostsQuery>,
) -> ApiResult<Reply<Value>> {
    let posts = state.posts.list(&query.board, &query.section).await?;
    Ok(Reply(serde_json::to_value(posts).map_err(Error::from)?))
}

async fn all_posts(State(state): State<Arc<AppState>>) -> ApiResult<Reply<Value>> {
    let posts = state.posts.all().await?;
    Ok(Reply(serde_json::to_value(posts).map_err(Error::from)?))
}

// ── Boards & sections ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateBoardRequest {
    name: String,
}

async fn create_board(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<Reply<Value>> {
    state.boards.create_board(&user, &req.name).await?;
    Ok(Reply(json!({ "success": true })))
}

#[derive(Deserialize)]
struct RenameBoardRequest {
    board: String,
    #[serde(rename = "newName")]
    new_name: String,
}

async fn rename_board(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<RenameBoardRequest>,
) -> ApiResult<Reply<Value>> {
    state.boards.rename_board(&user, &req.board, &req.new_name).await?;
    Ok(Reply(json!({ "success": true })))
}

#[derive(Deserialize)]
struct BoardRequest {
    board: String,
}

async fn delete_board(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<BoardRequest>,
) -> ApiResult<Reply<Value>> {
    state.boards.delete_board(&user, &req.board).await?;
    Ok(Reply(json!({ "success": true })))
}

#[derive(Deserialize)]
struct BoardAdminRequest {
    board: String,
    #[serde(rename = "adminName")]
    admin_name: String,
    /// `"add"` appends; anything else removes.
    action: String,
}

async fn set_board_admin(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<BoardAdminRequest>,
) -> ApiResult<Reply<Value>> {
    let admins = state
        .boards
        .set_admin(&user, &req.board, &req.admin_name, req.action == "add")
        .await?;
    Ok(Reply(json!({ "success": true, "admins": admins })))
}

async fn manage_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BoardRequest>,
) -> ApiResult<Reply<Value>> {
    Ok(Reply(state.boards.manage_info(&query.board).await?))
}

#[derive(Deserialize)]
struct CreateSectionRequest {
    board: String,
    name: String,
}

async fn create_section(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateSectionRequest>,
) -> ApiResult<Reply<Value>> {
    state.boards.create_section(&user, &req.board, &req.name).await?;
    Ok(Reply(json!({ "success": true })))
}

// ── Post lifecycle ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreatePostRequest {
    board: String,
    section: String,
    title: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<Reply<Value>> {
    let filename = state
        .posts
        .create(&user, &req.board, &req.section, req.title, req.content, req.tags)
        .await?;
    Ok(Reply(json!({ "success": true, "filename": filename })))
}

#[derive(Deserialize)]
struct EditPostRequest {
    board: String,
    section: String,
    filename: String,
    title: String,
    content: String,
}

async fn edit_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<EditPostRequest>,
) -> ApiResult<Reply<Value>> {
    let loc = PostLocation::new(req.board, req.section, req.filename);
    state.posts.edit(&user, &loc, req.title, req.content).await?;
    Ok(Reply(json!({ "success": true })))
}

#[derive(Deserialize)]
struct MovePostRequest {
    board: String,
    section: String,
    filename: String,
    #[serde(rename = "newBoard")]
    new_board: String,
    #[serde(rename = "newSection")]
    new_section: String,
}

async fn move_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<MovePostRequest>,
) -> ApiResult<Reply<Value>> {
    let from = PostLocation::new(req.board, req.section, req.filename);
    state
        .posts
        .move_post(&user, &from, &req.new_board, &req.new_section)
        .await?;
    Ok(Reply(json!({ "success": true })))
}

#[derive(Deserialize)]
struct PinPostRequest {
    board: String,
    section: String,
    filename: String,
    level: PinScope,
    /// Hours until expiry; `-1` pins forever.
    duration: i64,
}

async fn pin_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PinPostRequest>,
) -> ApiResult<Reply<Value>> {
    let loc = PostLocation::new(req.board, req.section, req.filename);
    state.posts.pin(&user, &loc, req.level, req.duration).await?;
    Ok(Reply(json!({ "success": true })))
}

#[derive(Deserialize)]
struct PostRefRequest {
    board: String,
    section: String,
    filename: String,
}

impl PostRefRequest {
    fn location(self) -> PostLocation {
        PostLocation::new(self.board, self.section, self.filename)
    }
}

async fn share_record(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PostRefRequest>,
) -> ApiResult<Reply<Value>> {
    state.posts.share_record(&user, &req.location()).await?;
    Ok(Reply(json!({ "success": true })))
}

// ── Social ──────────────────────────────────────────────────────────────────

async fn like_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PostRefRequest>,
) -> ApiResult<Reply<Value>> {
    let (liked, count) = state.social.like(&user, &req.location()).await?;
    Ok(Reply(json!({ "success": true, "liked": liked, "count": count })))
}

#[derive(Deserialize)]
struct VoteRequest {
    board: String,
    section: String,
    filename: String,
    option: String,
}

async fn vote_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Reply<Value>> {
    let loc = PostLocation::new(req.board, req.section, req.filename);
    let votes = state.social.vote(&user, &loc, &req.option).await?;
    Ok(Reply(json!({ "success": true, "votes": votes })))
}

#[derive(Deserialize)]
struct CommentRequest {
    board: String,
    section: String,
    filename: String,
    content: String,
}

async fn add_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Reply<Value>> {
    let loc = PostLocation::new(req.board, req.section, req.filename);
    state.social.comment(&user, &loc, req.content).await?;
    Ok(Reply(json!({ "success": true })))
}

// ── Moderation ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ManageUpdateRequest {
    board: String,
    section: Option<String>,
    action: String,
    #[serde(default)]
    data: Value,
}

async fn manage_update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ManageUpdateRequest>,
) -> ApiResult<Reply<Value>> {
    let info = state
        .moderation
        .manage_update(&user, &req.board, req.section.as_deref(), &req.action, &req.data)
        .await?;
    Ok(Reply(match info {
        Some(info) => json!({ "success": true, "info": info }),
        None => json!({ "success": true }),
    }))
}

#[derive(Deserialize)]
struct ReorderBoardsRequest {
    #[serde(rename = "newOrder")]
    new_order: Vec<String>,
}

async fn reorder_boards(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ReorderBoardsRequest>,
) -> ApiResult<Reply<Value>> {
    state.moderation.reorder_boards(&user, &req.new_order).await?;
    Ok(Reply(json!({ "success": true })))
}

// ── Search & stats ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Reply<Value>> {
    let q = match query.q.as_deref() {
        Some(q) if !q.is_empty() => q,
        _ => return Err(Error::Invalid("missing search query".into()).into()),
    };
    let results = state.search.search(q).await?;
    Ok(Reply(serde_json::to_value(results).map_err(Error::from)?))
}

#[derive(Deserialize)]
struct LeaderboardQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default = "default_leaderboard_range")]
    range: String,
    start: Option<i64>,
    end: Option<i64>,
}

fn default_leaderboard_range() -> String {
    "all".into()
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Reply<Value>> {
    let window = match query.range.as_str() {
        "all" => None,
        "custom" => {
            let (Some(start), Some(end)) = (query.start, query.end) else {
                return Err(Error::Invalid("custom range needs start and end".into()).into());
            };
            Some((start, end))
        }
        days => {
            let days: i64 = days
                .parse()
                .map_err(|_| Error::Invalid(format!("unusable range: {days}")))?;
            let end = now_millis().timestamp_millis();
            // Checked math: the range is client-supplied and must not wrap.
            let start = days
                .checked_mul(86_400_000)
                .and_then(|span| end.checked_sub(span))
                .ok_or_else(|| Error::Invalid(format!("unusable range: {days}")))?;
            Some((start, end))
        }
    };

    // Anything that is not a ranked kind falls through to the post ranking.
    let value = match query.kind.as_deref() {
        Some("user") => serde_json::to_value(
            state.stats.ranked_leaderboard(RankedKind::User, window).await?,
        ),
        Some("board") => serde_json::to_value(
            state.stats.ranked_leaderboard(RankedKind::Board, window).await?,
        ),
        Some("section") => serde_json::to_value(
            state.stats.ranked_leaderboard(RankedKind::Section, window).await?,
        ),
        _ => serde_json::to_value(state.stats.post_leaderboard(window).await?),
    };
    Ok(Reply(value.map_err(Error::from)?))
}

async fn user_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> ApiResult<Reply<Value>> {
    let profile = state.stats.profile(&username).await?;
    Ok(Reply(serde_json::to_value(profile).map_err(Error::from)?))
}

async fn system_stats(State(state): State<Arc<AppState>>) -> ApiResult<Reply<Value>> {
    let stats = state.stats.system_stats().await?;
    Ok(Reply(serde_json::to_value(stats).map_err(Error::from)?))
}

async fn summary(State(state): State<Arc<AppState>>) -> ApiResult<Reply<Value>> {
    Ok(Reply(state.stats.summary().await?.unwrap_or(Value::Null)))
}

// ── Session & user ──────────────────────────────────────────────────────────

async fn current_user(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> ApiResult<Reply<Value>> {
    Ok(Reply(match user {
        Some(user) => {
            let is_super = state.permissions.is_super(&user.username);
            let mut value = serde_json::to_value(&user).map_err(Error::from)?;
            value["isSuperAdmin"] = json!(is_super);
            value
        }
        None => Value::Null,
    }))
}

async fn user_permissions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Reply<Value>> {
    let grants = state.permissions.grants(&user.username).await?;
    Ok(Reply(serde_json::to_value(grants).map_err(Error::from)?))
}

#[derive(Deserialize)]
struct FollowRequest {
    #[serde(rename = "type")]
    kind: FollowKind,
    target: String,
}

async fn follow(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<FollowRequest>,
) -> ApiResult<Reply<Value>> {
    let is_following = state.social.follow(&user, req.kind, &req.target).await?;
    Ok(Reply(json!({ "success": true, "isFollowing": is_following })))
}

async fn follows(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> ApiResult<Reply<Value>> {
    let following = match user {
        Some(user) => state.social.follows(&user.username).await?,
        None => Default::default(),
    };
    Ok(Reply(json!({
        "boards": following.boards,
        "sections": following.sections,
    })))
}

async fn save_settings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(settings): Json<Value>,
) -> ApiResult<Reply<Value>> {
    state.social.save_settings(&user, settings).await?;
    Ok(Reply(json!({ "success": true })))
}

async fn logout(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.logout_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}
