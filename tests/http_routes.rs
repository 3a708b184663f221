use axum::{
    Router,
    body::{Body, to_bytes},
    extract::Path,
    http::{Request, StatusCode, header},
    routing,
};
use heartline::{AppState, chat, config::Config, db, rooms, session::USER_ID};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

// stands in for the real login flow
async fn login(Path(user_id): Path<String>, session: Session) -> StatusCode {
    session.insert(USER_ID, user_id).await.unwrap();
    StatusCode::NO_CONTENT
}

async fn setup() -> (Router, AppState, TempDir) {
    setup_with(Config::default()).await
}

async fn setup_with(config: Config) -> (Router, AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        upload_dir: dir.path().to_owned(),
        ..config
    };
    let state = AppState::new(db::memory_pool().await.unwrap(), config);

    let app = heartline::app(state.clone())
        .route("/test-login/{user_id}", routing::get(login))
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false));

    (app, state, dir)
}

async fn sign_in(app: &Router, user_id: &str) -> String {
    let response = app
        .clone()
        .oneshot(Request::get(format!("/test-login/{user_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }

    let response = app.clone().oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn history_needs_a_session() {
    let (app, _state, _dir) = setup().await;

    assert_eq!(get(&app, "/rooms", None).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(get(&app, "/chat/bob", None).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn direct_history_is_shared_by_the_pair() {
    let (app, state, _dir) = setup().await;
    let alice = sign_in(&app, "alice").await;
    let bob = sign_in(&app, "bob").await;

    let (status, body) = get(&app, "/chat/bob", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let chat: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(chat["participants"], serde_json::json!(["alice", "bob"]));
    assert_eq!(chat["messages"].as_array().unwrap().len(), 0);

    chat::append_direct_message(&state.db_pool, "bob", "alice", "bob", "hello there").await.unwrap();

    let (status, body) = get(&app, "/chat/alice", Some(&bob)).await;
    assert_eq!(status, StatusCode::OK);
    let seen: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(seen["id"], chat["id"]);
    assert_eq!(seen["messages"][0]["senderId"], "bob");
    assert_eq!(seen["messages"][0]["text"], "hello there");
}

#[tokio::test]
async fn room_listing_and_messages() {
    let (app, state, _dir) = setup().await;
    let alice = sign_in(&app, "alice").await;

    let lobby = rooms::create_room(&state.db_pool, "lobby", None, 4).await.unwrap();
    rooms::create_room(&state.db_pool, "vip", Some("rosebud"), 4).await.unwrap();
    rooms::join(&state.db_pool, lobby.id, "alice", None).await.unwrap();
    rooms::append_room_message(&state.db_pool, lobby.id, "alice", "first!", None).await.unwrap();

    let (status, body) = get(&app, "/rooms", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed[0]["name"], "lobby");
    assert_eq!(listed[0]["protected"], false);
    assert_eq!(listed[1]["name"], "vip");
    assert_eq!(listed[1]["protected"], true);
    assert!(listed[1].get("secretHash").is_none() && listed[1].get("secret_hash").is_none());

    let (status, body) = get(&app, &format!("/rooms/{}/messages", lobby.id), Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let messages: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(messages[0]["text"], "first!");
    assert_eq!(messages[0]["fileUrl"], Value::Null);

    let (status, _) = get(&app, &format!("/rooms/{}/messages", Uuid::now_v7()), Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn room_history_is_for_members() {
    let (app, state, _dir) = setup().await;
    let alice = sign_in(&app, "alice").await;
    let eve = sign_in(&app, "eve").await;

    let vip = rooms::create_room(&state.db_pool, "vip", Some("rosebud"), 4).await.unwrap();
    rooms::join(&state.db_pool, vip.id, "alice", Some("rosebud")).await.unwrap();
    rooms::append_room_message(&state.db_pool, vip.id, "alice", "the password is rosebud", None).await.unwrap();

    let uri = format!("/rooms/{}/messages", vip.id);
    let (status, body) = get(&app, &uri, Some(&eve)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!String::from_utf8_lossy(&body).contains("rosebud"));

    let (status, body) = get(&app, &uri, Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let messages: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(messages.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn uploads_are_served() {
    let (app, state, _dir) = setup().await;

    let stored = state.uploads.store(b"GIF89a", "wave.gif", "image/gif").await.unwrap();
    let (status, body) = get(&app, &stored.url, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"GIF89a");
}

#[tokio::test]
async fn upload_prefix_with_trailing_slash() {
    let (app, state, _dir) = setup_with(Config {
        upload_url: "/files/".to_owned(),
        ..Config::default()
    })
    .await;

    let stored = state.uploads.store(b"GIF89a", "wave.gif", "image/gif").await.unwrap();
    assert!(stored.url.starts_with("/files/") && !stored.url.starts_with("/files//"));
    let (status, body) = get(&app, &stored.url, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"GIF89a");
}
