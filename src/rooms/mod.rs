mod membership;
mod msg;
mod new;
mod room;

use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::AppState;

pub use membership::{is_member, join, leave, members};
pub use msg::{append_room_message, room_messages};
pub use new::create_room;

/// Explicitly provisioned group channel.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatRoom {
    pub id: Uuid,
    pub name: String,
    pub secret_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reference to an already stored attachment.
#[derive(Debug, Clone, Copy)]
pub struct FileRef<'a> {
    pub url: &'a str,
    pub content_type: &'a str,
}

pub async fn find_room(db_pool: &SqlitePool, room_id: Uuid) -> Result<Option<ChatRoom>, sqlx::Error> {
    sqlx::query_as("SELECT id,name,secret_hash,created_at FROM chat_rooms WHERE id=?")
        .bind(room_id)
        .fetch_optional(db_pool)
        .await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(room::list_rooms))
        .route("/{room_id}/messages", get(room::messages))
}
