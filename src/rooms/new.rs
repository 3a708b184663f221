use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::EventError;

use super::ChatRoom;

/// Provisions a room. The secret, if any, is stored as a bcrypt hash of
/// the given cost.
pub async fn create_room(
    db_pool: &SqlitePool,
    name: &str,
    secret: Option<&str>,
    cost: u32,
) -> Result<ChatRoom, EventError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EventError::validation("room name"));
    }

    let secret_hash = match secret {
        Some(secret) => {
            let secret = secret.to_owned();
            Some(tokio::task::spawn_blocking(move || bcrypt::hash(secret, cost)).await??)
        }
        None => None,
    };

    let room = ChatRoom {
        id: Uuid::now_v7(),
        name: name.to_owned(),
        secret_hash,
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO chat_rooms (id,name,secret_hash,created_at) VALUES (?,?,?,?)")
        .bind(room.id)
        .bind(&room.name)
        .bind(&room.secret_hash)
        .bind(room.created_at)
        .execute(db_pool)
        .await?;

    tracing::info!(room_id = %room.id, name = %room.name, protected = room.secret_hash.is_some(), "created room");
    Ok(room)
}
