use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::EventError;

use super::{FileRef, RoomMessage, find_room};

/// Appends a message from a current member.
///
/// Membership is re-checked by the insert itself, so a member who left
/// while an upload was in flight cannot post.
pub async fn append_room_message(
    db_pool: &SqlitePool,
    room_id: Uuid,
    sender_id: &str,
    text: &str,
    file: Option<FileRef<'_>>,
) -> Result<RoomMessage, EventError> {
    if text.is_empty() && file.is_none() {
        return Err(EventError::validation("message needs text or a file"));
    }

    if find_room(db_pool, room_id).await?.is_none() {
        return Err(EventError::NotFound(format!("room {room_id}")));
    }

    let message = RoomMessage {
        id: Uuid::now_v7(),
        sender_id: sender_id.to_owned(),
        text: text.to_owned(),
        file_url: file.map(|f| f.url.to_owned()),
        file_type: file.map(|f| f.content_type.to_owned()),
        created_at: Utc::now(),
    };

    let inserted = sqlx::query(
        "INSERT INTO room_messages (id,room_id,sender_id,text,file_url,file_type,created_at)
         SELECT ?,?,?,?,?,?,?
         WHERE EXISTS (SELECT 1 FROM room_members WHERE room_id=? AND participant_id=?)",
    )
    .bind(message.id)
    .bind(room_id)
    .bind(&message.sender_id)
    .bind(&message.text)
    .bind(&message.file_url)
    .bind(&message.file_type)
    .bind(message.created_at)
    .bind(room_id)
    .bind(sender_id)
    .execute(db_pool)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Err(EventError::NotMember {
            participant: sender_id.to_owned(),
            room_id,
        });
    }

    Ok(message)
}

pub async fn room_messages(db_pool: &SqlitePool, room_id: Uuid) -> Result<Vec<RoomMessage>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,sender_id,text,file_url,file_type,created_at FROM room_messages WHERE room_id=? ORDER BY rowid",
    )
    .bind(room_id)
    .fetch_all(db_pool)
    .await
}
