use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::EventError;

use super::find_room;

pub async fn members(db_pool: &SqlitePool, room_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT participant_id FROM room_members WHERE room_id=? ORDER BY rowid")
        .bind(room_id)
        .fetch_all(db_pool)
        .await
}

pub async fn is_member(db_pool: &SqlitePool, room_id: Uuid, participant_id: &str) -> Result<bool, sqlx::Error> {
    Ok(sqlx::query("SELECT 1 FROM room_members WHERE room_id=? AND participant_id=?")
        .bind(room_id)
        .bind(participant_id)
        .fetch_optional(db_pool)
        .await?
        .is_some())
}

/// Adds `participant_id` to the room and returns the member list.
///
/// Existing members pass without the secret being checked again.
pub async fn join(
    db_pool: &SqlitePool,
    room_id: Uuid,
    participant_id: &str,
    secret: Option<&str>,
) -> Result<Vec<String>, EventError> {
    let room = find_room(db_pool, room_id)
        .await?
        .ok_or_else(|| EventError::NotFound(format!("room {room_id}")))?;

    if is_member(db_pool, room_id, participant_id).await? {
        return Ok(members(db_pool, room_id).await?);
    }

    if let Some(hash) = room.secret_hash {
        let Some(secret) = secret.map(str::to_owned) else {
            return Err(EventError::Unauthorized);
        };
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash)).await??;
        if !matches {
            return Err(EventError::Unauthorized);
        }
    }

    // someone may have joined us from another connection while we verified
    sqlx::query("INSERT OR IGNORE INTO room_members (room_id,participant_id,joined_at) VALUES (?,?,?)")
        .bind(room_id)
        .bind(participant_id)
        .bind(Utc::now())
        .execute(db_pool)
        .await?;

    Ok(members(db_pool, room_id).await?)
}

/// Removes `participant_id` from the room. Returns false if they were not a member.
pub async fn leave(db_pool: &SqlitePool, room_id: Uuid, participant_id: &str) -> Result<bool, EventError> {
    if find_room(db_pool, room_id).await?.is_none() {
        return Err(EventError::NotFound(format!("room {room_id}")));
    }

    let removed = sqlx::query("DELETE FROM room_members WHERE room_id=? AND participant_id=?")
        .bind(room_id)
        .bind(participant_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    Ok(removed > 0)
}
