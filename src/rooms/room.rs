use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, error::EventError, session};

use super::{find_room, is_member, room_messages};

#[derive(Serialize, sqlx::FromRow)]
pub(crate) struct RoomSummary {
    id: Uuid,
    name: String,
    protected: bool,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_rooms(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    if session::participant(&session).await?.is_none() {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    }

    let rooms: Vec<RoomSummary> =
        sqlx::query_as("SELECT id,name,secret_hash IS NOT NULL AS protected FROM chat_rooms ORDER BY rowid")
            .fetch_all(&db_pool)
            .await?;

    Ok(Json(rooms).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn messages(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let Some(participant_id) = session::participant(&session).await? else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };

    // locked rooms look the same as missing ones
    if find_room(&db_pool, room_id).await?.is_none() || !is_member(&db_pool, room_id, &participant_id).await? {
        return Err(EventError::NotFound(format!("room {room_id}")).into());
    }

    Ok(Json(room_messages(&db_pool, room_id).await?).into_response())
}
