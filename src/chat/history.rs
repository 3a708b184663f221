use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, error::EventError, identity, session};

use super::open_direct_chat;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn direct_history(
    Path(target_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let Some(user_id) = session::participant(&session).await? else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };

    if !identity::is_valid_participant(&target_id) {
        return Err(EventError::validation("target participant id").into());
    }

    let chat = open_direct_chat(&db_pool, &user_id, &target_id).await?;
    Ok(Json(chat).into_response())
}
