mod history;
mod store;

use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;

pub use store::{append_direct_message, direct_chat_with_messages, find_direct_chat, open_direct_chat};

/// History between exactly two participants, in first-exchange order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectChat {
    pub id: Uuid,
    pub participants: [String; 2],
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{target_id}", get(history::direct_history))
}
