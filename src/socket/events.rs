//! Wire format of the socket.
//!
//! Every frame is a JSON envelope `{"event": "<name>", "data": {...}}` with
//! camelCase field names, in both directions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::EventError;

#[derive(Debug, Clone, Deserialize)]
pub struct FilePayload {
    pub data: String,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Events a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinChat {
        #[serde(default)]
        display_name: String,
        participant_id: String,
        target_participant_id: String,
    },
    SendMessage {
        #[serde(default)]
        display_name: String,
        #[serde(default)]
        display_last_name: String,
        participant_id: String,
        target_participant_id: String,
        text: String,
    },
    JoinRoom {
        participant_id: String,
        room_id: Uuid,
        #[serde(default)]
        secret: Option<String>,
    },
    LeaveRoom {
        participant_id: String,
        room_id: Uuid,
    },
    SendRoomMessage {
        participant_id: String,
        room_id: Uuid,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        file: Option<FilePayload>,
    },
    CallUser {
        from_participant_id: String,
        to_participant_id: String,
        offer: Value,
    },
    AnswerCall {
        from_participant_id: String,
        to_participant_id: String,
        answer: Value,
    },
    IceCandidate {
        from_participant_id: String,
        to_participant_id: String,
        candidate: Value,
    },
    EndCall {
        from_participant_id: String,
        to_participant_id: String,
    },
}

impl ClientEvent {
    pub fn from_json(raw: &str) -> Result<ClientEvent, EventError> {
        serde_json::from_str(raw).map_err(|err| EventError::validation(err.to_string()))
    }

    pub fn name(&self) -> &'static str {
        use ClientEvent::*;
        match self {
            JoinChat { .. } => "joinChat",
            SendMessage { .. } => "sendMessage",
            JoinRoom { .. } => "joinRoom",
            LeaveRoom { .. } => "leaveRoom",
            SendRoomMessage { .. } => "sendRoomMessage",
            CallUser { .. } => "callUser",
            AnswerCall { .. } => "answerCall",
            IceCandidate { .. } => "iceCandidate",
            EndCall { .. } => "endCall",
        }
    }

    /// The participant on whose behalf the event is sent.
    pub fn actor(&self) -> &str {
        use ClientEvent::*;
        match self {
            JoinChat { participant_id, .. }
            | SendMessage { participant_id, .. }
            | JoinRoom { participant_id, .. }
            | LeaveRoom { participant_id, .. }
            | SendRoomMessage { participant_id, .. } => participant_id,
            CallUser { from_participant_id, .. }
            | AnswerCall { from_participant_id, .. }
            | IceCandidate { from_participant_id, .. }
            | EndCall { from_participant_id, .. } => from_participant_id,
        }
    }
}

/// Best effort event name of a frame that failed to parse, for diagnostics.
pub fn raw_event_name(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    value.get("event")?.as_str().map(str::to_owned)
}

/// Events the server emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    MessageReceived {
        display_name: String,
        display_last_name: String,
        text: String,
    },
    UserJoined {
        participant_id: String,
        message: String,
    },
    UserLeft {
        participant_id: String,
        message: String,
    },
    RoomMessageReceived {
        sender_id: String,
        text: String,
        file_url: Option<String>,
        file_type: Option<String>,
        timestamp: DateTime<Utc>,
    },
    IncomingCall {
        from_participant_id: String,
        offer: Value,
    },
    CallAnswered {
        answer: Value,
    },
    IceCandidate {
        candidate: Value,
    },
    CallEnded,
    Ack {
        event: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
}

impl ServerEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            tracing::error!(%err, "could not encode server event");
            String::new()
        })
    }
}
