use uuid::Uuid;

use crate::{
    AppState, chat,
    error::EventError,
    identity::{self, RoomKey},
    rooms::{self, FileRef},
};

use super::{
    broadcast::broadcast,
    calls,
    events::{ClientEvent, FilePayload, ServerEvent, raw_event_name},
    registry::{Channel, Connection},
};

/// Parses and handles one inbound frame.
///
/// Failures are logged and the event dropped; the connection stays up. With
/// acks enabled the sender also gets an `ack` describing the outcome.
pub async fn dispatch(state: &AppState, connection: &Connection, raw: &str) {
    let (name, result) = match ClientEvent::from_json(raw) {
        Ok(event) => {
            let name = event.name().to_owned();
            (name, handle(state, connection, event).await)
        }
        Err(err) => (raw_event_name(raw).unwrap_or_else(|| "unknown".to_owned()), Err(err)),
    };

    if let Err(err) = &result {
        match err {
            EventError::Persistence(_) | EventError::Upload(_) | EventError::Secret(_) | EventError::Task(_) => {
                tracing::error!(connection = %connection.id, event = %name, %err, "event failed");
            }
            _ => {
                tracing::warn!(connection = %connection.id, event = %name, %err, "dropped event");
            }
        }
    }

    if state.config.acks {
        let ack = ServerEvent::Ack {
            event: name,
            ok: result.is_ok(),
            error: result.err().map(|err| err.client_reason().to_owned()),
        };
        state.registry.send_to(connection.id, ack.to_json()).await;
    }
}

pub async fn handle(state: &AppState, connection: &Connection, event: ClientEvent) -> Result<(), EventError> {
    if event.actor() != connection.participant_id {
        return Err(EventError::validation(format!(
            "{} may not act as {}",
            connection.participant_id,
            event.actor()
        )));
    }

    use ClientEvent::*;
    match event {
        JoinChat { display_name, participant_id, target_participant_id } => {
            join_chat(state, connection, &display_name, &participant_id, &target_participant_id).await
        }
        SendMessage { display_name, display_last_name, participant_id, target_participant_id, text } => {
            require_participant(&target_participant_id)?;
            if text.trim().is_empty() {
                return Err(EventError::validation("empty message"));
            }

            chat::append_direct_message(&state.db_pool, &participant_id, &target_participant_id, &participant_id, &text)
                .await?;

            let channel = Channel::Direct(RoomKey::derive(&participant_id, &target_participant_id));
            broadcast(
                &state.registry,
                &channel,
                &ServerEvent::MessageReceived { display_name, display_last_name, text },
            )
            .await;
            Ok(())
        }
        JoinRoom { participant_id, room_id, secret } => {
            let members = rooms::join(&state.db_pool, room_id, &participant_id, secret.as_deref()).await?;

            let channel = Channel::Room(room_id);
            state.registry.join(connection.id, channel.clone()).await;
            tracing::info!(connection = %connection.id, participant = %participant_id, %room_id, members = members.len(), "joined room");

            let message = format!("{participant_id} joined the room");
            broadcast(&state.registry, &channel, &ServerEvent::UserJoined { participant_id, message }).await;
            Ok(())
        }
        LeaveRoom { participant_id, room_id } => {
            let removed = rooms::leave(&state.db_pool, room_id, &participant_id).await?;

            let channel = Channel::Room(room_id);
            if removed {
                let message = format!("{participant_id} left the room");
                broadcast(&state.registry, &channel, &ServerEvent::UserLeft { participant_id, message }).await;
            }
            state.registry.leave(connection.id, &channel).await;
            Ok(())
        }
        SendRoomMessage { participant_id, room_id, text, file } => {
            send_room_message(state, &participant_id, room_id, text.unwrap_or_default(), file).await
        }
        CallUser { from_participant_id, to_participant_id, offer } => {
            require_participant(&to_participant_id)?;
            let event = ServerEvent::IncomingCall { from_participant_id: from_participant_id.clone(), offer };
            calls::relay(&state.registry, &from_participant_id, &to_participant_id, event).await?;
            Ok(())
        }
        AnswerCall { from_participant_id, to_participant_id, answer } => {
            require_participant(&to_participant_id)?;
            calls::relay(&state.registry, &from_participant_id, &to_participant_id, ServerEvent::CallAnswered { answer })
                .await?;
            Ok(())
        }
        IceCandidate { from_participant_id, to_participant_id, candidate } => {
            require_participant(&to_participant_id)?;
            calls::relay(&state.registry, &from_participant_id, &to_participant_id, ServerEvent::IceCandidate { candidate })
                .await?;
            Ok(())
        }
        EndCall { from_participant_id, to_participant_id } => {
            require_participant(&to_participant_id)?;
            calls::relay(&state.registry, &from_participant_id, &to_participant_id, ServerEvent::CallEnded).await?;
            Ok(())
        }
    }
}

fn require_participant(id: &str) -> Result<(), EventError> {
    if identity::is_valid_participant(id) {
        Ok(())
    } else {
        Err(EventError::validation(format!("bad participant id {id:?}")))
    }
}

async fn join_chat(
    state: &AppState,
    connection: &Connection,
    display_name: &str,
    participant_id: &str,
    target_participant_id: &str,
) -> Result<(), EventError> {
    require_participant(target_participant_id)?;

    let key = RoomKey::derive(participant_id, target_participant_id);
    tracing::info!(connection = %connection.id, %display_name, room = %key, "joining direct chat");
    state.registry.join(connection.id, Channel::Direct(key)).await;
    Ok(())
}

async fn send_room_message(
    state: &AppState,
    participant_id: &str,
    room_id: Uuid,
    text: String,
    file: Option<FilePayload>,
) -> Result<(), EventError> {
    if text.trim().is_empty() && file.is_none() {
        return Err(EventError::validation("message needs text or a file"));
    }

    // reject before anything is written to disk
    if rooms::find_room(&state.db_pool, room_id).await?.is_none() {
        return Err(EventError::NotFound(format!("room {room_id}")));
    }
    if !rooms::is_member(&state.db_pool, room_id, participant_id).await? {
        return Err(EventError::NotMember { participant: participant_id.to_owned(), room_id });
    }

    let stored = match file {
        Some(file) => {
            let bytes = state.uploads.decode(&file.data)?;
            let content_type = match file.content_type.trim() {
                "" => "application/octet-stream",
                content_type => content_type,
            };
            Some(state.uploads.store(&bytes, &file.name, content_type).await?)
        }
        None => None,
    };

    let file_ref = stored.as_ref().map(|f| FileRef { url: &f.url, content_type: &f.content_type });
    let message = match rooms::append_room_message(&state.db_pool, room_id, participant_id, &text, file_ref).await {
        Ok(message) => message,
        Err(err) => {
            if let Some(stored) = &stored {
                state.uploads.remove(stored).await;
            }
            return Err(err);
        }
    };

    broadcast(
        &state.registry,
        &Channel::Room(room_id),
        &ServerEvent::RoomMessageReceived {
            sender_id: message.sender_id,
            text: message.text,
            file_url: message.file_url,
            file_type: message.file_type,
            timestamp: message.created_at,
        },
    )
    .await;
    Ok(())
}
