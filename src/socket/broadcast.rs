use tokio::sync::mpsc::error::TrySendError;

use super::{
    events::ServerEvent,
    registry::{Channel, ConnectionRegistry},
};

/// Sends `event` to every connection joined to `channel`, the sender
/// included. Returns how many connections it was queued for.
///
/// Connections that are gone or whose queue is full are disconnected.
pub async fn broadcast(registry: &ConnectionRegistry, channel: &Channel, event: &ServerEvent) -> usize {
    let frame = event.to_json();
    let mut delivered = 0;
    let mut dead = Vec::new();

    for (connection, outbox) in registry.subscribers(channel).await {
        match outbox.try_send(frame.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%connection, %channel, "outbox full, dropping connection");
                dead.push(connection);
            }
            Err(TrySendError::Closed(_)) => dead.push(connection),
        }
    }

    for connection in dead {
        registry.disconnect(connection).await;
    }

    tracing::debug!(%channel, delivered, "broadcast");
    delivered
}
