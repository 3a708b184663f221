use crate::{error::EventError, identity::RoomKey};

use super::{
    broadcast::broadcast,
    events::ServerEvent,
    registry::{Channel, ConnectionRegistry},
};

/// Forwards a signaling event to the pair's private channel.
///
/// Nothing is stored; if the callee has not joined the channel the event is
/// simply lost.
pub async fn relay(registry: &ConnectionRegistry, from: &str, to: &str, event: ServerEvent) -> Result<usize, EventError> {
    if from.is_empty() || to.is_empty() {
        return Err(EventError::validation("call needs both participants"));
    }

    let channel = Channel::Direct(RoomKey::derive(from, to));
    let delivered = broadcast(registry, &channel, &event).await;
    if delivered == 0 {
        tracing::debug!(%from, %to, "call signal had no listeners");
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn only_the_pair_hears_it() {
        let registry = ConnectionRegistry::new();
        let (c1, mut c1_rx) = registry.connect("c1").await;
        let (c2, mut c2_rx) = registry.connect("c2").await;
        let (c3, mut c3_rx) = registry.connect("c3").await;

        let pair = Channel::Direct(RoomKey::derive("c1", "c2"));
        registry.join(c1.id, pair.clone()).await;
        registry.join(c2.id, pair).await;
        registry.join(c3.id, Channel::Direct(RoomKey::derive("c1", "c3"))).await;

        let offer = ServerEvent::IncomingCall {
            from_participant_id: "c1".to_owned(),
            offer: json!({"type": "offer", "sdp": "v=0"}),
        };
        assert_eq!(relay(&registry, "c1", "c2", offer.clone()).await.unwrap(), 2);

        assert_eq!(c2_rx.recv().await.unwrap(), offer.to_json());
        assert_eq!(c1_rx.recv().await.unwrap(), offer.to_json());
        assert!(c3_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn absent_callee_is_not_an_error() {
        let registry = ConnectionRegistry::new();
        assert_eq!(relay(&registry, "c1", "c2", ServerEvent::CallEnded).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn needs_both_ids() {
        let registry = ConnectionRegistry::new();
        let err = relay(&registry, "c1", "", ServerEvent::CallEnded).await.unwrap_err();
        assert!(matches!(err, EventError::Validation(_)));
    }
}
