use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use tokio::sync::{
    RwLock,
    mpsc::{self, Receiver, Sender},
};
use uuid::Uuid;

use crate::identity::RoomKey;

/// Frames queued per connection before it counts as stalled.
pub const OUTBOX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Something a connection can join and receive broadcasts from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Private channel of a participant pair, for chat and calls.
    Direct(RoomKey),
    /// A provisioned group room.
    Room(Uuid),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Channel::Direct(key) => write!(f, "direct:{key}"),
            Channel::Room(room_id) => write!(f, "room:{room_id}"),
        }
    }
}

/// A live socket, bound to the participant that opened it.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub participant_id: String,
}

#[derive(Default)]
struct Inner {
    outboxes: HashMap<ConnectionId, Sender<String>>,
    channels: HashMap<Channel, HashSet<ConnectionId>>,
    joined: HashMap<ConnectionId, HashSet<Channel>>,
}

/// Live connections and the channels each one has joined.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Frames queued for it arrive on the receiver.
    pub async fn connect(&self, participant_id: impl Into<String>) -> (Connection, Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        let connection = Connection {
            id: ConnectionId::new(),
            participant_id: participant_id.into(),
        };

        let mut guard = self.inner.write().await;
        guard.outboxes.insert(connection.id, tx);
        tracing::debug!(connection = %connection.id, participant = %connection.participant_id, live = guard.outboxes.len(), "connected");

        (connection, rx)
    }

    /// Returns false if the connection is already gone.
    pub async fn join(&self, connection: ConnectionId, channel: Channel) -> bool {
        let mut guard = self.inner.write().await;
        if !guard.outboxes.contains_key(&connection) {
            return false;
        }

        guard.channels.entry(channel.clone()).or_default().insert(connection);
        guard.joined.entry(connection).or_default().insert(channel);
        true
    }

    pub async fn leave(&self, connection: ConnectionId, channel: &Channel) {
        let mut guard = self.inner.write().await;
        if let Some(joined) = guard.joined.get_mut(&connection) {
            joined.remove(channel);
        }
        remove_from_channel(&mut guard, channel, connection);
    }

    /// Drops the connection from every channel and closes its queue.
    pub async fn disconnect(&self, connection: ConnectionId) -> Vec<Channel> {
        let mut guard = self.inner.write().await;
        guard.outboxes.remove(&connection);

        let channels: Vec<Channel> = guard.joined.remove(&connection).unwrap_or_default().into_iter().collect();
        for channel in &channels {
            remove_from_channel(&mut guard, channel, connection);
        }

        tracing::debug!(%connection, left = channels.len(), live = guard.outboxes.len(), "disconnected");
        channels
    }

    /// Queues a frame for one connection. Fails if it is gone or its queue is full.
    pub async fn send_to(&self, connection: ConnectionId, frame: String) -> bool {
        let guard = self.inner.read().await;
        guard
            .outboxes
            .get(&connection)
            .is_some_and(|outbox| outbox.try_send(frame).is_ok())
    }

    /// Outboxes of every connection joined to `channel`.
    pub(super) async fn subscribers(&self, channel: &Channel) -> Vec<(ConnectionId, Sender<String>)> {
        let guard = self.inner.read().await;
        let Some(members) = guard.channels.get(channel) else {
            return Vec::new();
        };

        members
            .iter()
            .filter_map(|id| guard.outboxes.get(id).map(|tx| (*id, tx.clone())))
            .collect()
    }

    pub async fn member_count(&self, channel: &Channel) -> usize {
        let guard = self.inner.read().await;
        guard.channels.get(channel).map(HashSet::len).unwrap_or(0)
    }

    pub async fn joined_channels(&self, connection: ConnectionId) -> HashSet<Channel> {
        let guard = self.inner.read().await;
        guard.joined.get(&connection).cloned().unwrap_or_default()
    }

    pub async fn live_connections(&self) -> usize {
        self.inner.read().await.outboxes.len()
    }
}

fn remove_from_channel(inner: &mut Inner, channel: &Channel, connection: ConnectionId) {
    if let Some(members) = inner.channels.get_mut(channel) {
        members.remove(&connection);
        if members.is_empty() {
            inner.channels.remove(channel);
        }
    }
}
