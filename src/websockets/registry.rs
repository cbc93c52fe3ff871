use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::messages::{ChannelStats, SubscriberInfo};

/// Unique identity of a registered connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle to a connection's outbound stream.
///
/// Frames pushed here are written to the socket by the connection's own
/// serving task. Once that task ends the receiving side is dropped and every
/// further send fails.
///
/// The stream is unbounded: a peer that stops reading while keeping its socket
/// open is never evicted, and its queued frames grow until it disconnects.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<String>,
}

impl Connection {
    /// Create a handle and the receiver the serving task drains
    pub fn open() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::new(),
                sender,
            },
            receiver,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a text frame; fails if the stream is gone
    pub fn send_text(&self, message: String) -> Result<(), mpsc::error::SendError<String>> {
        self.sender.send(message)
    }
}

/// Per-connection metadata kept alongside the channel membership
#[derive(Debug, Clone)]
struct ConnectionRecord {
    connection: Connection,
    channel: String,
    subscriber_id: Option<String>,
    connected_at: DateTime<Utc>,
}

#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Add a connection to a channel, creating the channel if needed
    async fn register(&self, connection: Connection, channel: &str, subscriber_id: Option<String>);

    /// Remove a connection. Unknown connections are ignored.
    async fn unregister(&self, connection_id: ConnectionId);

    /// Snapshot of a channel's subscribers; zero stats for unknown channels
    async fn channel_stats(&self, channel: &str) -> ChannelStats;

    async fn list_channels(&self) -> BTreeSet<String>;

    /// Stable copy of the connections currently on a channel
    async fn snapshot(&self, channel: &str) -> Vec<Connection>;

    async fn connection_count(&self) -> usize;
}

#[derive(Default)]
struct RegistryState {
    // channel -> connection ids
    channels: HashMap<String, HashSet<ConnectionId>>,
    // connection id -> record
    connections: HashMap<ConnectionId, ConnectionRecord>,
}

/// Registry holding both maps behind one lock so membership and metadata
/// always change together
#[derive(Clone, Default)]
pub struct InMemoryConnectionRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(&self, connection: Connection, channel: &str, subscriber_id: Option<String>) {
        let id = connection.id();
        let mut state = self.state.write().await;

        // Re-registering moves the connection rather than duplicating it
        if let Some(previous) = state.connections.remove(&id) {
            remove_from_channel(&mut state.channels, &previous.channel, id);
        }

        state
            .channels
            .entry(channel.to_string())
            .or_default()
            .insert(id);
        state.connections.insert(
            id,
            ConnectionRecord {
                connection,
                channel: channel.to_string(),
                subscriber_id: subscriber_id.clone(),
                connected_at: Utc::now(),
            },
        );

        let total = state.channels.get(channel).map_or(0, |c| c.len());
        info!(
            channel = %channel,
            connection_id = %id,
            subscriber_id = ?subscriber_id,
            total_connections = total,
            "Connection registered"
        );
    }

    async fn unregister(&self, connection_id: ConnectionId) {
        let mut state = self.state.write().await;

        let Some(record) = state.connections.remove(&connection_id) else {
            debug!(connection_id = %connection_id, "Unregister of unknown connection ignored");
            return;
        };

        remove_from_channel(&mut state.channels, &record.channel, connection_id);

        info!(
            channel = %record.channel,
            connection_id = %connection_id,
            "Connection unregistered"
        );
    }

    async fn channel_stats(&self, channel: &str) -> ChannelStats {
        let state = self.state.read().await;

        let Some(ids) = state.channels.get(channel) else {
            return ChannelStats::default();
        };

        let mut users: Vec<SubscriberInfo> = ids
            .iter()
            .filter_map(|id| state.connections.get(id))
            .map(|record| SubscriberInfo {
                user_id: record.subscriber_id.clone(),
                connected_at: record.connected_at,
            })
            .collect();
        users.sort_by_key(|u| u.connected_at);

        ChannelStats {
            connections: ids.len(),
            users,
        }
    }

    async fn list_channels(&self) -> BTreeSet<String> {
        let state = self.state.read().await;
        state.channels.keys().cloned().collect()
    }

    async fn snapshot(&self, channel: &str) -> Vec<Connection> {
        let state = self.state.read().await;
        match state.channels.get(channel) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| state.connections.get(id))
                .map(|record| record.connection.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }
}

/// Drop an id from its channel, removing the channel once it is empty
fn remove_from_channel(
    channels: &mut HashMap<String, HashSet<ConnectionId>>,
    channel: &str,
    id: ConnectionId,
) {
    if let Some(ids) = channels.get_mut(channel) {
        ids.remove(&id);
        if ids.is_empty() {
            channels.remove(channel);
        }
    }
}
