use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::registry::{Connection, ConnectionId, ConnectionRegistry};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    #[error("Failed to serialize message: {0}")]
    Serialization(String),
}

/// Pushes serialized messages to registered connections.
///
/// Sends only queue a frame on the connection's outbound stream, so a slow
/// socket never stalls delivery to the rest of a channel. A connection whose
/// stream is gone is evicted from the registry as soon as a send to it fails.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<dyn ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Serialize a message and send it to a single connection
    pub async fn send_to<T: Serialize + ?Sized>(
        &self,
        connection: &Connection,
        message: &T,
    ) -> Result<(), DeliveryError> {
        let text = serialize(message)?;
        self.send_text(connection, text).await
    }

    /// Send a message to every connection currently on a channel
    pub async fn broadcast<T: Serialize + ?Sized>(&self, channel: &str, message: &T) {
        let connections = self.registry.snapshot(channel).await;
        if connections.is_empty() {
            debug!(channel = %channel, "No connections on channel, nothing to broadcast");
            return;
        }

        let text = match serialize(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(channel = %channel, error = %e, "Dropping broadcast");
                return;
            }
        };

        let mut delivered = 0;
        let mut evicted = 0;
        for connection in &connections {
            match self.send_text(connection, text.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => evicted += 1,
            }
        }

        debug!(
            channel = %channel,
            delivered = delivered,
            evicted = evicted,
            "Broadcast complete"
        );
    }

    /// Send a message to every channel currently known
    pub async fn broadcast_all<T: Serialize + ?Sized>(&self, message: &T) {
        for channel in self.registry.list_channels().await {
            self.broadcast(&channel, message).await;
        }
    }

    async fn send_text(&self, connection: &Connection, text: String) -> Result<(), DeliveryError> {
        if connection.send_text(text).is_err() {
            let connection_id = connection.id();
            warn!(
                connection_id = %connection_id,
                "Send failed, evicting connection"
            );
            self.registry.unregister(connection_id).await;
            return Err(DeliveryError::ConnectionClosed(connection_id));
        }
        Ok(())
    }
}

fn serialize<T: Serialize + ?Sized>(message: &T) -> Result<String, DeliveryError> {
    serde_json::to_string(message).map_err(|e| DeliveryError::Serialization(e.to_string()))
}
