use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A subscriber as reported in channel statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberInfo {
    pub user_id: Option<String>,
    pub connected_at: DateTime<Utc>,
}

/// Point-in-time statistics for one channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub connections: usize,
    pub users: Vec<SubscriberInfo>,
}

/// Statistics for every tracked channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubStats {
    pub total_channels: usize,
    pub channels: BTreeMap<String, ChannelStats>,
}

/// Administrative messages the hub sends to a single connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a freshly accepted connection
    Connection {
        status: String,
        channel: String,
        timestamp: DateTime<Utc>,
    },
    /// Snapshot of the channel the connection joined
    ChannelStats { channel: String, stats: ChannelStats },
    /// A client message could not be processed; the connection stays open
    Error { message: String },
}

impl ServerMessage {
    pub fn connected(channel: &str) -> Self {
        Self::Connection {
            status: "connected".to_string(),
            channel: channel.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn channel_stats(channel: &str, stats: ChannelStats) -> Self {
        Self::ChannelStats {
            channel: channel.to_string(),
            stats,
        }
    }

    pub fn error(message: &str) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }
}
