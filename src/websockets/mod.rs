// Public API
pub use broadcaster::{Broadcaster, DeliveryError};
pub use handler::{serve_connection, websocket_handler, SubscribeQuery};
pub use handlers::{channel_stats, health, hub_stats, send_test_event};
pub use messages::{ChannelStats, HubStats, ServerMessage, SubscriberInfo};
pub use registry::{Connection, ConnectionId, ConnectionRegistry, InMemoryConnectionRegistry};
pub use socket::{
    ConnectionTask, LoggingMessageHandler, MessageHandler, SocketError, SocketWrapper,
};

// Internal modules
mod broadcaster;
mod handler;
mod handlers;
mod messages;
mod registry;
mod socket;
