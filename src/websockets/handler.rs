use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::event::DEFAULT_CHANNEL;
use crate::shared::AppState;

use super::broadcaster::Broadcaster;
use super::messages::ServerMessage;
use super::registry::Connection;
use super::socket::{ConnectionTask, LoggingMessageHandler, MessageHandler, SocketWrapper};

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_send_stats() -> bool {
    true
}

/// Query parameters for WebSocket connection
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeQuery {
    #[serde(default = "default_channel")]
    pub channel: String,
    pub user_id: Option<String>,
    /// Send a channel_stats snapshot right after the acknowledgement
    #[serde(default = "default_send_stats")]
    pub stats: bool,
}

impl Default for SubscribeQuery {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            user_id: None,
            stats: default_send_stats(),
        }
    }
}

/// WebSocket endpoint
///
/// GET /ws?channel=sensors&user_id=abc&stats=true
/// Any channel name is accepted; subscribers are not authenticated here.
#[instrument(name = "websocket_handler", skip(state, ws))]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<SubscribeQuery>,
    State(state): State<AppState>,
) -> Response {
    info!(
        channel = %query.channel,
        user_id = ?query.user_id,
        "WebSocket connection requested"
    );

    let broadcaster = state.emitter.broadcaster().clone();
    ws.on_upgrade(move |socket| async move {
        serve_connection(
            Box::new(socket),
            query,
            broadcaster,
            Arc::new(LoggingMessageHandler),
        )
        .await
    })
}

/// Serve one accepted connection from registration to cleanup.
///
/// Acknowledges the connection, registers it, then runs its serving task.
/// Removing the connection from the registry is always the last thing that
/// happens.
pub async fn serve_connection(
    socket: Box<dyn SocketWrapper>,
    query: SubscribeQuery,
    broadcaster: Broadcaster,
    message_handler: Arc<dyn MessageHandler>,
) {
    let SubscribeQuery {
        channel,
        user_id,
        stats,
    } = query;
    let registry = broadcaster.registry().clone();

    let (connection, outbound_receiver) = Connection::open();
    let connection_id = connection.id();

    // The ack is queued before registration so no broadcast can overtake it
    let mut greeted = broadcaster
        .send_to(&connection, &ServerMessage::connected(&channel))
        .await
        .is_ok();

    registry
        .register(connection.clone(), &channel, user_id.clone())
        .await;

    info!(
        channel = %channel,
        connection_id = %connection_id,
        user_id = ?user_id,
        "WebSocket connection established"
    );

    if greeted && stats {
        let snapshot = registry.channel_stats(&channel).await;
        greeted = broadcaster
            .send_to(&connection, &ServerMessage::channel_stats(&channel, snapshot))
            .await
            .is_ok();
    }
    if !greeted {
        warn!(connection_id = %connection_id, "Failed to greet connection");
    }
    drop(connection);

    let task = ConnectionTask::new(
        connection_id,
        channel.clone(),
        socket,
        outbound_receiver,
        message_handler,
    );

    match task.run().await {
        Ok(()) => {
            info!(
                channel = %channel,
                connection_id = %connection_id,
                "WebSocket connection closed cleanly"
            );
        }
        Err(e) => {
            warn!(
                channel = %channel,
                connection_id = %connection_id,
                error = %e,
                "WebSocket connection error"
            );
        }
    }

    registry.unregister(connection_id).await;
    debug!(connection_id = %connection_id, "Connection cleanup complete");
}
