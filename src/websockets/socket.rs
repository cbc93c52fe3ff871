use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::ServerMessage;
use super::registry::ConnectionId;

const UNPROCESSABLE_MESSAGE: &str = "Error processing message";

/// Simple WebSocket abstraction - all we care about is send/receive
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text message to the client
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Receive the next text message from the client (None if connection closed)
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Handler for incoming WebSocket messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// An `InvalidMessage` error is reported back to the client and the
    /// connection stays open
    async fn handle_message(
        &self,
        connection_id: ConnectionId,
        channel: &str,
        message: String,
    ) -> Result<(), SocketError>;
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Binary(_))) => {
                    return Err(SocketError::InvalidMessage("binary frame".to_string()))
                }
                Some(Ok(_)) => continue, // Ignore ping/pong
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// Clients have nothing to say to the hub yet; their messages are only logged
pub struct LoggingMessageHandler;

#[async_trait]
impl MessageHandler for LoggingMessageHandler {
    async fn handle_message(
        &self,
        connection_id: ConnectionId,
        channel: &str,
        message: String,
    ) -> Result<(), SocketError> {
        info!(
            connection_id = %connection_id,
            channel = %channel,
            message = %message,
            "Received message"
        );
        Ok(())
    }
}

/// Serving task of one connection.
///
/// Pumps frames queued by the broadcaster into the socket and feeds inbound
/// frames to the message handler, until either side goes away.
pub struct ConnectionTask {
    pub connection_id: ConnectionId,
    pub channel: String,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::UnboundedReceiver<String>,
    message_handler: Arc<dyn MessageHandler>,
}

impl ConnectionTask {
    pub fn new(
        connection_id: ConnectionId,
        channel: String,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::UnboundedReceiver<String>,
        message_handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            connection_id,
            channel,
            socket,
            outbound_receiver,
            message_handler,
        }
    }

    /// Run until disconnect. The outbound receiver is dropped on return, so
    /// later sends to this connection fail.
    pub async fn run(mut self) -> Result<(), SocketError> {
        loop {
            tokio::select! {
                // Handle outbound messages (from our app to client)
                msg = self.outbound_receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.socket.send_message(message).await?
                        }
                        None => break, // Channel closed, disconnect
                    }
                }

                // Handle inbound messages (from client to our app)
                msg = self.socket.receive_message() => {
                    match msg {
                        Ok(Some(message)) => {
                            let handled = self
                                .message_handler
                                .handle_message(self.connection_id, &self.channel, message)
                                .await;
                            match handled {
                                Err(SocketError::InvalidMessage(reason)) => {
                                    self.reject_message(&reason).await?
                                }
                                other => other?,
                            }
                        }
                        Ok(None) => break, // Client disconnected
                        Err(SocketError::InvalidMessage(reason)) => {
                            self.reject_message(&reason).await?
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        debug!(connection_id = %self.connection_id, "Closing socket");
        let _ = self.socket.close().await;
        Ok(())
    }

    /// Tell the client its message could not be processed
    async fn reject_message(&mut self, reason: &str) -> Result<(), SocketError> {
        warn!(
            connection_id = %self.connection_id,
            reason = %reason,
            "Could not process client message"
        );
        let reply = serde_json::to_string(&ServerMessage::error(UNPROCESSABLE_MESSAGE))
            .map_err(|e| SocketError::SendFailed(e.to_string()))?;
        self.socket.send_message(reply).await
    }
}
