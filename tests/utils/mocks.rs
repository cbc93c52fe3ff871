use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use sensorhub::websockets::{SocketError, SocketWrapper};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// A frame written by the client
enum MockFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Server side of an in-memory socket
pub struct MockSocket {
    inbound: mpsc::UnboundedReceiver<MockFrame>,
    outbound: mpsc::UnboundedSender<String>,
    fail_sends: bool,
}

/// Client side of an in-memory socket
pub struct MockClient {
    to_server: Option<mpsc::UnboundedSender<MockFrame>>,
    from_server: mpsc::UnboundedReceiver<String>,
    serving_task: Option<JoinHandle<()>>,
}

impl MockSocket {
    pub fn pair() -> (MockSocket, MockClient) {
        Self::build(false)
    }

    /// A socket whose writes always fail, as if the peer vanished
    pub fn broken_pair() -> (MockSocket, MockClient) {
        Self::build(true)
    }

    fn build(fail_sends: bool) -> (MockSocket, MockClient) {
        let (to_server, inbound) = mpsc::unbounded_channel();
        let (outbound, from_server) = mpsc::unbounded_channel();
        (
            MockSocket {
                inbound,
                outbound,
                fail_sends,
            },
            MockClient {
                to_server: Some(to_server),
                from_server,
                serving_task: None,
            },
        )
    }
}

#[async_trait]
impl SocketWrapper for MockSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        if self.fail_sends {
            return Err(SocketError::SendFailed("broken pipe".to_string()));
        }
        self.outbound
            .send(message)
            .map_err(|_| SocketError::ConnectionClosed)
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        match self.inbound.recv().await {
            Some(MockFrame::Text(text)) => Ok(Some(text)),
            Some(MockFrame::Binary(bytes)) => Err(SocketError::InvalidMessage(format!(
                "binary frame of {} bytes",
                bytes.len()
            ))),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        Ok(())
    }
}

impl MockClient {
    pub fn attach(&mut self, serving_task: JoinHandle<()>) {
        self.serving_task = Some(serving_task);
    }

    /// Next frame from the server, parsed as JSON
    pub async fn next_frame(&mut self) -> Option<serde_json::Value> {
        let frame = timeout(Duration::from_millis(500), self.from_server.recv())
            .await
            .ok()??;
        Some(serde_json::from_str(&frame).expect("server sent invalid JSON"))
    }

    /// True if no frame arrives within a short window (a closed stream counts)
    pub async fn has_no_frames(&mut self) -> bool {
        !matches!(
            timeout(Duration::from_millis(50), self.from_server.recv()).await,
            Ok(Some(_))
        )
    }

    pub fn say(&self, text: &str) {
        self.send_frame(MockFrame::Text(text.to_string()));
    }

    pub fn say_binary(&self, bytes: &[u8]) {
        self.send_frame(MockFrame::Binary(bytes.to_vec()));
    }

    fn send_frame(&self, frame: MockFrame) {
        if let Some(sender) = &self.to_server {
            let _ = sender.send(frame);
        }
    }

    /// Close the client side and wait for the server to finish cleanup
    pub async fn disconnect(&mut self) {
        self.to_server.take();
        self.wait_closed().await;
    }

    /// Wait for the serving task to end
    pub async fn wait_closed(&mut self) {
        if let Some(task) = self.serving_task.take() {
            timeout(Duration::from_secs(1), task)
                .await
                .expect("serving task did not finish")
                .expect("serving task panicked");
        }
    }
}
