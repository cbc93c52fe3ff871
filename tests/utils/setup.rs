use std::sync::Arc;
use tokio::task::JoinHandle;

use sensorhub::{
    websockets::{serve_connection, LoggingMessageHandler, SubscribeQuery},
    Broadcaster, ConnectionRegistry, DeferredDispatcher, DispatchHandle, EventEmitter,
    InMemoryConnectionRegistry,
};

use super::mocks::{MockClient, MockSocket};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub emitter: EventEmitter,
    pub dispatcher: DispatchHandle,
    pub _dispatcher_task: JoinHandle<()>,
}

pub struct TestSetupBuilder {
    subscribers: Vec<(String, Option<String>)>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            subscribers: vec![],
        }
    }

    pub fn with_subscriber(mut self, channel: &str, user_id: Option<&str>) -> Self {
        self.subscribers
            .push((channel.to_string(), user_id.map(|s| s.to_string())));
        self
    }

    /// Build the hub and connect every configured subscriber. Clients are
    /// returned with their greeting frames already consumed.
    pub async fn build(self) -> (TestSetup, Vec<MockClient>) {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let emitter = EventEmitter::new(Broadcaster::new(registry.clone()));
        let (dispatcher, dispatcher_task) = DeferredDispatcher::spawn(emitter.clone());

        let setup = TestSetup {
            registry,
            emitter,
            dispatcher,
            _dispatcher_task: dispatcher_task,
        };

        let mut clients = Vec::new();
        for (channel, user_id) in self.subscribers {
            let mut client = setup.connect(&channel, user_id.as_deref(), true).await;
            client.next_frame().await.expect("missing connection ack");
            client.next_frame().await.expect("missing channel stats");
            clients.push(client);
        }

        (setup, clients)
    }
}

impl TestSetup {
    /// Connect a client; greeting frames are left for the caller to read.
    /// The connection is registered by the time its ack frame arrives.
    pub async fn connect(&self, channel: &str, user_id: Option<&str>, stats: bool) -> MockClient {
        let (socket, client) = MockSocket::pair();
        self.serve(socket, client, channel, user_id, stats).await
    }

    /// Connect a client whose socket writes always fail
    pub async fn connect_broken(&self, channel: &str) -> MockClient {
        let (socket, client) = MockSocket::broken_pair();
        self.serve(socket, client, channel, None, false).await
    }

    async fn serve(
        &self,
        socket: MockSocket,
        mut client: MockClient,
        channel: &str,
        user_id: Option<&str>,
        stats: bool,
    ) -> MockClient {
        let query = SubscribeQuery {
            channel: channel.to_string(),
            user_id: user_id.map(|s| s.to_string()),
            stats,
        };

        let broadcaster = self.emitter.broadcaster().clone();
        let task = tokio::spawn(serve_connection(
            Box::new(socket),
            query,
            broadcaster,
            Arc::new(LoggingMessageHandler),
        ));
        client.attach(task);
        client
    }

    pub async fn connections_on(&self, channel: &str) -> usize {
        self.registry.channel_stats(channel).await.connections
    }
}
