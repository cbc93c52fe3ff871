// Library crate for the sensor event hub
// This file exposes the public API for the server binary and integration tests

pub mod config;
pub mod event;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use config::ServerConfig;
pub use event::{
    ChangeKind, DeferredDispatcher, DispatchHandle, EmitJob, EntityId, EntityType, EventBuilder,
    EventEmitter, EventEnvelope, EventError, EventLevel, Payload, PendingEvents,
};
pub use shared::{AppError, AppState};
pub use websockets::{
    Broadcaster, Connection, ConnectionId, ConnectionRegistry, InMemoryConnectionRegistry,
};
