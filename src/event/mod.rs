// Event emission
//
// Envelopes describe what changed; the emitter maps them to channels and
// hands them to the broadcaster; the dispatcher runs emissions after the
// caller's transaction has committed.

// Public API - what other modules can use
pub use builder::EventBuilder;
pub use dispatch::{DeferredDispatcher, DispatchHandle, EmitJob, PendingEvents};
pub use emitter::EventEmitter;
pub use envelope::{
    ChangeKind, EntityId, EntityType, EventEnvelope, EventLevel, Payload, DEFAULT_CHANNEL,
};
pub use error::EventError;

// Internal modules
mod builder;
mod dispatch;
mod emitter;
mod envelope;
mod error;
