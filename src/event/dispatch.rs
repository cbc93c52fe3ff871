use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::builder::EventBuilder;
use super::emitter::EventEmitter;
use super::envelope::{ChangeKind, EntityId, EntityType, EventLevel, Payload};
use super::error::EventError;

/// A unit of emission work, holding only already-committed plain data
#[derive(Debug, Clone, PartialEq)]
pub enum EmitJob {
    Entity {
        entity_type: EntityType,
        change_kind: ChangeKind,
        data: Payload,
        entity_id: Option<EntityId>,
        metadata: Option<Payload>,
    },
    System {
        message: String,
        level: EventLevel,
        data: Option<Payload>,
        channel: Option<String>,
    },
}

impl EmitJob {
    pub fn entity(
        entity_type: EntityType,
        change_kind: ChangeKind,
        data: Payload,
        entity_id: Option<EntityId>,
    ) -> Self {
        EmitJob::Entity {
            entity_type,
            change_kind,
            data,
            entity_id,
            metadata: None,
        }
    }

    /// Validate wire names up front so malformed input fails at the call site
    pub fn parse_entity(
        entity_type: &str,
        change_kind: &str,
        data: Payload,
        entity_id: Option<EntityId>,
        metadata: Option<Payload>,
    ) -> Result<Self, EventError> {
        let (entity_type, change_kind) = EventBuilder::parse_kinds(entity_type, change_kind)?;
        Ok(EmitJob::Entity {
            entity_type,
            change_kind,
            data,
            entity_id,
            metadata,
        })
    }

    pub fn system(message: impl Into<String>, level: EventLevel) -> Self {
        EmitJob::System {
            message: message.into(),
            level,
            data: None,
            channel: None,
        }
    }

    /// Attach metadata to an entity job; system jobs carry none
    pub fn with_metadata(mut self, value: Payload) -> Self {
        match &mut self {
            EmitJob::Entity { metadata, .. } => *metadata = Some(value),
            EmitJob::System { .. } => self.ignored("metadata"),
        }
        self
    }

    /// Attach data to a system job; entity jobs take their data up front
    pub fn with_data(mut self, value: Payload) -> Self {
        match &mut self {
            EmitJob::System { data, .. } => *data = Some(value),
            EmitJob::Entity { .. } => self.ignored("data"),
        }
        self
    }

    /// Target a channel for a system job; entity jobs always use their entity's channel
    pub fn on_channel(mut self, target: impl Into<String>) -> Self {
        match &mut self {
            EmitJob::System { channel, .. } => *channel = Some(target.into()),
            EmitJob::Entity { .. } => self.ignored("channel"),
        }
        self
    }

    fn ignored(&self, field: &str) {
        debug!(job = ?self, field = %field, "Field does not apply to this job, ignoring");
    }

    async fn run(self, emitter: &EventEmitter) {
        match self {
            EmitJob::Entity {
                entity_type,
                change_kind,
                data,
                entity_id,
                metadata,
            } => {
                emitter
                    .emit(entity_type, change_kind, data, entity_id, metadata)
                    .await
            }
            EmitJob::System {
                message,
                level,
                data,
                channel,
            } => {
                emitter
                    .emit_system_event(&message, level, data, channel.as_deref())
                    .await
            }
        }
    }
}

/// Cloneable handle request handlers use to schedule emissions.
///
/// Scheduling never waits for delivery and never fails the caller.
#[derive(Clone, Debug)]
pub struct DispatchHandle {
    sender: mpsc::UnboundedSender<EmitJob>,
}

impl DispatchHandle {
    pub fn schedule(&self, job: EmitJob) {
        if let Err(e) = self.sender.send(job) {
            warn!(job = ?e.0, "Event dispatcher stopped, dropping scheduled event");
        }
    }

    /// Open an outbox for a transaction that is about to run
    pub fn begin(&self) -> PendingEvents {
        PendingEvents {
            handle: self.clone(),
            jobs: Vec::new(),
        }
    }
}

/// Runs emission jobs on a background task, off the request path
pub struct DeferredDispatcher {
    emitter: EventEmitter,
    receiver: mpsc::UnboundedReceiver<EmitJob>,
}

impl DeferredDispatcher {
    pub fn new(emitter: EventEmitter) -> (Self, DispatchHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { emitter, receiver }, DispatchHandle { sender })
    }

    /// Spawn the worker. It runs jobs in the order they were scheduled and
    /// stops once every handle has been dropped and the queue is drained.
    pub fn start(self) -> JoinHandle<()> {
        let DeferredDispatcher {
            emitter,
            mut receiver,
        } = self;

        info!("Starting deferred event dispatcher");

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                debug!(job = ?job, "Running deferred emission");
                job.run(&emitter).await;
            }

            info!("Deferred event dispatcher stopped");
        })
    }

    /// Convenience: build, start and return the handle
    pub fn spawn(emitter: EventEmitter) -> (DispatchHandle, JoinHandle<()>) {
        let (dispatcher, handle) = Self::new(emitter);
        (handle, dispatcher.start())
    }
}

/// Emissions staged while a transaction is in flight.
///
/// Nothing is scheduled until [`PendingEvents::commit`] is called after the
/// transaction has committed. Dropping the outbox discards the staged jobs,
/// which is what a rolled-back transaction needs.
#[derive(Debug)]
pub struct PendingEvents {
    handle: DispatchHandle,
    jobs: Vec<EmitJob>,
}

impl PendingEvents {
    pub fn push(&mut self, job: EmitJob) {
        self.jobs.push(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Hand every staged job to the dispatcher, in staging order
    pub fn commit(mut self) -> usize {
        let jobs = std::mem::take(&mut self.jobs);
        let count = jobs.len();
        for job in jobs {
            self.handle.schedule(job);
        }
        debug!(count = count, "Committed pending events");
        count
    }
}

impl Drop for PendingEvents {
    fn drop(&mut self) {
        if !self.jobs.is_empty() {
            debug!(count = self.jobs.len(), "Discarding uncommitted events");
        }
    }
}
