use tracing::info;

use super::builder::EventBuilder;
use super::envelope::{ChangeKind, EntityId, EntityType, EventLevel, Payload, DEFAULT_CHANNEL};
use super::error::EventError;
use crate::websockets::Broadcaster;

/// Single entry point for announcing entity changes and system conditions.
///
/// Emission never fails because of delivery: closed subscribers are evicted
/// by the broadcaster and logged. The only error returned is malformed input.
#[derive(Clone)]
pub struct EventEmitter {
    broadcaster: Broadcaster,
}

impl EventEmitter {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self { broadcaster }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Emit an entity event from wire names
    pub async fn emit_entity_event(
        &self,
        entity_type: &str,
        change_kind: &str,
        payload: Payload,
        entity_id: Option<EntityId>,
        metadata: Option<Payload>,
    ) -> Result<(), EventError> {
        let (entity_type, change_kind) = EventBuilder::parse_kinds(entity_type, change_kind)?;
        self.emit(entity_type, change_kind, payload, entity_id, metadata)
            .await;
        Ok(())
    }

    /// Emit an entity event on the entity's channel
    pub async fn emit(
        &self,
        entity_type: EntityType,
        change_kind: ChangeKind,
        payload: Payload,
        entity_id: Option<EntityId>,
        metadata: Option<Payload>,
    ) {
        let channel = entity_type.channel();
        let envelope = EventBuilder::entity_event(
            entity_type,
            change_kind,
            payload,
            entity_id.clone(),
            metadata,
        );

        self.broadcaster.broadcast(channel, &envelope).await;

        info!(
            channel = %channel,
            entity_type = %entity_type,
            event_type = %change_kind,
            entity_id = ?entity_id,
            "Entity event emitted"
        );
    }

    /// Emit a system event; `channel` defaults to "general"
    pub async fn emit_system_event(
        &self,
        message: &str,
        level: EventLevel,
        data: Option<Payload>,
        channel: Option<&str>,
    ) {
        let channel = channel.unwrap_or(DEFAULT_CHANNEL);
        let envelope = EventBuilder::build_system_event(message, level, data);

        self.broadcaster.broadcast(channel, &envelope).await;

        info!(
            channel = %channel,
            level = %level,
            message = %message,
            "System event emitted"
        );
    }

    pub async fn emit_sensor_event(
        &self,
        change_kind: ChangeKind,
        data: Payload,
        id: Option<EntityId>,
        metadata: Option<Payload>,
    ) {
        self.emit(EntityType::Sensor, change_kind, data, id, metadata)
            .await
    }

    pub async fn emit_reading_event(
        &self,
        change_kind: ChangeKind,
        data: Payload,
        id: Option<EntityId>,
        metadata: Option<Payload>,
    ) {
        self.emit(EntityType::Reading, change_kind, data, id, metadata)
            .await
    }

    pub async fn emit_location_event(
        &self,
        change_kind: ChangeKind,
        data: Payload,
        id: Option<EntityId>,
        metadata: Option<Payload>,
    ) {
        self.emit(EntityType::Location, change_kind, data, id, metadata)
            .await
    }

    pub async fn emit_anomaly_event(
        &self,
        change_kind: ChangeKind,
        data: Payload,
        id: Option<EntityId>,
        metadata: Option<Payload>,
    ) {
        self.emit(EntityType::Anomaly, change_kind, data, id, metadata)
            .await
    }

    pub async fn emit_prediction_event(
        &self,
        change_kind: ChangeKind,
        data: Payload,
        id: Option<EntityId>,
        metadata: Option<Payload>,
    ) {
        self.emit(EntityType::Prediction, change_kind, data, id, metadata)
            .await
    }
}
