use chrono::Utc;

use super::envelope::{ChangeKind, EntityId, EntityType, EventEnvelope, EventLevel, Payload};
use super::error::EventError;

/// Pure constructors for event envelopes.
///
/// Every envelope is stamped with its creation time here, so the timestamp
/// reflects when the event was produced rather than when it was delivered.
pub struct EventBuilder;

impl EventBuilder {
    /// Build an entity event from wire names, rejecting unknown entity types
    /// and change kinds
    pub fn build_entity_event(
        entity_type: &str,
        change_kind: &str,
        payload: Payload,
        entity_id: Option<EntityId>,
        metadata: Option<Payload>,
    ) -> Result<EventEnvelope, EventError> {
        let (entity_type, change_kind) = Self::parse_kinds(entity_type, change_kind)?;
        Ok(Self::entity_event(
            entity_type,
            change_kind,
            payload,
            entity_id,
            metadata,
        ))
    }

    /// Validate entity type and change kind wire names, entity type first
    pub fn parse_kinds(
        entity_type: &str,
        change_kind: &str,
    ) -> Result<(EntityType, ChangeKind), EventError> {
        Ok((EntityType::parse(entity_type)?, ChangeKind::parse(change_kind)?))
    }

    /// Build an entity event from already-validated kinds
    pub fn entity_event(
        entity_type: EntityType,
        change_kind: ChangeKind,
        payload: Payload,
        entity_id: Option<EntityId>,
        metadata: Option<Payload>,
    ) -> EventEnvelope {
        EventEnvelope::EntityEvent {
            entity_type,
            event_type: change_kind,
            entity_id,
            data: payload,
            timestamp: Utc::now(),
            metadata: metadata.unwrap_or_default(),
        }
    }

    pub fn build_system_event(
        message: impl Into<String>,
        level: EventLevel,
        data: Option<Payload>,
    ) -> EventEnvelope {
        EventEnvelope::SystemEvent {
            level,
            message: message.into(),
            data: data.unwrap_or_default(),
            timestamp: Utc::now(),
        }
    }
}
