use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::error::EventError;

/// Opaque key/value mapping carried by events
pub type Payload = Map<String, Value>;

/// Channel used for system events when the caller does not pick one
pub const DEFAULT_CHANNEL: &str = "general";

/// Kinds of entity that can announce changes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
    Sensor,
    Reading,
    Location,
    Anomaly,
    Prediction,
}

impl EntityType {
    /// Channel every event of this entity kind is delivered on
    pub fn channel(&self) -> &'static str {
        match self {
            EntityType::Sensor => "sensors",
            EntityType::Reading => "readings",
            EntityType::Location => "locations",
            EntityType::Anomaly => "anomalies",
            EntityType::Prediction => "predictions",
        }
    }

    pub fn parse(value: &str) -> Result<Self, EventError> {
        value
            .parse()
            .map_err(|_| EventError::InvalidEntityType(value.to_string()))
    }
}

/// What happened to the entity
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn parse(value: &str) -> Result<Self, EventError> {
        value
            .parse()
            .map_err(|_| EventError::InvalidChangeKind(value.to_string()))
    }
}

/// Severity of a system event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventLevel {
    #[default]
    Info,
    Warning,
    Error,
}

/// Identifier of the changed entity, numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{}", id),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

/// Structured message delivered to channel subscribers.
///
/// Envelopes are built once per emission and never mutated afterwards; they
/// are shared read-only by every send of a broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    EntityEvent {
        entity_type: EntityType,
        event_type: ChangeKind,
        entity_id: Option<EntityId>,
        data: Payload,
        timestamp: DateTime<Utc>,
        #[serde(default)]
        metadata: Payload,
    },
    SystemEvent {
        level: EventLevel,
        message: String,
        #[serde(default)]
        data: Payload,
        timestamp: DateTime<Utc>,
    },
}

impl EventEnvelope {
    pub fn kind(&self) -> &'static str {
        match self {
            EventEnvelope::EntityEvent { .. } => "entity_event",
            EventEnvelope::SystemEvent { .. } => "system_event",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EventEnvelope::EntityEvent { timestamp, .. } => *timestamp,
            EventEnvelope::SystemEvent { timestamp, .. } => *timestamp,
        }
    }
}
