use thiserror::Error;

/// Malformed emission input. This is the only error the emitter surfaces to
/// its callers; delivery problems are absorbed and logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Invalid entity type: {0}")]
    InvalidEntityType(String),

    #[error("Invalid change kind: {0}")]
    InvalidChangeKind(String),
}
