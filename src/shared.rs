use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::event::{DispatchHandle, EventEmitter, EventError};
use crate::websockets::ConnectionRegistry;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub emitter: EventEmitter,
    pub dispatcher: DispatchHandle,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(emitter: EventEmitter, dispatcher: DispatchHandle, config: ServerConfig) -> Self {
        Self {
            emitter,
            dispatcher,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        self.emitter.broadcaster().registry()
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<EventError> for AppError {
    fn from(e: EventError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::event::DeferredDispatcher;
    use crate::websockets::{Broadcaster, InMemoryConnectionRegistry};

    /// Builder for creating AppState with overrides for testing.
    /// `build` spawns the dispatcher, so call it inside a tokio runtime.
    pub struct AppStateBuilder {
        registry: Option<Arc<dyn ConnectionRegistry>>,
        config: ServerConfig,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                registry: None,
                config: ServerConfig::default(),
            }
        }

        pub fn with_registry(mut self, registry: Arc<dyn ConnectionRegistry>) -> Self {
            self.registry = Some(registry);
            self
        }

        pub fn with_test_events(mut self, enabled: bool) -> Self {
            self.config.test_events_enabled = enabled;
            self
        }

        pub fn build(self) -> AppState {
            let registry = self
                .registry
                .unwrap_or_else(|| Arc::new(InMemoryConnectionRegistry::new()));
            let emitter = EventEmitter::new(Broadcaster::new(registry));
            let (dispatcher, _worker) = DeferredDispatcher::spawn(emitter.clone());
            AppState::new(emitter, dispatcher, self.config)
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    #[tokio::test]
    async fn test_event_error_maps_to_bad_request() {
        let response =
            AppError::from(EventError::InvalidEntityType("widget".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Invalid entity type: widget");
    }
}
