use axum::{
    routing::{get, post},
    Router,
};
use sensorhub::{
    websockets::{channel_stats, health, hub_stats, send_test_event, websocket_handler},
    AppState, Broadcaster, DeferredDispatcher, EventEmitter, InMemoryConnectionRegistry,
    ServerConfig,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensorhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting sensor event hub");

    let config = ServerConfig::from_env();

    let registry = Arc::new(InMemoryConnectionRegistry::new());
    let emitter = EventEmitter::new(Broadcaster::new(registry));
    let (dispatcher, _dispatcher_task) = DeferredDispatcher::spawn(emitter.clone());

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(emitter, dispatcher, config);

    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket_handler))
        .route("/ws/stats", get(hub_stats))
        .route("/ws/stats/:channel", get(channel_stats))
        .route("/ws/test-event", post(send_test_event))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    info!(bind_addr = %bind_addr, "Server listening");
    axum::serve(listener, app).await.unwrap();
}
