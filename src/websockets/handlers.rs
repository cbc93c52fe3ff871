use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use crate::event::{EmitJob, EventLevel, Payload, DEFAULT_CHANNEL};
use crate::shared::{AppError, AppState};

use super::messages::{ChannelStats, HubStats};

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelStatsResponse {
    pub channel: String,
    pub stats: ChannelStats,
}

#[derive(Debug, Deserialize)]
pub struct TestEventQuery {
    pub channel: Option<String>,
    pub message: Option<String>,
    pub level: Option<EventLevel>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestEventResponse {
    pub message: String,
    pub data: String,
}

/// HTTP handler for statistics across all channels
///
/// GET /ws/stats
#[instrument(name = "hub_stats", skip(state))]
pub async fn hub_stats(State(state): State<AppState>) -> Json<HubStats> {
    let registry = state.registry();
    let mut stats = HubStats::default();

    for channel in registry.list_channels().await {
        let channel_stats = registry.channel_stats(&channel).await;
        // A channel can empty out between listing and reading it
        if channel_stats.connections > 0 {
            stats.channels.insert(channel, channel_stats);
        }
    }
    stats.total_channels = stats.channels.len();

    info!(total_channels = stats.total_channels, "Hub stats requested");
    Json(stats)
}

/// HTTP handler for one channel's statistics
///
/// GET /ws/stats/:channel
#[instrument(name = "channel_stats", skip(state))]
pub async fn channel_stats(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Json<ChannelStatsResponse> {
    let stats = state.registry().channel_stats(&channel).await;

    Json(ChannelStatsResponse { channel, stats })
}

/// HTTP handler that emits a test system event (development aid)
///
/// POST /ws/test-event?channel=general&message=hello
/// The event is delivered by the deferred dispatcher after the response.
#[instrument(name = "send_test_event", skip(state))]
pub async fn send_test_event(
    State(state): State<AppState>,
    Query(query): Query<TestEventQuery>,
) -> Result<Json<TestEventResponse>, AppError> {
    if !state.config.test_events_enabled {
        return Err(AppError::Forbidden("Test events are disabled".to_string()));
    }

    let channel = query.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
    let message = query.message.unwrap_or_else(|| "Test event".to_string());
    if channel.trim().is_empty() {
        return Err(AppError::BadRequest("Channel must not be empty".to_string()));
    }

    let mut data = Payload::new();
    data.insert("test".to_string(), json!(true));
    state.dispatcher.schedule(
        EmitJob::system(message.clone(), query.level.unwrap_or_default())
            .with_data(data)
            .on_channel(channel.clone()),
    );

    info!(channel = %channel, "Test event scheduled");

    Ok(Json(TestEventResponse {
        message: format!("Test event sent to channel '{}'", channel),
        data: message,
    }))
}

pub async fn health() -> &'static str {
    "ok"
}
