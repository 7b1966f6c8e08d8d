//! 健康检查、连接指标与最近告警事件。
//!
//! - GET /health
//! - GET /metrics
//! - GET /events

use crate::AppState;
use crate::utils::response::ok;
use api_contract::{AdaptorMetricsDto, EventDto, MetricsSnapshotDto};
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_metrics(State(state): State<AppState>) -> Response {
    let adaptors = state
        .metrics
        .snapshot()
        .into_iter()
        .map(|snapshot| AdaptorMetricsDto {
            adaptor: snapshot.adaptor,
            connect_errors: snapshot.connect_errors,
            send_errors: snapshot.send_errors,
            send_latency_us_total: snapshot.send_latency_us_total,
            send_latency_count: snapshot.send_latency_count,
            connections: snapshot.connections,
        })
        .collect();
    ok(MetricsSnapshotDto {
        node_name: state.node_name.clone(),
        registered_adaptors: state.connections.adaptor_names(),
        adaptors,
    })
}

pub async fn list_events(State(state): State<AppState>) -> Response {
    let events: Vec<EventDto> = state
        .events
        .snapshot()
        .into_iter()
        .map(|record| EventDto {
            namespace: record.involved.namespace,
            name: record.involved.name,
            event_type: record.event_type,
            reason: record.reason,
            message: record.message,
            timestamp_ms: record.timestamp_ms,
        })
        .collect();
    ok(events)
}
