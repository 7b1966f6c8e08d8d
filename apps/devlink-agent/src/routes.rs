//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers：
//! - 健康检查与可观测：/health, /metrics, /events
//! - DeviceLink：/links, /links/{namespace}/{name}
//! - 集群资源：/nodes/{name}, /models/{name}, /secrets/*, /configmaps/*
//! - Device 查询：/devices/{namespace}/{name}

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, put},
};

/// 创建 API 路由
///
/// 由调用方同时挂载在 / 与 /api/ 两种前缀下
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/events", get(list_events))
        .route("/links", get(list_links))
        .route(
            "/links/:namespace/:name",
            get(get_link).put(apply_link).delete(delete_link),
        )
        .route("/nodes/:name", put(apply_node).delete(delete_node))
        .route("/models/:name", put(apply_model).delete(delete_model))
        .route(
            "/secrets/:namespace/:name",
            put(apply_secret).delete(delete_secret),
        )
        .route(
            "/configmaps/:namespace/:name",
            put(apply_configmap).delete(delete_configmap),
        )
        .route("/devices/:namespace/:name", get(get_device))
}
