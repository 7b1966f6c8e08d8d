//! 节点代理：集群校验循环、节点绑定循环、适配器注册表与本地资源 API。

mod adaptors;
mod handlers;
mod middleware;
mod routes;
mod utils;

use axum::Router;
use devlink_config::AppConfig;
use devlink_connection::ConnectionManager;
use devlink_controller::{
    BinderTrigger, ClusterValidator, Controller, ControllerConfig, NodeBinder, ValidatorTrigger,
    requeue_on_adaptor_events,
};
use devlink_storage::{InMemoryStore, ResourceStore};
use devlink_telemetry::{LimbMetrics, RecentEvents, init_tracing};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub node_name: String,
    pub store: Arc<dyn ResourceStore>,
    pub connections: Arc<ConnectionManager>,
    pub metrics: Arc<LimbMetrics>,
    pub events: Arc<RecentEvents>,
}

impl AppState {
    pub fn new(node_name: impl Into<String>, store: Arc<dyn ResourceStore>) -> Self {
        let metrics = Arc::new(LimbMetrics::new());
        Self {
            node_name: node_name.into(),
            store,
            connections: Arc::new(ConnectionManager::new(metrics.clone())),
            metrics,
            events: Arc::new(RecentEvents::default()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let store: Arc<dyn ResourceStore> = Arc::new(InMemoryStore::new());
    let state = AppState::new(config.node_name.clone(), store.clone());
    let transports = adaptors::register_adaptors(&config, &state.connections).await?;

    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    if config.brain_enabled {
        let brain = Controller::new(
            controller_config("brain", config.brain_workers, &config),
            store.clone(),
            Arc::new(ClusterValidator::new(store.clone())),
            Arc::new(ValidatorTrigger::new(store.clone())),
        );
        tasks.spawn(brain.run(cancel.clone()));
    }
    if config.limb_enabled {
        let limb = Controller::new(
            controller_config("limb", config.limb_workers, &config),
            store.clone(),
            Arc::new(NodeBinder::new(
                config.node_name.clone(),
                store.clone(),
                state.connections.clone(),
                state.events.clone(),
                config.reference_retry(),
            )),
            Arc::new(BinderTrigger::new(config.node_name.clone(), store.clone())),
        );
        tasks.spawn(requeue_on_adaptor_events(
            config.node_name.clone(),
            store.clone(),
            state.connections.clone(),
            limb.queue(),
            cancel.clone(),
        ));
        tasks.spawn(limb.run(cancel.clone()));
    }

    let app = build_app(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(
        target: "devlink.api",
        node = %config.node_name,
        addr = %config.http_addr,
        brain = config.brain_enabled,
        limb = config.limb_enabled,
        "agent started"
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target: "devlink.api", error = %err, "unable to listen for shutdown signal");
        }
        shutdown.cancel();
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await?;

    // 停止调谐后关闭全部连接
    cancel.cancel();
    while tasks.join_next().await.is_some() {}
    for name in state.connections.adaptor_names() {
        state.connections.unregister_adaptor(&name).await;
    }
    for transport in transports {
        transport.abort();
    }
    info!(target: "devlink.api", "agent stopped");
    Ok(())
}

fn controller_config(name: &str, workers: usize, config: &AppConfig) -> ControllerConfig {
    ControllerConfig {
        workers,
        reconcile_timeout: config.reconcile_timeout(),
        requeue_base: config.requeue_base(),
        requeue_max: config.requeue_max(),
        ..ControllerConfig::new(name)
    }
}

/// 路由同时挂载在 / 与 /api 下。
pub fn build_app(state: AppState) -> Router {
    let api = routes::create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_context))
                .layer(TraceLayer::new_for_http()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> (AppState, Router) {
        let store: Arc<dyn ResourceStore> = Arc::new(InMemoryStore::new());
        let state = AppState::new("edge-1", store);
        (state.clone(), build_app(state))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    fn lamp(rate: u64) -> Value {
        json!({
            "labels": {"room": "kitchen"},
            "spec": {
                "adaptor": {"node": "edge-1", "name": "log"},
                "model": {"group": "devices.example.io", "version": "v1", "kind": "DummyDevice"},
                "template": {"spec": {"rate": rate}}
            },
            "status": {"nodeName": "forged"}
        })
    }

    #[tokio::test]
    async fn health_is_served_under_both_prefixes() {
        let (_, app) = app();
        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-trace-id"));

        let (status, body) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn link_put_creates_then_replaces_spec() {
        let (_, app) = app();
        let (status, body) = call(&app, "PUT", "/api/links/default/lamp", Some(lamp(5))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["metadata"]["name"], "lamp");
        assert!(body["data"]["status"].get("nodeName").is_none());
        let first = body["data"]["metadata"]["resourceVersion"].as_u64().expect("version");

        let (status, body) = call(&app, "PUT", "/links/default/lamp", Some(lamp(10))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["spec"]["template"]["spec"]["rate"], 10);
        assert!(body["data"]["metadata"]["resourceVersion"].as_u64().expect("version") > first);

        let (status, body) = call(&app, "GET", "/links", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().expect("links").len(), 1);

        let (status, _) = call(&app, "DELETE", "/links/default/lamp", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, "GET", "/links/default/lamp", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "RESOURCE.NOT_FOUND");
    }

    #[tokio::test]
    async fn invalid_link_is_rejected_by_store() {
        let (_, app) = app();
        let body = json!({
            "spec": {
                "adaptor": {"node": "", "name": "log"},
                "model": {"version": "v1", "kind": "DummyDevice"}
            }
        });
        let (status, body) = call(&app, "PUT", "/links/default/lamp", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn secret_data_must_be_base64() {
        let (_, app) = app();
        let (status, _) = call(
            &app,
            "PUT",
            "/secrets/default/credentials",
            Some(json!({"data": {"token": "%%%"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "PUT",
            "/secrets/default/credentials",
            Some(json!({"data": {"token": "YWJj"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn model_name_follows_group_and_kind() {
        let (_, app) = app();
        let schema = json!({
            "group": "devices.example.io",
            "kind": "DummyDevice",
            "versions": [{"name": "v1", "served": true, "storage": true}]
        });
        let (status, _) = call(&app, "PUT", "/models/dummy", Some(schema.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            "PUT",
            "/models/dummydevices.devices.example.io",
            Some(schema),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["plural"], "dummydevices");
    }

    #[tokio::test]
    async fn node_put_accepts_empty_body() {
        let (_, app) = app();
        let (status, body) = call(&app, "PUT", "/nodes/edge-1", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["metadata"]["name"], "edge-1");

        let (status, _) = call(&app, "DELETE", "/nodes/edge-1", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "DELETE", "/nodes/edge-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_device_is_not_found() {
        let (_, app) = app();
        let (status, _) = call(
            &app,
            "GET",
            "/devices/default/lamp?apiVersion=devices.example.io/v1&kind=DummyDevice",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_report_node_and_adaptors() {
        let (state, app) = app();
        state
            .connections
            .register_adaptor(
                "log",
                Arc::new(devlink_connection::transport::LogDialer::new("log")),
            )
            .await;
        let (status, body) = call(&app, "GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["nodeName"], "edge-1");
        assert_eq!(body["data"]["registeredAdaptors"], json!(["log"]));

        let (status, body) = call(&app, "GET", "/events", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }
}
