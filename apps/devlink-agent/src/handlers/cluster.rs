//! 集群资源 handlers：节点、设备模型 schema、Secret、ConfigMap。
//!
//! PUT 创建或改写，DELETE 删除。节点与 schema 为集群级资源，
//! Secret / ConfigMap 位于命名空间内。

use super::{ClusterPath, NamespacedPath, remove, upsert};
use crate::AppState;
use crate::utils::response::bad_request_error;
use api_contract::{ApplyConfigMapRequest, ApplyModelRequest, ApplyNodeRequest, ApplySecretRequest};
use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use devlink_storage::ResourceKind;
use domain::{ConfigMap, ModelRef, ModelSchema, Node, ObjectMeta, Secret, schema_name_for};

pub async fn apply_node(
    State(state): State<AppState>,
    Path(path): Path<ClusterPath>,
    body: Option<Json<ApplyNodeRequest>>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    let req = body.map(|Json(req)| req).unwrap_or_default();
    upsert(state.store.as_ref(), ResourceKind::Node, &key, |existing: Option<Node>| {
        let mut node = existing.unwrap_or_else(|| Node::new(key.name.clone()));
        node.metadata.labels = req.labels;
        node
    })
    .await
}

pub async fn delete_node(State(state): State<AppState>, Path(path): Path<ClusterPath>) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    remove(state.store.as_ref(), ResourceKind::Node, &key).await
}

/// schema 名称必须与 group / kind 推导出的名称一致，否则 link 无法找到它。
pub async fn apply_model(
    State(state): State<AppState>,
    Path(path): Path<ClusterPath>,
    Json(req): Json<ApplyModelRequest>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    let expected = schema_name_for(&ModelRef::new(req.group.clone(), "", req.kind.clone()));
    if key.name != expected {
        return bad_request_error(format!("model schema name must be {expected}"));
    }
    upsert(
        state.store.as_ref(),
        ResourceKind::ModelSchema,
        &key,
        |existing: Option<ModelSchema>| {
            let mut schema = existing.unwrap_or_else(|| ModelSchema {
                metadata: ObjectMeta::named("", key.name.clone()),
                ..ModelSchema::default()
            });
            schema.group = req.group;
            schema.kind = req.kind;
            schema.plural = req
                .plural
                .unwrap_or_else(|| expected.split('.').next().unwrap_or_default().to_string());
            schema.versions = req.versions;
            schema
        },
    )
    .await
}

pub async fn delete_model(State(state): State<AppState>, Path(path): Path<ClusterPath>) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    remove(state.store.as_ref(), ResourceKind::ModelSchema, &key).await
}

pub async fn apply_secret(
    State(state): State<AppState>,
    Path(path): Path<NamespacedPath>,
    Json(req): Json<ApplySecretRequest>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    let data = match req.decode() {
        Ok(data) => data,
        Err(item) => return bad_request_error(format!("data.{item} is not valid base64")),
    };
    upsert(state.store.as_ref(), ResourceKind::Secret, &key, |existing: Option<Secret>| {
        let mut secret = existing.unwrap_or_else(|| Secret {
            metadata: ObjectMeta::named(key.namespace.clone(), key.name.clone()),
            ..Secret::default()
        });
        secret.data = data;
        secret
    })
    .await
}

pub async fn delete_secret(
    State(state): State<AppState>,
    Path(path): Path<NamespacedPath>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    remove(state.store.as_ref(), ResourceKind::Secret, &key).await
}

pub async fn apply_configmap(
    State(state): State<AppState>,
    Path(path): Path<NamespacedPath>,
    Json(req): Json<ApplyConfigMapRequest>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    upsert(
        state.store.as_ref(),
        ResourceKind::ConfigMap,
        &key,
        |existing: Option<ConfigMap>| {
            let mut config_map = existing.unwrap_or_else(|| ConfigMap {
                metadata: ObjectMeta::named(key.namespace.clone(), key.name.clone()),
                ..ConfigMap::default()
            });
            config_map.data = req.data;
            config_map
        },
    )
    .await
}

pub async fn delete_configmap(
    State(state): State<AppState>,
    Path(path): Path<NamespacedPath>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    remove(state.store.as_ref(), ResourceKind::ConfigMap, &key).await
}
