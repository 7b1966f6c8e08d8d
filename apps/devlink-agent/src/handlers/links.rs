//! DeviceLink handlers
//!
//! - GET /links - 列出全部 link（含 status）
//! - GET /links/{namespace}/{name} - 获取 link
//! - PUT /links/{namespace}/{name} - 创建或改写 spec / labels / annotations
//! - DELETE /links/{namespace}/{name} - 删除 link（带 finalizer 时由调谐循环完成）
//!
//! status 只由调谐循环写入，PUT 不接受 status。

use super::{NamespacedPath, remove, upsert};
use crate::AppState;
use crate::utils::response::{ok, storage_error};
use api_contract::ApplyLinkRequest;
use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use devlink_storage::{ResourceKind, StoreExt};
use domain::DeviceLink;
use tracing::info;

pub async fn list_links(State(state): State<AppState>) -> Response {
    match state
        .store
        .list_as::<DeviceLink>(&ResourceKind::DeviceLink)
        .await
    {
        Ok(links) => ok(links),
        Err(err) => storage_error(err),
    }
}

pub async fn get_link(State(state): State<AppState>, Path(path): Path<NamespacedPath>) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    match state
        .store
        .get_as::<DeviceLink>(&ResourceKind::DeviceLink, &key)
        .await
    {
        Ok(link) => ok(link),
        Err(err) => storage_error(err),
    }
}

pub async fn apply_link(
    State(state): State<AppState>,
    Path(path): Path<NamespacedPath>,
    Json(req): Json<ApplyLinkRequest>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    info!(target: "devlink.api", link = %key, node = %req.spec.adaptor.node, "apply link");
    upsert(
        state.store.as_ref(),
        ResourceKind::DeviceLink,
        &key,
        |existing: Option<DeviceLink>| {
            let mut link = existing.unwrap_or_else(|| {
                DeviceLink::new(key.namespace.clone(), key.name.clone(), Default::default())
            });
            link.metadata.labels = req.labels;
            link.metadata.annotations = req.annotations;
            link.spec = req.spec;
            link
        },
    )
    .await
}

pub async fn delete_link(
    State(state): State<AppState>,
    Path(path): Path<NamespacedPath>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    info!(target: "devlink.api", link = %key, "delete link");
    remove(state.store.as_ref(), ResourceKind::DeviceLink, &key).await
}
