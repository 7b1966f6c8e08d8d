//! Device 查询
//!
//! - GET /devices/{namespace}/{name}?apiVersion=&kind= - 获取 link 物化出的 Device

use super::NamespacedPath;
use crate::AppState;
use crate::utils::response::{bad_request_error, ok, storage_error};
use api_contract::DeviceQuery;
use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use devlink_storage::{ResourceKind, StoreExt};
use domain::{Device, DeviceType};

pub async fn get_device(
    State(state): State<AppState>,
    Path(path): Path<NamespacedPath>,
    Query(query): Query<DeviceQuery>,
) -> Response {
    let key = match path.key() {
        Ok(key) => key,
        Err(response) => return response,
    };
    let api_version = query.api_version.trim();
    let kind = query.kind.trim();
    if api_version.is_empty() || kind.is_empty() {
        return bad_request_error("apiVersion and kind required");
    }
    let device_type = DeviceType {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
    };
    match state
        .store
        .get_as::<Device>(&ResourceKind::Device(device_type), &key)
        .await
    {
        Ok(device) => ok(device),
        Err(err) => storage_error(err),
    }
}
