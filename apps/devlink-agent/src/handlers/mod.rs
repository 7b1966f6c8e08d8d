//! Handlers 模块

pub mod cluster;
pub mod devices;
pub mod links;
pub mod telemetry;

pub use cluster::*;
pub use devices::*;
pub use links::*;
pub use telemetry::*;

use crate::utils::normalize_required;
use crate::utils::response::{created, ok, storage_error};
use axum::response::Response;
use devlink_storage::{Resource, ResourceKind, ResourceStore, StoreExt};
use domain::NamespacedName;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct NamespacedPath {
    namespace: String,
    name: String,
}

impl NamespacedPath {
    fn key(self) -> Result<NamespacedName, Response> {
        let namespace = normalize_required(self.namespace, "namespace")?;
        let name = normalize_required(self.name, "name")?;
        Ok(NamespacedName::new(namespace, name))
    }
}

#[derive(Deserialize)]
pub struct ClusterPath {
    name: String,
}

impl ClusterPath {
    fn key(self) -> Result<NamespacedName, Response> {
        Ok(NamespacedName::cluster(normalize_required(self.name, "name")?))
    }
}

/// 创建或改写对象：已存在时在存储中的版本上改写（201 / 200）。
async fn upsert<T>(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    key: &NamespacedName,
    apply: impl FnOnce(Option<T>) -> T + Send,
) -> Response
where
    T: Resource + Serialize,
{
    match store.get_as::<T>(&kind, key).await {
        Ok(existing) => match store.update_as(apply(Some(existing))).await {
            Ok(updated) => ok(updated),
            Err(err) => storage_error(err),
        },
        Err(err) if err.is_not_found() => match store.create_as(apply(None)).await {
            Ok(created_object) => created(created_object),
            Err(err) => storage_error(err),
        },
        Err(err) => storage_error(err),
    }
}

async fn remove(store: &dyn ResourceStore, kind: ResourceKind, key: &NamespacedName) -> Response {
    match store.delete(&kind, key).await {
        Ok(()) => ok(()),
        Err(err) => storage_error(err),
    }
}
