//! 资源存储接口 Trait 定义
//!
//! - ResourceStore：通用 get/list/create/update/update_status/delete/watch
//! - StoreExt：在 ResourceStore 之上提供类型化访问
//!
//! 设计原则：
//! - update 为乐观并发：resourceVersion 过期返回 Conflict
//! - 对象未变化的写入是空操作：不递增 resourceVersion，也不产生通知
//! - 使用 async_trait 支持动态分发（`Arc<dyn ResourceStore>`）

use crate::error::StorageError;
use crate::object::{Object, Resource, ResourceKind};
use crate::watch::WatchEvent;
use async_trait::async_trait;
use domain::NamespacedName;
use tokio::sync::broadcast;

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// 按类型与键读取对象，不存在时返回 NotFound。
    async fn get(&self, kind: &ResourceKind, key: &NamespacedName) -> Result<Object, StorageError>;

    /// 列出某类型的全部对象。
    async fn list(&self, kind: &ResourceKind) -> Result<Vec<Object>, StorageError>;

    /// 创建对象，由存储分配 uid / resourceVersion / generation / creationTimestamp。
    async fn create(&self, object: Object) -> Result<Object, StorageError>;

    /// 更新元数据与 spec（不含 status）。
    async fn update(&self, object: Object) -> Result<Object, StorageError>;

    /// 仅更新 status 子资源。
    async fn update_status(&self, object: Object) -> Result<Object, StorageError>;

    /// 删除对象；存在 finalizer 时只打删除时间戳。
    async fn delete(&self, kind: &ResourceKind, key: &NamespacedName) -> Result<(), StorageError>;

    /// 订阅变更通知。
    fn watch(&self) -> broadcast::Receiver<WatchEvent>;
}

/// 类型化访问扩展。
#[async_trait]
pub trait StoreExt: ResourceStore {
    async fn get_as<T: Resource>(
        &self,
        kind: &ResourceKind,
        key: &NamespacedName,
    ) -> Result<T, StorageError> {
        let object = self.get(kind, key).await?;
        T::from_object(object).ok_or_else(|| StorageError::UnexpectedKind(kind.clone()))
    }

    async fn list_as<T: Resource>(&self, kind: &ResourceKind) -> Result<Vec<T>, StorageError> {
        let objects = self.list(kind).await?;
        Ok(objects.into_iter().filter_map(T::from_object).collect())
    }

    async fn create_as<T: Resource>(&self, resource: T) -> Result<T, StorageError> {
        let kind = resource.resource_kind();
        let object = self.create(resource.into_object()).await?;
        T::from_object(object).ok_or(StorageError::UnexpectedKind(kind))
    }

    async fn update_as<T: Resource>(&self, resource: T) -> Result<T, StorageError> {
        let kind = resource.resource_kind();
        let object = self.update(resource.into_object()).await?;
        T::from_object(object).ok_or(StorageError::UnexpectedKind(kind))
    }

    async fn update_status_as<T: Resource>(&self, resource: T) -> Result<T, StorageError> {
        let kind = resource.resource_kind();
        let object = self.update_status(resource.into_object()).await?;
        T::from_object(object).ok_or(StorageError::UnexpectedKind(kind))
    }
}

impl<S: ResourceStore + ?Sized> StoreExt for S {}
