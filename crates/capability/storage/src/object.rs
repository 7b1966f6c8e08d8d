//! 存储对象与资源类型。
//!
//! 资源存储是通用的键值存储，键为 `(ResourceKind, NamespacedName)`；
//! Device 的类型由模型决定，因此 `ResourceKind::Device` 携带类型头。

use domain::{
    ConfigMap, Device, DeviceLink, DeviceType, ModelSchema, NamespacedName, Node, ObjectMeta,
    Secret,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    DeviceLink,
    Node,
    ModelSchema,
    Secret,
    ConfigMap,
    Device(DeviceType),
}

impl ResourceKind {
    pub fn device(device_type: DeviceType) -> Self {
        Self::Device(device_type)
    }

    /// 是否有独立的 status 子资源（update 不改 status，update_status 只改 status）。
    pub fn has_status(&self) -> bool {
        matches!(self, Self::DeviceLink | Self::Device(_))
    }

    pub fn is_namespaced(&self) -> bool {
        !matches!(self, Self::Node | Self::ModelSchema)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::DeviceLink => f.write_str("DeviceLink"),
            ResourceKind::Node => f.write_str("Node"),
            ResourceKind::ModelSchema => f.write_str("ModelSchema"),
            ResourceKind::Secret => f.write_str("Secret"),
            ResourceKind::ConfigMap => f.write_str("ConfigMap"),
            ResourceKind::Device(device_type) => write!(f, "Device({})", device_type),
        }
    }
}

/// 存储中的对象。
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    DeviceLink(DeviceLink),
    Node(Node),
    ModelSchema(ModelSchema),
    Secret(Secret),
    ConfigMap(ConfigMap),
    Device(Device),
}

impl Object {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Object::DeviceLink(_) => ResourceKind::DeviceLink,
            Object::Node(_) => ResourceKind::Node,
            Object::ModelSchema(_) => ResourceKind::ModelSchema,
            Object::Secret(_) => ResourceKind::Secret,
            Object::ConfigMap(_) => ResourceKind::ConfigMap,
            Object::Device(device) => ResourceKind::Device(device.device_type()),
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Object::DeviceLink(item) => &item.metadata,
            Object::Node(item) => &item.metadata,
            Object::ModelSchema(item) => &item.metadata,
            Object::Secret(item) => &item.metadata,
            Object::ConfigMap(item) => &item.metadata,
            Object::Device(item) => &item.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Object::DeviceLink(item) => &mut item.metadata,
            Object::Node(item) => &mut item.metadata,
            Object::ModelSchema(item) => &mut item.metadata,
            Object::Secret(item) => &mut item.metadata,
            Object::ConfigMap(item) => &mut item.metadata,
            Object::Device(item) => &mut item.metadata,
        }
    }

    pub fn key(&self) -> NamespacedName {
        self.metadata().key()
    }

    /// 用 `other` 的 status 覆盖自身 status（类型不同则不处理）。
    pub(crate) fn copy_status_from(&mut self, other: &Object) {
        match (self, other) {
            (Object::DeviceLink(target), Object::DeviceLink(source)) => {
                target.status = source.status.clone();
            }
            (Object::Device(target), Object::Device(source)) => {
                target.status = source.status.clone();
            }
            _ => {}
        }
    }

    /// 比较除元数据和 status 之外的内容（用于 generation 递增）。
    pub(crate) fn same_content(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::DeviceLink(a), Object::DeviceLink(b)) => a.spec == b.spec,
            (Object::ModelSchema(a), Object::ModelSchema(b)) => {
                a.group == b.group
                    && a.kind == b.kind
                    && a.plural == b.plural
                    && a.versions == b.versions
            }
            (Object::Secret(a), Object::Secret(b)) => a.data == b.data,
            (Object::ConfigMap(a), Object::ConfigMap(b)) => a.data == b.data,
            (Object::Device(a), Object::Device(b)) => a.spec == b.spec,
            (Object::Node(_), Object::Node(_)) => true,
            _ => false,
        }
    }
}

/// 可存入资源存储的类型化对象。
pub trait Resource: Clone + Send + Sync + 'static {
    fn resource_kind(&self) -> ResourceKind;
    fn into_object(self) -> Object;
    fn from_object(object: Object) -> Option<Self>;
}

impl Resource for DeviceLink {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::DeviceLink
    }

    fn into_object(self) -> Object {
        Object::DeviceLink(self)
    }

    fn from_object(object: Object) -> Option<Self> {
        match object {
            Object::DeviceLink(item) => Some(item),
            _ => None,
        }
    }
}

impl Resource for Node {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Node
    }

    fn into_object(self) -> Object {
        Object::Node(self)
    }

    fn from_object(object: Object) -> Option<Self> {
        match object {
            Object::Node(item) => Some(item),
            _ => None,
        }
    }
}

impl Resource for ModelSchema {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::ModelSchema
    }

    fn into_object(self) -> Object {
        Object::ModelSchema(self)
    }

    fn from_object(object: Object) -> Option<Self> {
        match object {
            Object::ModelSchema(item) => Some(item),
            _ => None,
        }
    }
}

impl Resource for Secret {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Secret
    }

    fn into_object(self) -> Object {
        Object::Secret(self)
    }

    fn from_object(object: Object) -> Option<Self> {
        match object {
            Object::Secret(item) => Some(item),
            _ => None,
        }
    }
}

impl Resource for ConfigMap {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::ConfigMap
    }

    fn into_object(self) -> Object {
        Object::ConfigMap(self)
    }

    fn from_object(object: Object) -> Option<Self> {
        match object {
            Object::ConfigMap(item) => Some(item),
            _ => None,
        }
    }
}

impl Resource for Device {
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Device(self.device_type())
    }

    fn into_object(self) -> Object {
        Object::Device(self)
    }

    fn from_object(object: Object) -> Option<Self> {
        match object {
            Object::Device(item) => Some(item),
            _ => None,
        }
    }
}
