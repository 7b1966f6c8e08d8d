//! 验证辅助函数
//!
//! 存储在写入前拒绝语义错误的对象（返回 Invalid）：
//! - 名称必填；命名空间级对象必须带命名空间，集群级对象不得带
//! - DeviceLink 必须指定节点、适配器和完整的模型类型
//! - Device 必须带类型头，spec 必须是 JSON 对象

use crate::error::StorageError;
use crate::object::Object;

/// 校验对象能否写入存储。
pub fn validate_object(object: &Object) -> Result<(), StorageError> {
    let kind = object.kind();
    let key = object.key();
    let meta = object.metadata();
    if meta.name.is_empty() {
        return Err(StorageError::invalid(&kind, &key, "metadata.name is required"));
    }
    if kind.is_namespaced() && meta.namespace.is_empty() {
        return Err(StorageError::invalid(&kind, &key, "metadata.namespace is required"));
    }
    if !kind.is_namespaced() && !meta.namespace.is_empty() {
        return Err(StorageError::invalid(
            &kind,
            &key,
            "cluster scoped object must not carry a namespace",
        ));
    }

    match object {
        Object::DeviceLink(link) => {
            if link.spec.adaptor.node.is_empty() {
                return Err(StorageError::invalid(&kind, &key, "spec.adaptor.node is required"));
            }
            if link.spec.adaptor.name.is_empty() {
                return Err(StorageError::invalid(&kind, &key, "spec.adaptor.name is required"));
            }
            if link.spec.model.kind.is_empty() || link.spec.model.version.is_empty() {
                return Err(StorageError::invalid(
                    &kind,
                    &key,
                    "spec.model requires version and kind",
                ));
            }
        }
        Object::Device(device) => {
            if device.api_version.is_empty() || device.kind.is_empty() {
                return Err(StorageError::invalid(&kind, &key, "apiVersion and kind are required"));
            }
            if !device.spec.is_object() {
                return Err(StorageError::invalid(&kind, &key, "spec must be an object"));
            }
        }
        Object::ModelSchema(schema) => {
            if schema.kind.is_empty() {
                return Err(StorageError::invalid(&kind, &key, "kind is required"));
            }
        }
        Object::Node(_) | Object::Secret(_) | Object::ConfigMap(_) => {}
    }
    Ok(())
}
