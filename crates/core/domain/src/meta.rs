//! 对象元数据与命名空间标识。
//!
//! 所有存储在资源存储中的对象共享同一套元数据：
//! - 身份：namespace + name（稳定、不可变）
//! - 服务端簿记：uid、resourceVersion、generation、时间戳、managedFields
//! - 生命周期：finalizers、deletionTimestamp
//! - 归属：ownerReferences（用于级联回收）

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 命名空间 + 名称，作为对象在存储中的主键。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// 集群级对象（Node、ModelSchema）没有命名空间。
    pub fn cluster(name: impl Into<String>) -> Self {
        Self::new("", name)
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// 归属引用：被引用对象删除后，持有该引用的对象会被回收。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub controller: bool,
    #[serde(default)]
    pub block_owner_deletion: bool,
}

/// 对象元数据。
///
/// 序列化时省略空值，这样清理掉服务端字段后的文档不会残留占位键。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub generate_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub resource_version: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_grace_period_seconds: Option<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_fields: Vec<serde_json::Value>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl ObjectMeta {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(self.namespace.clone(), self.name.clone())
    }

    /// 存在删除时间戳即视为"已删除"，直到 finalizer 全部移除才会物理删除。
    pub fn is_deleted(&self) -> bool {
        self.deletion_timestamp_ms.is_some()
    }

    pub fn has_finalizer(&self, token: &str) -> bool {
        self.finalizers.iter().any(|item| item == token)
    }

    /// 添加 finalizer，已存在时返回 false。
    pub fn add_finalizer(&mut self, token: &str) -> bool {
        if self.has_finalizer(token) {
            return false;
        }
        self.finalizers.push(token.to_string());
        true
    }

    /// 移除 finalizer，不存在时返回 false。
    pub fn remove_finalizer(&mut self, token: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|item| item != token);
        before != self.finalizers.len()
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        !uid.is_empty() && self.owner_references.iter().any(|owner| owner.uid == uid)
    }

    /// 清除服务端维护的簿记字段（适配器不应看到集群簿记）。
    pub fn strip_server_fields(&mut self) {
        self.generate_name.clear();
        self.resource_version = 0;
        self.generation = 0;
        self.creation_timestamp_ms = None;
        self.deletion_timestamp_ms = None;
        self.deletion_grace_period_seconds = None;
        self.finalizers.clear();
        self.managed_fields.clear();
    }
}

/// 获取当前时间戳（毫秒）
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or_default()
}
