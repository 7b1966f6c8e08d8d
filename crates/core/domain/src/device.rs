//! 下游 Device 文档。
//!
//! Device 的形状由 link 的 model 决定，spec 是任意 JSON 文档；
//! 这里用一个带类型头（apiVersion/kind）的信封承载，
//! binder 需要操作的字段（标签、注解、归属、spec）提供显式访问器。

use crate::link::ModelRef;
use crate::meta::{NamespacedName, ObjectMeta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 模型无法实例化为 Device。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("model kind is empty")]
    EmptyKind,
    #[error("model version is empty")]
    EmptyVersion,
}

/// Device 的类型头，用于在存储中区分不同模型的设备。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceType {
    pub api_version: String,
    pub kind: String,
}

impl DeviceType {
    pub fn of_model(model: &ModelRef) -> Self {
        Self {
            api_version: model.api_version(),
            kind: model.kind.clone(),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default = "empty_document")]
    pub spec: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
}

fn empty_document() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Device {
    /// 由模型构造一个空的类型化实例。
    pub fn empty(model: &ModelRef) -> Result<Self, ModelError> {
        if model.kind.is_empty() {
            return Err(ModelError::EmptyKind);
        }
        if model.version.is_empty() {
            return Err(ModelError::EmptyVersion);
        }
        Ok(Self {
            api_version: model.api_version(),
            kind: model.kind.clone(),
            metadata: ObjectMeta::default(),
            spec: empty_document(),
            status: None,
        })
    }

    pub fn device_type(&self) -> DeviceType {
        DeviceType {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
        }
    }

    pub fn key(&self) -> NamespacedName {
        self.metadata.key()
    }

    /// 存在且未被标记删除。
    pub fn is_active(&self) -> bool {
        !self.metadata.is_deleted()
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata.labels
    }

    pub fn set_labels(&mut self, labels: BTreeMap<String, String>) {
        self.metadata.labels = labels;
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.metadata.annotations
    }

    pub fn set_annotations(&mut self, annotations: BTreeMap<String, String>) {
        self.metadata.annotations = annotations;
    }

    pub fn spec(&self) -> &serde_json::Value {
        &self.spec
    }

    pub fn set_spec(&mut self, spec: serde_json::Value) {
        self.spec = spec;
    }

    /// 去掉服务端簿记字段和 status 子树后的副本，用于发送给适配器。
    pub fn cleaned(&self) -> Self {
        let mut device = self.clone();
        device.metadata.strip_server_fields();
        device.status = None;
        device
    }
}
