//! DeviceLink：绑定节点、适配器、设备模型与设备模板的声明式实体。

use crate::condition::{ConditionStatus, ConditionType, Conditions};
use crate::meta::{NamespacedName, ObjectMeta, now_epoch_ms};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// DeviceLink 自身的 API 版本与类型。
pub const LINK_API_VERSION: &str = "devlink.io/v1alpha1";
pub const LINK_KIND: &str = "DeviceLink";

/// 节点绑定循环持有的 finalizer。
pub const BINDER_FINALIZER: &str = "devlink.io/node-binder";

/// 写在 Device 上的来源注解。
pub const NODE_NAME_ANNOTATION: &str = "devlink.io/node-name";
pub const ADAPTOR_NAME_ANNOTATION: &str = "devlink.io/adaptor-name";

/// 条件原因码（面向运维的诊断，不用于程序分支）。
pub mod reasons {
    pub const NODE_ACTIVE: &str = "NodeActive";
    pub const NODE_NOT_FOUND: &str = "NodeNotFound";
    pub const MODEL_ACCEPTED: &str = "ModelAccepted";
    pub const MODEL_NOT_FOUND: &str = "ModelNotFound";
    pub const MODEL_VERSION_NOT_SERVED: &str = "ModelVersionNotServed";
    pub const ADAPTOR_REGISTERED: &str = "AdaptorRegistered";
    pub const ADAPTOR_NOT_FOUND: &str = "AdaptorNotFound";
    pub const DEVICE_MATERIALIZED: &str = "DeviceMaterialized";
    pub const INVALID_MODEL: &str = "InvalidModel";
    pub const CREATE_REJECTED: &str = "CreateRejected";
    pub const DEVICE_CONNECTED: &str = "DeviceConnected";
    pub const REFERENCE_UNRESOLVED: &str = "ReferenceUnresolved";
    pub const UPDATE_REJECTED: &str = "UpdateRejected";
    pub const CONNECT_FAILED: &str = "ConnectFailed";
}

/// 设备模型的类型描述（group/version/kind）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRef {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ModelRef {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// `group/version`，core group 时只有 version。
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// 适配器引用：由哪个节点上的哪个适配器管理设备。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptorRef {
    pub node: String,
    pub name: String,
}

/// 下游 Device 的模板。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceTemplate {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// 原始配置：JSON 对象，或包含 JSON 对象的字符串。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,
}

/// Secret / ConfigMap 引用来源。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsSource {
    pub name: String,
    /// 为空时取全部键。
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

/// 字段选择器。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSelector {
    pub field_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownwardItem {
    pub name: String,
    pub field_ref: FieldSelector,
}

/// 自描述来源：从 link 自身字段取值。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownwardSource {
    pub items: Vec<DownwardItem>,
}

/// 引用来源，每个条目恰好一种。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceSourceKind {
    Secret(ItemsSource),
    ConfigMap(ItemsSource),
    #[serde(rename = "downwardAPI")]
    DownwardApi(DownwardSource),
}

/// 具名配置输入，连接前解析。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,
    #[serde(flatten)]
    pub source: ReferenceSourceKind,
}

/// 解析后的引用：引用名 → (键 → 字节)。
pub type ReferenceData = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// 期望状态（用户编写）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLinkSpec {
    pub adaptor: AdaptorRef,
    pub model: ModelRef,
    #[serde(default)]
    pub template: DeviceTemplate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceEntry>,
}

/// 计算状态（机器持有）。
///
/// `node_name` / `adaptor_name` / `model` 是"最后确认的绑定"，
/// 只随对应条件的 True 迁移一起写入，是漂移检测的参照点。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceLinkStatus {
    pub conditions: Conditions,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub adaptor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLink {
    pub metadata: ObjectMeta,
    pub spec: DeviceLinkSpec,
    #[serde(default)]
    pub status: DeviceLinkStatus,
}

impl DeviceLink {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: DeviceLinkSpec) -> Self {
        Self {
            metadata: ObjectMeta::named(namespace, name),
            spec,
            status: DeviceLinkStatus::default(),
        }
    }

    pub fn key(&self) -> NamespacedName {
        self.metadata.key()
    }

    pub fn is_deleted(&self) -> bool {
        self.metadata.is_deleted()
    }

    pub fn has_finalizer(&self) -> bool {
        self.metadata.has_finalizer(BINDER_FINALIZER)
    }

    pub fn add_finalizer(&mut self) -> bool {
        self.metadata.add_finalizer(BINDER_FINALIZER)
    }

    pub fn remove_finalizer(&mut self) -> bool {
        self.metadata.remove_finalizer(BINDER_FINALIZER)
    }

    pub fn condition(&self, condition_type: ConditionType) -> ConditionStatus {
        self.status.conditions.status_of(condition_type)
    }

    pub fn set_condition(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) -> bool {
        self.status
            .conditions
            .set(condition_type, status, reason, message, now_epoch_ms())
    }

    pub fn succeed_on_node_existed(&mut self, node_name: &str) {
        self.status.node_name = node_name.to_string();
        self.set_condition(
            ConditionType::NodeExisted,
            ConditionStatus::True,
            reasons::NODE_ACTIVE,
            "",
        );
    }

    pub fn fail_on_node_existed(&mut self, reason: &str, message: &str) {
        self.status.node_name.clear();
        self.set_condition(ConditionType::NodeExisted, ConditionStatus::False, reason, message);
    }

    pub fn succeed_on_model_existed(&mut self) {
        self.status.model = Some(self.spec.model.clone());
        self.set_condition(
            ConditionType::ModelExisted,
            ConditionStatus::True,
            reasons::MODEL_ACCEPTED,
            "",
        );
    }

    pub fn fail_on_model_existed(&mut self, reason: &str, message: &str) {
        self.status.model = None;
        self.set_condition(ConditionType::ModelExisted, ConditionStatus::False, reason, message);
    }

    pub fn succeed_on_adaptor_existed(&mut self) {
        self.status.adaptor_name = self.spec.adaptor.name.clone();
        self.set_condition(
            ConditionType::AdaptorExisted,
            ConditionStatus::True,
            reasons::ADAPTOR_REGISTERED,
            "",
        );
    }

    pub fn fail_on_adaptor_existed(&mut self, reason: &str, message: &str) {
        self.status.adaptor_name.clear();
        self.set_condition(ConditionType::AdaptorExisted, ConditionStatus::False, reason, message);
    }

    pub fn succeed_on_device_created(&mut self) {
        self.set_condition(
            ConditionType::DeviceCreated,
            ConditionStatus::True,
            reasons::DEVICE_MATERIALIZED,
            "",
        );
    }

    pub fn fail_on_device_created(&mut self, reason: &str, message: &str) {
        self.set_condition(ConditionType::DeviceCreated, ConditionStatus::False, reason, message);
    }

    pub fn succeed_on_device_connected(&mut self) {
        self.set_condition(
            ConditionType::DeviceConnected,
            ConditionStatus::True,
            reasons::DEVICE_CONNECTED,
            "",
        );
    }

    pub fn fail_on_device_connected(&mut self, reason: &str, message: &str) {
        self.set_condition(ConditionType::DeviceConnected, ConditionStatus::False, reason, message);
    }
}
