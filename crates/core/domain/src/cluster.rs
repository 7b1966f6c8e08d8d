//! 集群级资源：节点、设备模型 schema，以及命名空间内的 Secret / ConfigMap。

use crate::link::ModelRef;
use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 集群节点。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub metadata: ObjectMeta,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named("", name),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.metadata.is_deleted()
    }
}

/// 模型版本。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    pub name: String,
    #[serde(default)]
    pub served: bool,
    #[serde(default)]
    pub storage: bool,
}

/// 设备模型 schema（相当于 CRD）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSchema {
    pub metadata: ObjectMeta,
    pub group: String,
    pub kind: String,
    #[serde(default)]
    pub plural: String,
    #[serde(default)]
    pub versions: Vec<ModelVersion>,
}

impl ModelSchema {
    /// 按模型构造 schema，名称与 [`schema_name_for`] 一致。
    pub fn for_model(model: &ModelRef, versions: Vec<ModelVersion>) -> Self {
        Self {
            metadata: ObjectMeta::named("", schema_name_for(model)),
            group: model.group.clone(),
            kind: model.kind.clone(),
            plural: pluralize(&model.kind),
            versions,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.metadata.is_deleted()
    }

    /// 请求的版本是否在已服务版本中。
    pub fn accepts(&self, version: &str) -> bool {
        self.versions
            .iter()
            .any(|item| item.served && item.name == version)
    }
}

/// schema 的确定性名称：`<复数小写 kind>.<group>`。
pub fn schema_name_for(model: &ModelRef) -> String {
    let plural = pluralize(&model.kind);
    if model.group.is_empty() {
        plural
    } else {
        format!("{}.{}", plural, model.group)
    }
}

fn pluralize(kind: &str) -> String {
    let lower = kind.to_ascii_lowercase();
    if lower.is_empty() {
        return lower;
    }
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{}es", lower);
    }
    if let Some(stem) = lower.strip_suffix('y') {
        let before = stem.chars().last();
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", lower)
}

/// 命名空间内的 Secret。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
}

/// 命名空间内的 ConfigMap。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::pluralize;

    #[test]
    fn pluralize_common_kinds() {
        assert_eq!(pluralize("DummyDevice"), "dummydevices");
        assert_eq!(pluralize("Switch"), "switches");
        assert_eq!(pluralize("Proxy"), "proxies");
        assert_eq!(pluralize("Gateway"), "gateways");
        assert_eq!(pluralize("Status"), "statuses");
    }
}
