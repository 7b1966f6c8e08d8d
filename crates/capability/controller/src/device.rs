//! 由 link 模板构造 Device，以及模板与现有 Device 的结构化差异。

use domain::{
    ADAPTOR_NAME_ANNOTATION, Device, DeviceLink, LINK_API_VERSION, LINK_KIND, NODE_NAME_ANNOTATION,
    OwnerReference,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// 模板中的 spec：JSON 对象，或包含 JSON 对象的字符串。
///
/// 缺失或无法解析为对象时返回空对象。
pub fn template_spec(link: &DeviceLink) -> Value {
    let parsed = match &link.spec.template.spec {
        None => None,
        Some(Value::String(raw)) if raw.trim().is_empty() => None,
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(target: "devlink.limb", link = %link.key(), error = %err, "template spec is not JSON");
                None
            }
        },
        Some(value) => Some(value.clone()),
    };
    match parsed {
        Some(value @ Value::Object(_)) => value,
        _ => Value::Object(serde_json::Map::new()),
    }
}

/// 来源注解：最后确认的节点与适配器。
pub fn provenance_annotations(link: &DeviceLink) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NODE_NAME_ANNOTATION.to_string(), link.status.node_name.clone()),
        (ADAPTOR_NAME_ANNOTATION.to_string(), link.status.adaptor_name.clone()),
    ])
}

/// 指向 link 的控制者归属引用。
pub fn owner_reference(link: &DeviceLink) -> OwnerReference {
    OwnerReference {
        api_version: LINK_API_VERSION.to_string(),
        kind: LINK_KIND.to_string(),
        name: link.metadata.name.clone(),
        uid: link.metadata.uid.clone(),
        controller: true,
        block_owner_deletion: true,
    }
}

/// 在空的类型化实例上填充模板内容。
pub fn construct_from_template(link: &DeviceLink, mut device: Device) -> Device {
    device.metadata.name = link.metadata.name.clone();
    device.metadata.namespace = link.metadata.namespace.clone();
    device.set_labels(link.spec.template.labels.clone());
    device.set_annotations(provenance_annotations(link));
    device.set_spec(template_spec(link));
    device.metadata.owner_references = vec![owner_reference(link)];
    device
}

/// 模板与现有 Device 的差异；字段为 Some 表示需要改写为该值。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDrift {
    pub annotations: Option<BTreeMap<String, String>>,
    pub labels: Option<BTreeMap<String, String>>,
    pub spec: Option<Value>,
}

impl DeviceDrift {
    /// 期望值：注解为来源注解覆盖现有注解，标签为模板标签覆盖现有标签，spec 为模板 spec。
    pub fn diff(link: &DeviceLink, device: &Device) -> Self {
        let mut annotations = device.annotations().clone();
        annotations.extend(provenance_annotations(link));
        let mut labels = device.labels().clone();
        labels.extend(link.spec.template.labels.clone());
        let spec = template_spec(link);

        Self {
            annotations: (&annotations != device.annotations()).then_some(annotations),
            labels: (&labels != device.labels()).then_some(labels),
            spec: (&spec != device.spec()).then_some(spec),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_none() && self.labels.is_none() && self.spec.is_none()
    }

    pub fn apply(self, device: &mut Device) {
        if let Some(annotations) = self.annotations {
            device.set_annotations(annotations);
        }
        if let Some(labels) = self.labels {
            device.set_labels(labels);
        }
        if let Some(spec) = self.spec {
            device.set_spec(spec);
        }
    }
}
