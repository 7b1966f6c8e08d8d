//! DeviceLink 字段路径取值（downward 引用使用）。

use domain::DeviceLink;
use std::collections::BTreeMap;

/// 按字段路径取值；路径不支持或取不到值时返回 None。
pub fn extract(link: &DeviceLink, path: &str) -> Option<String> {
    if let Some(key) = subscript(path, "metadata.labels") {
        return link.metadata.labels.get(key).cloned();
    }
    if let Some(key) = subscript(path, "metadata.annotations") {
        return link.metadata.annotations.get(key).cloned();
    }
    let value = match path {
        "metadata.name" => link.metadata.name.clone(),
        "metadata.namespace" => link.metadata.namespace.clone(),
        "metadata.uid" => link.metadata.uid.clone(),
        "metadata.labels" => format_map(&link.metadata.labels),
        "metadata.annotations" => format_map(&link.metadata.annotations),
        "spec.adaptor.node" => link.spec.adaptor.node.clone(),
        "spec.adaptor.name" => link.spec.adaptor.name.clone(),
        "spec.model.apiVersion" => link.spec.model.api_version(),
        "spec.model.kind" => link.spec.model.kind.clone(),
        "status.nodeName" => link.status.node_name.clone(),
        "status.adaptorName" => link.status.adaptor_name.clone(),
        _ => return None,
    };
    Some(value)
}

/// 解析 `prefix['key']` / `prefix["key"]`。
fn subscript<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let inner = path.strip_prefix(prefix)?.strip_prefix('[')?.strip_suffix(']')?;
    inner
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')))
}

/// 按键排序的 `key="value"` 行。
fn format_map(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(key, value)| format!("{}={:?}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DeviceLinkSpec;

    fn link() -> DeviceLink {
        let mut link = DeviceLink::new("default", "lamp", DeviceLinkSpec::default());
        link.metadata.labels.insert("room".into(), "kitchen".into());
        link.metadata.labels.insert("floor".into(), "1".into());
        link.spec.adaptor.node = "edge-1".into();
        link
    }

    #[test]
    fn plain_paths() {
        let link = link();
        assert_eq!(extract(&link, "metadata.name").as_deref(), Some("lamp"));
        assert_eq!(extract(&link, "spec.adaptor.node").as_deref(), Some("edge-1"));
        assert_eq!(extract(&link, "status.nodeName").as_deref(), Some(""));
        assert_eq!(extract(&link, "spec.template"), None);
    }

    #[test]
    fn label_subscripts_and_maps() {
        let link = link();
        assert_eq!(extract(&link, "metadata.labels['room']").as_deref(), Some("kitchen"));
        assert_eq!(extract(&link, "metadata.labels[\"floor\"]").as_deref(), Some("1"));
        assert_eq!(extract(&link, "metadata.labels['missing']"), None);
        assert_eq!(extract(&link, "metadata.labels[room]"), None);
        assert_eq!(
            extract(&link, "metadata.labels").as_deref(),
            Some("floor=\"1\"\nroom=\"kitchen\"")
        );
    }
}
