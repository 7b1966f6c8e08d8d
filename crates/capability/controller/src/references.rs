//! 引用解析：把 link 的 `references[]` 解析为 `引用名 → (键 → 字节)`。
//!
//! 任一条目失败即整体失败，调用方按固定延迟重试。

use crate::fieldpath;
use devlink_storage::{ResourceKind, ResourceStore, StorageError, StoreExt};
use domain::{
    ConfigMap, DeviceLink, ItemsSource, NamespacedName, ReferenceData, ReferenceSourceKind, Secret,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("{kind} {key} not found")]
    SourceNotFound {
        kind: &'static str,
        key: NamespacedName,
    },
    #[error("{kind} {key} has no item {item}")]
    ItemNotFound {
        kind: &'static str,
        key: NamespacedName,
        item: String,
    },
    #[error("field path {path} of link {link} cannot be resolved")]
    FieldNotFound { link: NamespacedName, path: String },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ReferenceError {
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

pub struct ReferenceResolver {
    store: Arc<dyn ResourceStore>,
}

impl ReferenceResolver {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, link: &DeviceLink) -> Result<ReferenceData, ReferenceError> {
        let namespace = link.metadata.namespace.as_str();
        let mut resolved = ReferenceData::new();
        for entry in &link.spec.references {
            let items = match &entry.source {
                ReferenceSourceKind::Secret(source) => {
                    let key = NamespacedName::new(namespace, source.name.clone());
                    let secret: Secret = self
                        .fetch(&ResourceKind::Secret, "secret", &key)
                        .await?;
                    select_items("secret", &key, source, secret.data)?
                }
                ReferenceSourceKind::ConfigMap(source) => {
                    let key = NamespacedName::new(namespace, source.name.clone());
                    let config_map: ConfigMap = self
                        .fetch(&ResourceKind::ConfigMap, "configmap", &key)
                        .await?;
                    let data = config_map
                        .data
                        .into_iter()
                        .map(|(item, value)| (item, value.into_bytes()))
                        .collect();
                    select_items("configmap", &key, source, data)?
                }
                ReferenceSourceKind::DownwardApi(source) => {
                    let mut items = BTreeMap::new();
                    for item in &source.items {
                        let value = fieldpath::extract(link, &item.field_ref.field_path)
                            .ok_or_else(|| ReferenceError::FieldNotFound {
                                link: link.key(),
                                path: item.field_ref.field_path.clone(),
                            })?;
                        items.insert(item.name.clone(), value.into_bytes());
                    }
                    items
                }
            };
            resolved.insert(entry.name.clone(), items);
        }
        Ok(resolved)
    }

    async fn fetch<T: devlink_storage::Resource>(
        &self,
        kind: &ResourceKind,
        label: &'static str,
        key: &NamespacedName,
    ) -> Result<T, ReferenceError> {
        self.store.get_as(kind, key).await.map_err(|err| {
            if err.is_not_found() {
                ReferenceError::SourceNotFound {
                    kind: label,
                    key: key.clone(),
                }
            } else {
                ReferenceError::Storage(err)
            }
        })
    }
}

/// 未指定条目时取全部键；指定的每个键都必须存在。
fn select_items(
    kind: &'static str,
    key: &NamespacedName,
    source: &ItemsSource,
    data: BTreeMap<String, Vec<u8>>,
) -> Result<BTreeMap<String, Vec<u8>>, ReferenceError> {
    if source.items.is_empty() {
        return Ok(data);
    }
    let mut selected = BTreeMap::new();
    for item in &source.items {
        let value = data.get(item).cloned().ok_or_else(|| ReferenceError::ItemNotFound {
            kind,
            key: key.clone(),
            item: item.clone(),
        })?;
        selected.insert(item.clone(), value);
    }
    Ok(selected)
}
