use crate::error::StorageError;
use crate::object::{Object, ResourceKind};
use crate::traits::ResourceStore;
use crate::validation::validate_object;
use crate::watch::{WatchEvent, WatchEventType};
use async_trait::async_trait;
use domain::{NamespacedName, now_epoch_ms};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

const WATCH_CAPACITY: usize = 1024;

type ObjectKey = (ResourceKind, NamespacedName);

#[derive(Default)]
struct StoreState {
    objects: HashMap<ObjectKey, Object>,
    revision: u64,
}

impl StoreState {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// 内存资源存储。
///
/// 所有写入在同一把锁内完成并在锁内发布通知，订阅者看到的事件顺序与写入顺序一致。
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    events: broadcast::Sender<WatchEvent>,
}

impl InMemoryStore {
    /// 创建新的内存资源存储
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            events,
        }
    }

    /// 对象总数（测试辅助）
    pub fn len(&self) -> usize {
        self.state
            .read()
            .map(|state| state.objects.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, events: Vec<WatchEvent>) {
        for event in events {
            // 没有订阅者时发送失败，忽略即可
            let _ = self.events.send(event);
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_failed() -> StorageError {
    StorageError::Unavailable("lock failed".to_string())
}

/// 物理删除对象并级联处理其拥有的对象。
///
/// 被拥有对象若带 finalizer 则只打删除时间戳，否则递归物理删除。
fn remove_cascade(state: &mut StoreState, key: &ObjectKey, events: &mut Vec<WatchEvent>) {
    let Some(removed) = state.objects.remove(key) else {
        return;
    };
    let uid = removed.metadata().uid.clone();
    events.push(WatchEvent {
        event_type: WatchEventType::Deleted,
        old: Some(removed.clone()),
        object: removed,
    });

    let mut owned: Vec<ObjectKey> = state
        .objects
        .iter()
        .filter(|(_, object)| object.metadata().is_owned_by(&uid))
        .map(|(key, _)| key.clone())
        .collect();
    owned.sort();

    for owned_key in owned {
        let Some(current) = state.objects.get(&owned_key).cloned() else {
            continue;
        };
        if current.metadata().finalizers.is_empty() {
            debug!(
                target: "devlink.store",
                kind = %owned_key.0,
                key = %owned_key.1,
                "garbage collecting owned object"
            );
            remove_cascade(state, &owned_key, events);
        } else if !current.metadata().is_deleted() {
            let mut marked = current.clone();
            marked.metadata_mut().deletion_timestamp_ms = Some(now_epoch_ms());
            marked.metadata_mut().resource_version = state.next_revision();
            state.objects.insert(owned_key, marked.clone());
            events.push(WatchEvent {
                event_type: WatchEventType::Modified,
                old: Some(current),
                object: marked,
            });
        }
    }
}

fn check_version(stored: &Object, given: &Object) -> Result<(), StorageError> {
    let given_version = given.metadata().resource_version;
    let current = stored.metadata().resource_version;
    // resourceVersion 为 0 表示无条件写入
    if given_version != 0 && given_version != current {
        return Err(StorageError::Conflict {
            kind: stored.kind(),
            key: stored.key(),
            given: given_version,
            current,
        });
    }
    Ok(())
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get(&self, kind: &ResourceKind, key: &NamespacedName) -> Result<Object, StorageError> {
        let state = self.state.read().map_err(|_| lock_failed())?;
        state
            .objects
            .get(&(kind.clone(), key.clone()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(kind, key))
    }

    async fn list(&self, kind: &ResourceKind) -> Result<Vec<Object>, StorageError> {
        let state = self.state.read().map_err(|_| lock_failed())?;
        let mut items: Vec<Object> = state
            .objects
            .iter()
            .filter(|((item_kind, _), _)| item_kind == kind)
            .map(|(_, object)| object.clone())
            .collect();
        items.sort_by_key(|object| object.key());
        Ok(items)
    }

    async fn create(&self, mut object: Object) -> Result<Object, StorageError> {
        validate_object(&object)?;
        let kind = object.kind();
        let key = object.key();
        let mut state = self.state.write().map_err(|_| lock_failed())?;
        let object_key = (kind.clone(), key.clone());
        if state.objects.contains_key(&object_key) {
            return Err(StorageError::AlreadyExists { kind, key });
        }

        let revision = state.next_revision();
        let meta = object.metadata_mut();
        if meta.uid.is_empty() {
            meta.uid = uuid::Uuid::new_v4().to_string();
        }
        meta.resource_version = revision;
        meta.generation = 1;
        meta.creation_timestamp_ms = Some(now_epoch_ms());
        meta.deletion_timestamp_ms = None;
        meta.deletion_grace_period_seconds = None;

        state.objects.insert(object_key, object.clone());
        self.publish(vec![WatchEvent {
            event_type: WatchEventType::Added,
            old: None,
            object: object.clone(),
        }]);
        Ok(object)
    }

    async fn update(&self, mut object: Object) -> Result<Object, StorageError> {
        validate_object(&object)?;
        let kind = object.kind();
        let key = object.key();
        let mut state = self.state.write().map_err(|_| lock_failed())?;
        let object_key = (kind.clone(), key.clone());
        let stored = state
            .objects
            .get(&object_key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(&kind, &key))?;
        check_version(&stored, &object)?;

        if kind.has_status() {
            object.copy_status_from(&stored);
        }
        let content_changed = !object.same_content(&stored);
        {
            let previous = stored.metadata();
            let meta = object.metadata_mut();
            meta.uid = previous.uid.clone();
            meta.creation_timestamp_ms = previous.creation_timestamp_ms;
            meta.deletion_timestamp_ms = previous.deletion_timestamp_ms;
            meta.deletion_grace_period_seconds = previous.deletion_grace_period_seconds;
            meta.resource_version = previous.resource_version;
            meta.generation = if content_changed {
                previous.generation + 1
            } else {
                previous.generation
            };
        }
        if object == stored {
            return Ok(stored);
        }

        let mut events = Vec::new();
        object.metadata_mut().resource_version = state.next_revision();
        if object.metadata().is_deleted() && object.metadata().finalizers.is_empty() {
            state.objects.insert(object_key.clone(), object.clone());
            remove_cascade(&mut state, &object_key, &mut events);
        } else {
            state.objects.insert(object_key, object.clone());
            events.push(WatchEvent {
                event_type: WatchEventType::Modified,
                old: Some(stored),
                object: object.clone(),
            });
        }
        self.publish(events);
        Ok(object)
    }

    async fn update_status(&self, object: Object) -> Result<Object, StorageError> {
        let kind = object.kind();
        let key = object.key();
        if !kind.has_status() {
            return Err(StorageError::invalid(&kind, &key, "object has no status"));
        }
        let mut state = self.state.write().map_err(|_| lock_failed())?;
        let object_key = (kind.clone(), key.clone());
        let stored = state
            .objects
            .get(&object_key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(&kind, &key))?;
        check_version(&stored, &object)?;

        let mut updated = stored.clone();
        updated.copy_status_from(&object);
        if updated == stored {
            return Ok(stored);
        }
        updated.metadata_mut().resource_version = state.next_revision();
        state.objects.insert(object_key, updated.clone());
        self.publish(vec![WatchEvent {
            event_type: WatchEventType::Modified,
            old: Some(stored),
            object: updated.clone(),
        }]);
        Ok(updated)
    }

    async fn delete(&self, kind: &ResourceKind, key: &NamespacedName) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_failed())?;
        let object_key = (kind.clone(), key.clone());
        let stored = state
            .objects
            .get(&object_key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(kind, key))?;

        let mut events = Vec::new();
        if stored.metadata().finalizers.is_empty() {
            remove_cascade(&mut state, &object_key, &mut events);
        } else if !stored.metadata().is_deleted() {
            let mut marked = stored.clone();
            marked.metadata_mut().deletion_timestamp_ms = Some(now_epoch_ms());
            marked.metadata_mut().resource_version = state.next_revision();
            state.objects.insert(object_key, marked.clone());
            events.push(WatchEvent {
                event_type: WatchEventType::Modified,
                old: Some(stored),
                object: marked,
            });
        }
        self.publish(events);
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }
}
