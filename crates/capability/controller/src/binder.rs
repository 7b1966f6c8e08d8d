//! 节点绑定循环（limb）。
//!
//! 每个节点一个实例，只处理分配到本节点的 link：
//! finalizer → 漂移检测 → 适配器 → Device 物化 → 引用解析 → Device 同步 → 连接。
//! 每一步都重新读取状态，任何持久化失败都会让同一个 link 重入队。

use crate::device::{DeviceDrift, construct_from_template};
use crate::predicate;
use crate::queue::WorkQueue;
use crate::references::ReferenceResolver;
use crate::runtime::{Action, Reconciler, Trigger};
use async_trait::async_trait;
use devlink_connection::{AdaptorEvent, ConnectionManager};
use devlink_storage::{Object, ResourceKind, ResourceStore, StoreExt, WatchEvent, WatchEventType};
use devlink_telemetry::EventRecorder;
use domain::{
    Device, DeviceLink, DeviceType, LINK_KIND, NamespacedName, ReferenceSourceKind, reasons,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 告警事件原因。
pub mod event_reasons {
    pub const FAILED_FETCHED: &str = "FailedFetched";
    pub const FAILED_UPDATED: &str = "FailedUpdated";
    pub const FAILED_CONNECTED: &str = "FailedConnected";
}

pub struct NodeBinder {
    node_name: String,
    store: Arc<dyn ResourceStore>,
    connections: Arc<ConnectionManager>,
    resolver: ReferenceResolver,
    events: Arc<dyn EventRecorder>,
    reference_retry: Duration,
}

impl NodeBinder {
    pub fn new(
        node_name: impl Into<String>,
        store: Arc<dyn ResourceStore>,
        connections: Arc<ConnectionManager>,
        events: Arc<dyn EventRecorder>,
        reference_retry: Duration,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            resolver: ReferenceResolver::new(store.clone()),
            store,
            connections,
            events,
            reference_retry,
        }
    }

    async fn persist_status(&self, link: DeviceLink) -> Result<(), Action> {
        let key = link.key();
        match self.store.update_status_as(link).await {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(target: "devlink.limb", link = %key, error = %err, "unable to change the status of link");
                Err(Action::Requeue)
            }
        }
    }

    /// 写入 status 后结束本轮。
    async fn finish(&self, link: DeviceLink) -> Action {
        match self.persist_status(link).await {
            Ok(()) => Action::Done,
            Err(action) => action,
        }
    }

    async fn finalize(&self, mut link: DeviceLink) -> Action {
        if !link.has_finalizer() {
            return Action::Done;
        }
        let key = link.key();
        self.connections.disconnect(&link).await;
        if !predicate::assigned_to(&link, &self.node_name) {
            return Action::Done;
        }
        link.remove_finalizer();
        match self.store.update_as(link).await {
            Ok(_) => {
                info!(target: "devlink.limb", link = %key, "link released");
                Action::Done
            }
            Err(err) => {
                warn!(target: "devlink.limb", link = %key, error = %err, "unable to remove finalizer from link");
                Action::Requeue
            }
        }
    }

    /// 取 Device；NotFound 返回 None。
    async fn fetch_device(
        &self,
        device_type: &DeviceType,
        key: &NamespacedName,
    ) -> Result<Option<Device>, Action> {
        match self
            .store
            .get_as::<Device>(&ResourceKind::Device(device_type.clone()), key)
            .await
        {
            Ok(device) => Ok(Some(device)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => {
                warn!(target: "devlink.limb", link = %key, error = %err, "unable to fetch the device of link");
                Err(Action::Requeue)
            }
        }
    }

    async fn bind(&self, mut link: DeviceLink) -> Action {
        let key = link.key();

        // 节点或模型漂移：断开，等待 brain 确认新的绑定
        if link.status.node_name != link.spec.adaptor.node {
            debug!(target: "devlink.limb", link = %key, "node drifted, disconnecting");
            self.connections.disconnect(&link).await;
            return Action::Done;
        }
        let model = match &link.status.model {
            Some(model) if *model == link.spec.model => model.clone(),
            _ => {
                debug!(target: "devlink.limb", link = %key, "model drifted, disconnecting");
                self.connections.disconnect(&link).await;
                return Action::Done;
            }
        };
        // 适配器漂移：断开旧适配器上的连接后继续
        if link.status.adaptor_name != link.spec.adaptor.name {
            debug!(target: "devlink.limb", link = %key, "adaptor drifted, disconnecting");
            self.connections.disconnect(&link).await;
        }

        if !self.connections.exists_adaptor(&link.spec.adaptor.name) {
            link.fail_on_adaptor_existed(reasons::ADAPTOR_NOT_FOUND, "the adaptor isn't existed");
            return self.finish(link).await;
        }
        link.succeed_on_adaptor_existed();

        // Device 物化
        let empty = match Device::empty(&model) {
            Ok(device) => device,
            Err(err) => {
                warn!(target: "devlink.limb", link = %key, error = %err, "unable to make device from model");
                link.fail_on_device_created(reasons::INVALID_MODEL, "unable to make device from model");
                return self.finish(link).await;
            }
        };
        let existing = match self.fetch_device(&empty.device_type(), &key).await {
            Ok(existing) => existing,
            Err(action) => return action,
        };
        let mut device = match existing {
            Some(device) if device.is_active() => device,
            _ => match self
                .store
                .create_as(construct_from_template(&link, empty))
                .await
            {
                Ok(created) => {
                    info!(target: "devlink.limb", link = %key, "device created");
                    created
                }
                Err(err) if err.is_invalid() => {
                    warn!(target: "devlink.limb", link = %key, error = %err, "unable to create device from template");
                    link.fail_on_device_created(
                        reasons::CREATE_REJECTED,
                        "unable to create device from template",
                    );
                    return self.finish(link).await;
                }
                Err(err) => {
                    warn!(target: "devlink.limb", link = %key, error = %err, "unable to create the device of link");
                    return Action::Requeue;
                }
            },
        };
        link.succeed_on_device_created();

        // 引用
        let references = match self.resolver.resolve(&link).await {
            Ok(references) => references,
            Err(err) => {
                link.fail_on_device_connected(
                    reasons::REFERENCE_UNRESOLVED,
                    "unable to fetch the reference parameters",
                );
                if let Err(action) = self.persist_status(link).await {
                    return action;
                }
                self.events.warning(
                    &key,
                    event_reasons::FAILED_FETCHED,
                    &format!(
                        "cannot fetch the reference parameters: {}, retry in {} seconds",
                        err,
                        self.reference_retry.as_secs()
                    ),
                );
                return Action::RequeueAfter(self.reference_retry);
            }
        };

        // Device 同步
        let drift = DeviceDrift::diff(&link, &device);
        if !drift.is_empty() {
            let mut desired = device.clone();
            drift.apply(&mut desired);
            match self.store.update_as(desired).await {
                Ok(updated) => {
                    debug!(target: "devlink.limb", link = %key, "device updated from template");
                    device = updated;
                }
                Err(err) if err.is_invalid() => {
                    link.fail_on_device_connected(
                        reasons::UPDATE_REJECTED,
                        "unable to update the device from template",
                    );
                    if let Err(action) = self.persist_status(link).await {
                        return action;
                    }
                    self.events.warning(
                        &key,
                        event_reasons::FAILED_UPDATED,
                        &format!("cannot update the device from template: {}", err),
                    );
                    return Action::Done;
                }
                Err(err) => {
                    warn!(target: "devlink.limb", link = %key, error = %err, "unable to update the device of link");
                    return Action::Requeue;
                }
            }
        }

        // 连接
        if let Err(err) = self.connections.connect(&references, &device, &link).await {
            link.fail_on_device_connected(reasons::CONNECT_FAILED, "unable to connect to device");
            if let Err(action) = self.persist_status(link).await {
                return action;
            }
            self.events.warning(
                &key,
                event_reasons::FAILED_CONNECTED,
                &format!("cannot connect to device: {}", err),
            );
            return Action::Done;
        }
        link.succeed_on_device_connected();

        self.finish(link).await
    }
}

#[async_trait]
impl Reconciler for NodeBinder {
    async fn reconcile(&self, key: &NamespacedName) -> Action {
        let mut link: DeviceLink = match self.store.get_as(&ResourceKind::DeviceLink, key).await {
            Ok(link) => link,
            Err(err) if err.is_not_found() => return Action::Done,
            Err(err) => {
                warn!(target: "devlink.limb", link = %key, error = %err, "unable to fetch link");
                return Action::Requeue;
            }
        };

        if link.is_deleted() {
            return self.finalize(link).await;
        }

        // 已迁移到其他节点：只清理本地连接
        if !predicate::assigned_to(&link, &self.node_name) {
            self.connections.disconnect(&link).await;
            return Action::Done;
        }

        if !link.has_finalizer() {
            link.add_finalizer();
            return match self.store.update_as(link).await {
                Ok(_) => Action::Done,
                Err(err) => {
                    warn!(target: "devlink.limb", link = %key, error = %err, "unable to add finalizer to link");
                    Action::Requeue
                }
            };
        }

        self.bind(link).await
    }
}

/// limb 的事件映射。
///
/// - link：分配到本节点（变更前或变更后）且发生了 limb 关心的变化
/// - Device 删除：重新物化其所属的 link
/// - Secret / ConfigMap 变化：重新解析引用了它的 link
pub struct BinderTrigger {
    node_name: String,
    store: Arc<dyn ResourceStore>,
}

impl BinderTrigger {
    pub fn new(node_name: impl Into<String>, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            node_name: node_name.into(),
            store,
        }
    }

    async fn local_links(&self) -> Vec<DeviceLink> {
        match self.store.list_as::<DeviceLink>(&ResourceKind::DeviceLink).await {
            Ok(links) => links
                .into_iter()
                .filter(|link| predicate::assigned_to(link, &self.node_name))
                .collect(),
            Err(err) => {
                warn!(target: "devlink.limb", error = %err, "unable to list links");
                Vec::new()
            }
        }
    }

    async fn owner_of(&self, device: &Device) -> Vec<NamespacedName> {
        let Some(owner) = device
            .metadata
            .owner_references
            .iter()
            .find(|owner| owner.controller && owner.kind == LINK_KIND)
        else {
            return Vec::new();
        };
        let key = NamespacedName::new(device.metadata.namespace.clone(), owner.name.clone());
        match self.store.get_as::<DeviceLink>(&ResourceKind::DeviceLink, &key).await {
            Ok(link) if predicate::assigned_to(&link, &self.node_name) => vec![key],
            _ => Vec::new(),
        }
    }

    async fn referencing(&self, kind: &ResourceKind, key: &NamespacedName) -> Vec<NamespacedName> {
        self.local_links()
            .await
            .into_iter()
            .filter(|link| link.metadata.namespace == key.namespace)
            .filter(|link| {
                link.spec.references.iter().any(|entry| match (&entry.source, kind) {
                    (ReferenceSourceKind::Secret(source), ResourceKind::Secret)
                    | (ReferenceSourceKind::ConfigMap(source), ResourceKind::ConfigMap) => {
                        source.name == key.name
                    }
                    _ => false,
                })
            })
            .map(|link| link.key())
            .collect()
    }
}

#[async_trait]
impl Trigger for BinderTrigger {
    async fn keys_for(&self, event: &WatchEvent) -> Vec<NamespacedName> {
        match &event.object {
            Object::DeviceLink(link) => {
                let old = match &event.old {
                    Some(Object::DeviceLink(old)) => Some(old),
                    _ => None,
                };
                let assigned = predicate::assigned_to(link, &self.node_name)
                    || old.is_some_and(|old| predicate::assigned_to(old, &self.node_name));
                if !assigned {
                    return Vec::new();
                }
                match (event.event_type, old) {
                    (WatchEventType::Deleted, _) => Vec::new(),
                    (WatchEventType::Modified, Some(old)) => {
                        if predicate::limb_should_reconcile(old, link) {
                            vec![link.key()]
                        } else {
                            Vec::new()
                        }
                    }
                    _ => vec![link.key()],
                }
            }
            Object::Device(device) if event.event_type == WatchEventType::Deleted => {
                self.owner_of(device).await
            }
            Object::Secret(_) | Object::ConfigMap(_) => {
                self.referencing(&event.kind(), &event.key()).await
            }
            _ => Vec::new(),
        }
    }
}

/// 适配器注册或注销时，重新入队本节点上使用该适配器的 link。
pub async fn requeue_on_adaptor_events(
    node_name: String,
    store: Arc<dyn ResourceStore>,
    connections: Arc<ConnectionManager>,
    queue: Arc<WorkQueue<NamespacedName>>,
    cancel: CancellationToken,
) {
    let trigger = BinderTrigger::new(node_name, store);
    let mut events = connections.subscribe();
    loop {
        let adaptor = tokio::select! {
            _ = cancel.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => Some(event),
                Err(RecvError::Lagged(_)) => None,
                Err(RecvError::Closed) => break,
            },
        };
        let links = trigger.local_links().await;
        for link in links {
            let matched = match &adaptor {
                Some(AdaptorEvent::Registered(name)) | Some(AdaptorEvent::Unregistered(name)) => {
                    link.spec.adaptor.name == *name || link.status.adaptor_name == *name
                }
                None => true,
            };
            if matched {
                queue.add(link.key());
            }
        }
    }
}
