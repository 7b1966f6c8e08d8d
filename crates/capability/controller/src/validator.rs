//! 集群校验循环（brain）。
//!
//! 确认 link 指定的节点存在且可用、设备模型 schema 存在且服务请求的版本，
//! 并把结果写入 NodeExisted / ModelExisted。不接触 Device 与连接。
//!
//! 唯一的 finalizer 路径：link 已删除而节点已不可用时，
//! 节点上的绑定循环不会再处理它，由这里直接移除 finalizer。

use crate::predicate;
use crate::runtime::{Action, Reconciler, Trigger};
use async_trait::async_trait;
use devlink_storage::{
    Object, ResourceKind, ResourceStore, StorageError, StoreExt, WatchEvent, WatchEventType,
};
use domain::{
    ConditionStatus, ConditionType, DeviceLink, ModelSchema, NamespacedName, Node, reasons,
    schema_name_for,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ClusterValidator {
    store: Arc<dyn ResourceStore>,
}

impl ClusterValidator {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// 节点是否存在且未被删除；NotFound 视为不可用。
    async fn node_active(&self, name: &str) -> Result<bool, StorageError> {
        match self
            .store
            .get_as::<Node>(&ResourceKind::Node, &NamespacedName::cluster(name))
            .await
        {
            Ok(node) => Ok(node.is_active()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn model_schema(&self, link: &DeviceLink) -> Result<Option<ModelSchema>, StorageError> {
        let key = NamespacedName::cluster(schema_name_for(&link.spec.model));
        match self
            .store
            .get_as::<ModelSchema>(&ResourceKind::ModelSchema, &key)
            .await
        {
            Ok(schema) if schema.is_active() => Ok(Some(schema)),
            Ok(_) => Ok(None),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn persist_status(&self, link: DeviceLink) -> Action {
        let key = link.key();
        match self.store.update_status_as(link).await {
            Ok(_) => Action::Done,
            Err(err) => {
                warn!(target: "devlink.brain", link = %key, error = %err, "unable to change the status of link");
                Action::Requeue
            }
        }
    }

    /// 已删除的 link：节点不可用时由本循环移除绑定循环的 finalizer。
    async fn release_orphaned(&self, mut link: DeviceLink) -> Action {
        if !link.has_finalizer() {
            return Action::Done;
        }
        let key = link.key();
        let mut controlled_by_limb = false;
        if link.condition(ConditionType::NodeExisted) != ConditionStatus::False {
            match self.node_active(&link.spec.adaptor.node).await {
                Ok(active) => controlled_by_limb = active,
                Err(err) => {
                    warn!(target: "devlink.brain", link = %key, error = %err, "unable to fetch the adaptor node of link");
                    return Action::Requeue;
                }
            }
        }
        if controlled_by_limb {
            return Action::Done;
        }

        link.remove_finalizer();
        match self.store.update_as(link).await {
            Ok(_) => {
                info!(target: "devlink.brain", link = %key, "released finalizer of orphaned link");
                Action::Done
            }
            Err(err) => {
                warn!(target: "devlink.brain", link = %key, error = %err, "unable to remove finalizer from link");
                Action::Requeue
            }
        }
    }
}

#[async_trait]
impl Reconciler for ClusterValidator {
    async fn reconcile(&self, key: &NamespacedName) -> Action {
        let mut link: DeviceLink = match self.store.get_as(&ResourceKind::DeviceLink, key).await {
            Ok(link) => link,
            Err(err) if err.is_not_found() => return Action::Done,
            Err(err) => {
                warn!(target: "devlink.brain", link = %key, error = %err, "unable to fetch link");
                return Action::Requeue;
            }
        };

        if link.is_deleted() {
            return self.release_orphaned(link).await;
        }

        // 节点
        match self.node_active(&link.spec.adaptor.node).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(target: "devlink.brain", link = %key, node = %link.spec.adaptor.node, "adaptor node is absent");
                link.fail_on_node_existed(reasons::NODE_NOT_FOUND, "adaptor node isn't existed");
                return self.persist_status(link).await;
            }
            Err(err) => {
                warn!(target: "devlink.brain", link = %key, error = %err, "unable to fetch the adaptor node of link");
                return Action::Requeue;
            }
        }
        let node_name = link.spec.adaptor.node.clone();
        link.succeed_on_node_existed(&node_name);

        // 模型
        let schema = match self.model_schema(&link).await {
            Ok(Some(schema)) => schema,
            Ok(None) => {
                link.fail_on_model_existed(reasons::MODEL_NOT_FOUND, "model isn't existed");
                return self.persist_status(link).await;
            }
            Err(err) => {
                warn!(target: "devlink.brain", link = %key, error = %err, "unable to fetch the model of link");
                return Action::Requeue;
            }
        };
        if !schema.accepts(&link.spec.model.version) {
            link.fail_on_model_existed(
                reasons::MODEL_VERSION_NOT_SERVED,
                "model version isn't served",
            );
            return self.persist_status(link).await;
        }
        link.succeed_on_model_existed();

        self.persist_status(link).await
    }
}

/// brain 的事件映射：link 自身变化，以及其引用的节点或模型 schema 变化。
pub struct ValidatorTrigger {
    store: Arc<dyn ResourceStore>,
}

impl ValidatorTrigger {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    async fn links_matching(&self, matches: impl Fn(&DeviceLink) -> bool + Send) -> Vec<NamespacedName> {
        match self.store.list_as::<DeviceLink>(&ResourceKind::DeviceLink).await {
            Ok(links) => links
                .iter()
                .filter(|link| matches(link))
                .map(DeviceLink::key)
                .collect(),
            Err(err) => {
                warn!(target: "devlink.brain", error = %err, "unable to list links");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Trigger for ValidatorTrigger {
    async fn keys_for(&self, event: &WatchEvent) -> Vec<NamespacedName> {
        match (&event.object, &event.old) {
            (Object::DeviceLink(link), old) => match (event.event_type, old) {
                (WatchEventType::Deleted, _) => Vec::new(),
                (WatchEventType::Modified, Some(Object::DeviceLink(old))) => {
                    if predicate::brain_should_reconcile(old, link) {
                        vec![link.key()]
                    } else {
                        Vec::new()
                    }
                }
                _ => vec![link.key()],
            },
            (Object::Node(node), _) => {
                let name = node.metadata.name.clone();
                self.links_matching(move |link| link.spec.adaptor.node == name)
                    .await
            }
            (Object::ModelSchema(schema), _) => {
                let name = schema.metadata.name.clone();
                self.links_matching(move |link| schema_name_for(&link.spec.model) == name)
                    .await
            }
            _ => Vec::new(),
        }
    }
}
