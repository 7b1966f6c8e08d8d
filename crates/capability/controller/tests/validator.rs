mod support;

use devlink_controller::{Action, Trigger, ValidatorTrigger};
use devlink_storage::{Object, ResourceKind, ResourceStore, StoreExt, WatchEvent, WatchEventType};
use domain::{
    ConditionStatus, ConditionType, ModelSchema, ModelVersion, NamespacedName, Node, reasons,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::{Harness, NODE, key, link, model, served};

#[tokio::test]
async fn missing_node_is_reported() {
    let harness = Harness::new().await;
    harness.create_link(link("lamp")).await;

    assert_eq!(harness.brain("lamp").await, Action::Done);
    let stored = harness.link("lamp").await;
    let condition = stored
        .status
        .conditions
        .get(ConditionType::NodeExisted)
        .expect("node condition");
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason, reasons::NODE_NOT_FOUND);
    assert_eq!(condition.message, "adaptor node isn't existed");
    assert!(stored.status.node_name.is_empty());
    assert_eq!(stored.condition(ConditionType::ModelExisted), ConditionStatus::Unknown);
}

#[tokio::test]
async fn missing_model_is_reported() {
    let harness = Harness::new().await;
    harness.add_node(NODE).await;
    harness.create_link(link("lamp")).await;

    assert_eq!(harness.brain("lamp").await, Action::Done);
    let stored = harness.link("lamp").await;
    assert_eq!(stored.condition(ConditionType::NodeExisted), ConditionStatus::True);
    assert_eq!(stored.status.node_name, NODE);
    let condition = stored
        .status
        .conditions
        .get(ConditionType::ModelExisted)
        .expect("model condition");
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.message, "model isn't existed");
    assert!(stored.status.model.is_none());
}

#[tokio::test]
async fn unserved_version_is_reported() {
    let harness = Harness::new().await;
    harness.add_node(NODE).await;
    harness
        .store
        .create_as(ModelSchema::for_model(
            &model(),
            vec![
                ModelVersion {
                    name: "v1".into(),
                    served: false,
                    storage: false,
                },
                served("v2"),
            ],
        ))
        .await
        .expect("schema");
    harness.create_link(link("lamp")).await;

    assert_eq!(harness.brain("lamp").await, Action::Done);
    let stored = harness.link("lamp").await;
    let condition = stored
        .status
        .conditions
        .get(ConditionType::ModelExisted)
        .expect("model condition");
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason, reasons::MODEL_VERSION_NOT_SERVED);
    assert_eq!(condition.message, "model version isn't served");
}

#[tokio::test]
async fn valid_cluster_binds_node_and_model() {
    let harness = Harness::with_cluster().await;
    harness.create_link(link("lamp")).await;

    assert_eq!(harness.brain("lamp").await, Action::Done);
    let stored = harness.link("lamp").await;
    assert_eq!(stored.condition(ConditionType::NodeExisted), ConditionStatus::True);
    assert_eq!(stored.condition(ConditionType::ModelExisted), ConditionStatus::True);
    assert_eq!(stored.status.node_name, NODE);
    assert_eq!(stored.status.model, Some(model()));

    // 再次调谐不写入
    let version = stored.metadata.resource_version;
    assert_eq!(harness.brain("lamp").await, Action::Done);
    assert_eq!(harness.link("lamp").await.metadata.resource_version, version);
}

#[tokio::test]
async fn node_read_failure_requeues() {
    let harness = Harness::with_cluster().await;
    harness.create_link(link("lamp")).await;
    harness.store.fail_node_reads.store(true, Ordering::SeqCst);

    assert_eq!(harness.brain("lamp").await, Action::Requeue);
    assert_eq!(
        harness.link("lamp").await.condition(ConditionType::NodeExisted),
        ConditionStatus::Unknown
    );
}

#[tokio::test]
async fn missing_link_is_done() {
    let harness = Harness::with_cluster().await;
    assert_eq!(harness.brain("ghost").await, Action::Done);
}

#[tokio::test]
async fn orphaned_link_finalizer_is_released() {
    let harness = Harness::with_cluster().await;
    harness.create_link(link("lamp")).await;
    assert_eq!(harness.converge("lamp").await, Action::Done);

    harness
        .store
        .delete(&ResourceKind::Node, &NamespacedName::cluster(NODE))
        .await
        .expect("delete node");
    harness
        .store
        .delete(&ResourceKind::DeviceLink, &key("lamp"))
        .await
        .expect("delete link");
    assert!(harness.link("lamp").await.has_finalizer());

    assert_eq!(harness.brain("lamp").await, Action::Done);
    assert!(
        harness
            .store
            .get(&ResourceKind::DeviceLink, &key("lamp"))
            .await
            .expect_err("link removed")
            .is_not_found()
    );
}

#[tokio::test]
async fn deleted_link_on_live_node_is_left_to_binder() {
    let harness = Harness::with_cluster().await;
    harness.create_link(link("lamp")).await;
    assert_eq!(harness.converge("lamp").await, Action::Done);
    harness
        .store
        .delete(&ResourceKind::DeviceLink, &key("lamp"))
        .await
        .expect("delete link");

    assert_eq!(harness.brain("lamp").await, Action::Done);
    let stored = harness.link("lamp").await;
    assert!(stored.is_deleted());
    assert!(stored.has_finalizer());
}

#[tokio::test]
async fn trigger_follows_nodes_and_schemas() {
    let harness = Harness::new().await;
    let store: Arc<dyn ResourceStore> = harness.store.clone();
    let trigger = ValidatorTrigger::new(store);
    harness.create_link(link("lamp")).await;
    let mut elsewhere = link("fan");
    elsewhere.spec.adaptor.node = "edge-2".into();
    harness.create_link(elsewhere).await;

    let node = harness.store.create_as(Node::new(NODE)).await.expect("node");
    let keys = trigger
        .keys_for(&WatchEvent::synthetic(Object::Node(node)))
        .await;
    assert_eq!(keys, vec![key("lamp")]);

    let schema = ModelSchema::for_model(&model(), vec![served("v1")]);
    let keys = trigger
        .keys_for(&WatchEvent::synthetic(Object::ModelSchema(
            schema,
        )))
        .await;
    assert_eq!(keys, vec![key("fan"), key("lamp")]);
}

#[tokio::test]
async fn trigger_ignores_status_only_changes() {
    let harness = Harness::with_cluster().await;
    let store: Arc<dyn ResourceStore> = harness.store.clone();
    let trigger = ValidatorTrigger::new(store);
    let old = harness.create_link(link("lamp")).await;
    let mut new = old.clone();
    new.status.node_name = NODE.into();

    let event = WatchEvent {
        event_type: WatchEventType::Modified,
        old: Some(Object::DeviceLink(old.clone())),
        object: Object::DeviceLink(new),
    };
    assert!(trigger.keys_for(&event).await.is_empty());

    let mut respec = old.clone();
    respec.spec.adaptor.name = "zigbee".into();
    let event = WatchEvent {
        event_type: WatchEventType::Modified,
        old: Some(Object::DeviceLink(old)),
        object: Object::DeviceLink(respec),
    };
    assert_eq!(trigger.keys_for(&event).await, vec![key("lamp")]);
}
