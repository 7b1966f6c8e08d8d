use domain::{
    AdaptorRef, ConditionStatus, ConditionType, Conditions, Device, DeviceLink, DeviceLinkSpec,
    ModelRef, ModelSchema, ModelVersion, OwnerReference, ReferenceSourceKind, reasons,
    schema_name_for,
};

fn sample_link() -> DeviceLink {
    DeviceLink::new(
        "default",
        "living-room-fan",
        DeviceLinkSpec {
            adaptor: AdaptorRef {
                node: "n1".to_string(),
                name: "ble".to_string(),
            },
            model: ModelRef::new("devices.devlink.io", "v1alpha1", "DummyDevice"),
            ..DeviceLinkSpec::default()
        },
    )
}

#[test]
fn set_condition_keeps_transition_time_when_status_unchanged() {
    let mut conditions = Conditions::default();
    assert!(conditions.set(
        ConditionType::NodeExisted,
        ConditionStatus::False,
        reasons::NODE_NOT_FOUND,
        "missing",
        1_000,
    ));
    assert!(conditions.set(
        ConditionType::NodeExisted,
        ConditionStatus::False,
        reasons::NODE_NOT_FOUND,
        "still missing",
        2_000,
    ));
    let condition = conditions.get(ConditionType::NodeExisted).expect("condition");
    assert_eq!(condition.last_transition_time_ms, 1_000);
    assert_eq!(condition.message, "still missing");

    assert!(!conditions.set(
        ConditionType::NodeExisted,
        ConditionStatus::False,
        reasons::NODE_NOT_FOUND,
        "still missing",
        3_000,
    ));

    conditions.set(
        ConditionType::NodeExisted,
        ConditionStatus::True,
        reasons::NODE_ACTIVE,
        "",
        4_000,
    );
    let condition = conditions.get(ConditionType::NodeExisted).expect("condition");
    assert_eq!(condition.last_transition_time_ms, 4_000);
    assert_eq!(conditions.len(), 1);
}

#[test]
fn missing_condition_reads_unknown() {
    let link = sample_link();
    assert_eq!(
        link.condition(ConditionType::DeviceConnected),
        ConditionStatus::Unknown
    );
}

#[test]
fn finalizer_round_trip() {
    let mut link = sample_link();
    assert!(!link.has_finalizer());
    assert!(link.add_finalizer());
    assert!(!link.add_finalizer());
    assert_eq!(link.metadata.finalizers.len(), 1);
    assert!(link.remove_finalizer());
    assert!(!link.remove_finalizer());
    assert!(!link.is_deleted());
    link.metadata.deletion_timestamp_ms = Some(10);
    assert!(link.is_deleted());
}

#[test]
fn transitions_bind_status_snapshots() {
    let mut link = sample_link();
    link.succeed_on_node_existed("n1");
    link.succeed_on_model_existed();
    link.succeed_on_adaptor_existed();
    assert_eq!(link.status.node_name, "n1");
    assert_eq!(link.status.adaptor_name, "ble");
    assert_eq!(link.status.model.as_ref(), Some(&link.spec.model));

    link.fail_on_node_existed(reasons::NODE_NOT_FOUND, "gone");
    link.fail_on_model_existed(reasons::MODEL_NOT_FOUND, "gone");
    link.fail_on_adaptor_existed(reasons::ADAPTOR_NOT_FOUND, "gone");
    assert!(link.status.node_name.is_empty());
    assert!(link.status.adaptor_name.is_empty());
    assert!(link.status.model.is_none());
    assert_eq!(link.status.conditions.len(), 3);
}

#[test]
fn schema_name_and_version_acceptance() {
    let model = ModelRef::new("devices.devlink.io", "v1alpha1", "DummyDevice");
    assert_eq!(schema_name_for(&model), "dummydevices.devices.devlink.io");

    let schema = ModelSchema::for_model(
        &model,
        vec![
            ModelVersion {
                name: "v1alpha1".to_string(),
                served: true,
                storage: true,
            },
            ModelVersion {
                name: "v1beta1".to_string(),
                served: false,
                storage: false,
            },
        ],
    );
    assert_eq!(schema.metadata.name, "dummydevices.devices.devlink.io");
    assert!(schema.accepts("v1alpha1"));
    assert!(!schema.accepts("v1beta1"));
    assert!(!schema.accepts("v2"));
}

#[test]
fn cleaned_device_drops_server_fields() {
    let model = ModelRef::new("devices.devlink.io", "v1alpha1", "DummyDevice");
    let mut device = Device::empty(&model).expect("device");
    device.metadata.name = "fan".to_string();
    device.metadata.namespace = "default".to_string();
    device.metadata.uid = "uid-1".to_string();
    device.metadata.resource_version = 7;
    device.metadata.generation = 3;
    device.metadata.creation_timestamp_ms = Some(1);
    device.metadata.finalizers.push("x".to_string());
    device.metadata.owner_references.push(OwnerReference {
        name: "fan".to_string(),
        uid: "link-uid".to_string(),
        ..OwnerReference::default()
    });
    device.status = Some(serde_json::json!({ "on": true }));

    let payload = serde_json::to_value(device.cleaned()).expect("json");
    let metadata = payload.get("metadata").expect("metadata");
    assert_eq!(metadata.get("name"), Some(&serde_json::json!("fan")));
    assert!(metadata.get("resourceVersion").is_none());
    assert!(metadata.get("generation").is_none());
    assert!(metadata.get("creationTimestampMs").is_none());
    assert!(metadata.get("finalizers").is_none());
    assert!(metadata.get("ownerReferences").is_some());
    assert!(payload.get("status").is_none());
    assert_eq!(payload.get("kind"), Some(&serde_json::json!("DummyDevice")));
}

#[test]
fn empty_device_requires_kind() {
    let model = ModelRef::new("devices.devlink.io", "v1alpha1", "");
    assert!(Device::empty(&model).is_err());
}

#[test]
fn reference_entry_uses_single_source_key() {
    let link: DeviceLinkSpec = serde_json::from_value(serde_json::json!({
        "adaptor": { "node": "n1", "name": "ble" },
        "model": { "group": "devices.devlink.io", "version": "v1alpha1", "kind": "DummyDevice" },
        "references": [
            { "name": "credential", "secret": { "name": "ble-secret", "items": ["token"] } },
            { "name": "self", "downwardAPI": { "items": [
                { "name": "node", "fieldRef": { "fieldPath": "spec.adaptor.node" } }
            ] } }
        ]
    }))
    .expect("spec");
    assert_eq!(link.references.len(), 2);
    assert!(matches!(
        link.references[0].source,
        ReferenceSourceKind::Secret(ref source) if source.name == "ble-secret"
    ));
    assert!(matches!(
        link.references[1].source,
        ReferenceSourceKind::DownwardApi(_)
    ));
}
