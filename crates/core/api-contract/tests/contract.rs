use api_contract::{
    AdaptorMetricsDto, ApiResponse, ApplyLinkRequest, ApplySecretRequest, DeviceQuery, EventDto,
    MetricsSnapshotDto,
};
use domain::ReferenceSourceKind;

#[test]
fn apply_link_request_parses_camel_case() {
    let payload = r#"{
        "labels": {"room": "kitchen"},
        "spec": {
            "adaptor": {"node": "edge-1", "name": "dummy"},
            "model": {"group": "devices.example.io", "version": "v1", "kind": "DummyDevice"},
            "template": {"spec": "{\"rate\":5}"},
            "references": [
                {"name": "auth", "secret": {"name": "credentials", "items": ["token"]}},
                {"name": "self", "downwardAPI": {"items": [
                    {"name": "node", "fieldRef": {"fieldPath": "spec.adaptor.node"}}
                ]}}
            ]
        }
    }"#;
    let req: ApplyLinkRequest = serde_json::from_str(payload).expect("parse");
    assert_eq!(req.labels["room"], "kitchen");
    assert_eq!(req.spec.adaptor.node, "edge-1");
    assert_eq!(req.spec.model.api_version(), "devices.example.io/v1");
    assert_eq!(req.spec.references.len(), 2);
    assert!(matches!(
        req.spec.references[0].source,
        ReferenceSourceKind::Secret(ref source) if source.items == vec!["token".to_string()]
    ));
    assert!(matches!(
        req.spec.references[1].source,
        ReferenceSourceKind::DownwardApi(_)
    ));
}

#[test]
fn reference_without_source_is_rejected() {
    let payload = r#"{
        "spec": {
            "adaptor": {"node": "edge-1", "name": "dummy"},
            "model": {"version": "v1", "kind": "DummyDevice"},
            "references": [{"name": "auth"}]
        }
    }"#;
    assert!(serde_json::from_str::<ApplyLinkRequest>(payload).is_err());
}

#[test]
fn secret_values_are_base64() {
    let req: ApplySecretRequest =
        serde_json::from_str(r#"{"data": {"password": "czNjcmV0"}}"#).expect("parse");
    let data = req.decode().expect("decode");
    assert_eq!(data["password"], b"s3cret".to_vec());

    let req: ApplySecretRequest =
        serde_json::from_str(r#"{"data": {"password": "not base64!"}}"#).expect("parse");
    assert_eq!(req.decode().expect_err("invalid"), "password");
}

#[test]
fn device_query_uses_api_version() {
    let query: DeviceQuery =
        serde_json::from_str(r#"{"apiVersion": "devices.example.io/v1", "kind": "DummyDevice"}"#)
            .expect("parse");
    assert_eq!(query.api_version, "devices.example.io/v1");
}

#[test]
fn metrics_snapshot_is_camel_case() {
    let snapshot = MetricsSnapshotDto {
        node_name: "edge-1".to_string(),
        registered_adaptors: vec!["log".to_string()],
        adaptors: vec![AdaptorMetricsDto {
            adaptor: "log".to_string(),
            connect_errors: 1,
            send_errors: 0,
            send_latency_us_total: 12,
            send_latency_count: 3,
            connections: 2,
        }],
    };
    let value = serde_json::to_value(snapshot).expect("serialize");
    assert_eq!(value["nodeName"], "edge-1");
    assert_eq!(value["adaptors"][0]["connectErrors"], 1);
    assert_eq!(value["adaptors"][0]["sendLatencyUsTotal"], 12);
    assert_eq!(value["adaptors"][0]["sendLatencyCount"], 3);
    assert!(value["adaptors"][0].get("connect_errors").is_none());
}

#[test]
fn event_type_is_renamed() {
    let event = EventDto {
        namespace: "default".to_string(),
        name: "lamp".to_string(),
        event_type: "Warning".to_string(),
        reason: "FailedFetched".to_string(),
        message: "cannot fetch".to_string(),
        timestamp_ms: 1_700_000_000_000,
    };
    let value = serde_json::to_value(event).expect("serialize");
    assert_eq!(value["type"], "Warning");
    assert_eq!(value["timestampMs"], 1_700_000_000_000_i64);
}

#[test]
fn error_envelope_carries_code_without_data() {
    let response = ApiResponse::<()>::error("RESOURCE.CONFLICT", "resource version is stale");
    let value = serde_json::to_value(&response).expect("serialize");
    assert_eq!(value["success"], false);
    assert!(value["data"].is_null());
    assert_eq!(value["error"]["code"], "RESOURCE.CONFLICT");

    let value = serde_json::to_value(ApiResponse::success(vec!["log"])).expect("serialize");
    assert_eq!(value["success"], true);
    assert!(value["error"].is_null());
    assert_eq!(value["data"][0], "log");
}
