use devlink_telemetry::{
    EventRecorder, LimbMetrics, MetricsRecorder, RecentEvents, new_request_ids,
};
use domain::NamespacedName;
use std::time::Duration;

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn metrics_are_labelled_by_adaptor() {
    let metrics = LimbMetrics::new();
    metrics.increase_connections("ble");
    metrics.increase_connections("ble");
    metrics.decrease_connections("ble");
    metrics.increase_connect_errors("mqtt");
    metrics.observe_send_latency("ble", Duration::from_millis(12));
    metrics.observe_send_latency("ble", Duration::from_micros(250));
    metrics.increase_send_errors("ble");

    let ble = metrics.adaptor("ble");
    assert_eq!(ble.connections, 1);
    assert_eq!(ble.send_errors, 1);
    // 不足 1ms 的发送同样计入总耗时
    assert_eq!(ble.send_latency_us_total, 12_250);
    assert_eq!(ble.send_latency_count, 2);
    assert_eq!(ble.connect_errors, 0);

    let snapshot = metrics.snapshot();
    let names: Vec<&str> = snapshot.iter().map(|item| item.adaptor.as_str()).collect();
    assert_eq!(names, vec!["ble", "mqtt"]);
    assert_eq!(metrics.adaptor("opcua").connections, 0);
}

#[test]
fn recent_events_are_bounded() {
    let events = RecentEvents::new(2);
    let lamp = NamespacedName::new("default", "lamp");
    let fan = NamespacedName::new("default", "fan");
    events.warning(&lamp, "FailedFetched", "secret missing");
    events.warning(&fan, "FailedConnected", "adaptor down");
    events.warning(&lamp, "FailedUpdated", "rejected");

    let all = events.snapshot();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].reason, "FailedConnected");
    assert_eq!(all[1].reason, "FailedUpdated");
    assert_eq!(events.for_object(&lamp).len(), 1);
    assert_eq!(all[1].event_type, "Warning");
}
