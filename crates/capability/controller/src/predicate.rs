//! DeviceLink 事件谓词。
//!
//! 每个循环只对"自己关心的变化"做出反应，这样自身的 status 写入不会触发无意义的调谐。

use domain::{ConditionType, DeviceLink};

/// link 是否归属某节点：当前分配的节点，或最后确认的节点（节点迁移时旧节点需要断开）。
pub fn assigned_to(link: &DeviceLink, node: &str) -> bool {
    link.spec.adaptor.node == node || link.status.node_name == node
}

/// 生命周期相关的元数据是否变化（删除时间戳、finalizer）。
fn lifecycle_changed(old: &DeviceLink, new: &DeviceLink) -> bool {
    old.metadata.deletion_timestamp_ms != new.metadata.deletion_timestamp_ms
        || old.metadata.finalizers != new.metadata.finalizers
}

/// 集群校验循环：spec 或生命周期变化。
pub fn brain_should_reconcile(old: &DeviceLink, new: &DeviceLink) -> bool {
    old.spec != new.spec || lifecycle_changed(old, new)
}

/// 节点绑定循环：spec、生命周期或集群校验写入的 status 变化。
///
/// 只改动绑定循环自有条件（AdaptorExisted、DeviceCreated、DeviceConnected）的写入被忽略。
pub fn limb_should_reconcile(old: &DeviceLink, new: &DeviceLink) -> bool {
    if old.spec != new.spec || lifecycle_changed(old, new) {
        return true;
    }
    old.status.node_name != new.status.node_name
        || old.status.model != new.status.model
        || old.status.conditions.get(ConditionType::NodeExisted)
            != new.status.conditions.get(ConditionType::NodeExisted)
        || old.status.conditions.get(ConditionType::ModelExisted)
            != new.status.conditions.get(ConditionType::ModelExisted)
}
