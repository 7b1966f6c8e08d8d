//! 设备链接领域模型：所有模块共享的实体与状态词汇。
//!
//! - [`link`]：DeviceLink 及其 spec/status、finalizer、条件迁移
//! - [`condition`]：条件类型与条件表
//! - [`device`]：下游 Device 文档
//! - [`cluster`]：Node、ModelSchema、Secret、ConfigMap
//! - [`meta`]：对象元数据与命名空间标识

pub mod cluster;
pub mod condition;
pub mod device;
pub mod link;
pub mod meta;

pub use cluster::{ConfigMap, ModelSchema, ModelVersion, Node, Secret, schema_name_for};
pub use condition::{ConditionStatus, ConditionType, Conditions, LinkCondition};
pub use device::{Device, DeviceType, ModelError};
pub use link::{
    ADAPTOR_NAME_ANNOTATION, AdaptorRef, BINDER_FINALIZER, DeviceLink, DeviceLinkSpec,
    DeviceLinkStatus, DeviceTemplate, DownwardItem, DownwardSource, FieldSelector, ItemsSource,
    LINK_API_VERSION, LINK_KIND, ModelRef, NODE_NAME_ANNOTATION, ReferenceData, ReferenceEntry,
    ReferenceSourceKind, reasons,
};
pub use meta::{NamespacedName, ObjectMeta, OwnerReference, now_epoch_ms};
