//! 变更通知。

use crate::object::{Object, ResourceKind};
use domain::NamespacedName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

/// 一次变更：`old` 为变更前对象（Added 时为空），`object` 为变更后对象
/// （Deleted 时为删除前的最后状态）。
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub event_type: WatchEventType,
    pub old: Option<Object>,
    pub object: Object,
}

impl WatchEvent {
    pub fn kind(&self) -> ResourceKind {
        self.object.kind()
    }

    pub fn key(&self) -> NamespacedName {
        self.object.key()
    }

    /// 合成的 Added 事件（启动时全量同步使用）。
    pub fn synthetic(object: Object) -> Self {
        Self {
            event_type: WatchEventType::Added,
            old: None,
            object,
        }
    }
}
