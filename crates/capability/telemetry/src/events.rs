//! 告警事件记录。

use domain::{NamespacedName, now_epoch_ms};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;

/// 事件记录接口：尽力而为，不返回错误。
pub trait EventRecorder: Send + Sync {
    fn warning(&self, involved: &NamespacedName, reason: &str, message: &str);
}

/// 一条已记录的事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub involved: NamespacedName,
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub timestamp_ms: i64,
}

/// 最近事件环形缓冲，同时写入日志。
pub struct RecentEvents {
    capacity: usize,
    items: Mutex<VecDeque<EventRecord>>,
}

impl RecentEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// 按时间从旧到新返回事件。
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.items
            .lock()
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 某对象的事件（测试与排障使用）。
    pub fn for_object(&self, involved: &NamespacedName) -> Vec<EventRecord> {
        self.snapshot()
            .into_iter()
            .filter(|record| &record.involved == involved)
            .collect()
    }
}

impl Default for RecentEvents {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventRecorder for RecentEvents {
    fn warning(&self, involved: &NamespacedName, reason: &str, message: &str) {
        warn!(
            target: "devlink.events",
            object = %involved,
            reason,
            message,
            "warning event"
        );
        let Ok(mut items) = self.items.lock() else {
            return;
        };
        if items.len() == self.capacity {
            items.pop_front();
        }
        items.push_back(EventRecord {
            involved: involved.clone(),
            event_type: "Warning".to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            timestamp_ms: now_epoch_ms(),
        });
    }
}
