//! 连接指标。
//!
//! 所有指标按适配器名打标签，记录操作只做原子累加，不返回错误。

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// 指标记录接口（由连接管理器调用）。
pub trait MetricsRecorder: Send + Sync {
    /// 建立连接失败。
    fn increase_connect_errors(&self, adaptor: &str);
    /// 发送失败（含序列化失败）。
    fn increase_send_errors(&self, adaptor: &str);
    /// 一次发送（序列化 + 发送）的耗时。
    fn observe_send_latency(&self, adaptor: &str, latency: Duration);
    /// 新增连接。
    fn increase_connections(&self, adaptor: &str);
    /// 连接移除。
    fn decrease_connections(&self, adaptor: &str);
}

#[derive(Default)]
struct AdaptorCounters {
    connect_errors: AtomicU64,
    send_errors: AtomicU64,
    send_latency_us_total: AtomicU64,
    send_latency_count: AtomicU64,
    connections: AtomicI64,
}

/// 单个适配器的指标快照。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptorMetricsSnapshot {
    pub adaptor: String,
    pub connect_errors: u64,
    pub send_errors: u64,
    pub send_latency_us_total: u64,
    pub send_latency_count: u64,
    pub connections: i64,
}

/// 节点绑定循环的连接指标。
#[derive(Default)]
pub struct LimbMetrics {
    adaptors: RwLock<HashMap<String, Arc<AdaptorCounters>>>,
}

impl LimbMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, adaptor: &str) -> Option<Arc<AdaptorCounters>> {
        if let Ok(guard) = self.adaptors.read() {
            if let Some(counters) = guard.get(adaptor) {
                return Some(counters.clone());
            }
        }
        let mut guard = self.adaptors.write().ok()?;
        Some(guard.entry(adaptor.to_string()).or_default().clone())
    }

    /// 按适配器名排序的快照。
    pub fn snapshot(&self) -> Vec<AdaptorMetricsSnapshot> {
        let Ok(guard) = self.adaptors.read() else {
            return Vec::new();
        };
        let mut items: Vec<AdaptorMetricsSnapshot> = guard
            .iter()
            .map(|(adaptor, counters)| AdaptorMetricsSnapshot {
                adaptor: adaptor.clone(),
                connect_errors: counters.connect_errors.load(Ordering::Relaxed),
                send_errors: counters.send_errors.load(Ordering::Relaxed),
                send_latency_us_total: counters.send_latency_us_total.load(Ordering::Relaxed),
                send_latency_count: counters.send_latency_count.load(Ordering::Relaxed),
                connections: counters.connections.load(Ordering::Relaxed),
            })
            .collect();
        items.sort_by(|a, b| a.adaptor.cmp(&b.adaptor));
        items
    }

    /// 单个适配器的快照，未记录过时为全零。
    pub fn adaptor(&self, adaptor: &str) -> AdaptorMetricsSnapshot {
        self.snapshot()
            .into_iter()
            .find(|item| item.adaptor == adaptor)
            .unwrap_or_else(|| AdaptorMetricsSnapshot {
                adaptor: adaptor.to_string(),
                ..AdaptorMetricsSnapshot::default()
            })
    }
}

impl MetricsRecorder for LimbMetrics {
    fn increase_connect_errors(&self, adaptor: &str) {
        if let Some(counters) = self.counters(adaptor) {
            counters.connect_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn increase_send_errors(&self, adaptor: &str) {
        if let Some(counters) = self.counters(adaptor) {
            counters.send_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn observe_send_latency(&self, adaptor: &str, latency: Duration) {
        if let Some(counters) = self.counters(adaptor) {
            // 微秒精度：进程内传输的发送通常不足 1ms
            let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
            counters
                .send_latency_us_total
                .fetch_add(micros, Ordering::Relaxed);
            counters
                .send_latency_count
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    fn increase_connections(&self, adaptor: &str) {
        if let Some(counters) = self.counters(adaptor) {
            counters.connections.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn decrease_connections(&self, adaptor: &str) {
        if let Some(counters) = self.counters(adaptor) {
            counters.connections.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
