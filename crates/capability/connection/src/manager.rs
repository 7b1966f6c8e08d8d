//! 连接管理器：适配器注册表与每设备连接的生命周期。

use crate::adaptor::{Adaptor, Dialer};
use crate::error::ConnectError;
use devlink_telemetry::MetricsRecorder;
use domain::{Device, DeviceLink, NamespacedName, ReferenceData};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// 适配器注册表变化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdaptorEvent {
    Registered(String),
    Unregistered(String),
}

impl AdaptorEvent {
    pub fn adaptor(&self) -> &str {
        match self {
            AdaptorEvent::Registered(name) | AdaptorEvent::Unregistered(name) => name,
        }
    }
}

pub struct ConnectionManager {
    adaptors: RwLock<HashMap<String, Arc<Adaptor>>>,
    metrics: Arc<dyn MetricsRecorder>,
    events: broadcast::Sender<AdaptorEvent>,
}

impl ConnectionManager {
    pub fn new(metrics: Arc<dyn MetricsRecorder>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            adaptors: RwLock::new(HashMap::new()),
            metrics,
            events,
        }
    }

    // 注册表只做插入与移除，持锁期间不会 panic，中毒后沿用内部状态
    fn registry(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Adaptor>>> {
        self.adaptors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Adaptor>>> {
        self.adaptors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn adaptor(&self, name: &str) -> Option<Arc<Adaptor>> {
        self.registry().get(name).cloned()
    }

    /// 注册适配器；同名适配器会先被注销。
    pub async fn register_adaptor(&self, name: &str, dialer: Arc<dyn Dialer>) {
        self.remove_adaptor(name).await;
        let adaptor = Arc::new(Adaptor::new(name, dialer));
        self.registry_mut().insert(name.to_string(), adaptor);
        info!(target: "devlink.connection", adaptor = %name, "adaptor registered");
        let _ = self.events.send(AdaptorEvent::Registered(name.to_string()));
    }

    /// 注销适配器并关闭其全部连接，返回适配器此前是否存在。
    pub async fn unregister_adaptor(&self, name: &str) -> bool {
        let existed = self.remove_adaptor(name).await;
        if existed {
            info!(target: "devlink.connection", adaptor = %name, "adaptor unregistered");
            let _ = self.events.send(AdaptorEvent::Unregistered(name.to_string()));
        }
        existed
    }

    async fn remove_adaptor(&self, name: &str) -> bool {
        let removed = self.registry_mut().remove(name);
        let Some(adaptor) = removed else {
            return false;
        };
        let closed = adaptor.close_all().await;
        for _ in 0..closed {
            self.metrics.decrease_connections(name);
        }
        true
    }

    pub fn exists_adaptor(&self, name: &str) -> bool {
        self.adaptor(name).is_some()
    }

    /// 已注册的适配器名（排序）。
    pub fn adaptor_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry().keys().cloned().collect();
        names.sort();
        names
    }

    /// 设备当前是否有连接（测试与排障使用）。
    pub async fn is_connected(&self, adaptor: &str, key: &NamespacedName) -> bool {
        match self.adaptor(adaptor) {
            Some(adaptor) => adaptor.has_connection(key).await,
            None => false,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdaptorEvent> {
        self.events.subscribe()
    }

    /// 通过 link 已确认的适配器连接设备并推送当前设备状态。
    pub async fn connect(
        &self,
        references: &ReferenceData,
        device: &Device,
        link: &DeviceLink,
    ) -> Result<(), ConnectError> {
        let adaptor_name = link.status.adaptor_name.as_str();
        if adaptor_name.is_empty() {
            return Err(ConnectError::InvalidArgument(
                "adaptor name is empty".to_string(),
            ));
        }
        let adaptor = self.adaptor(adaptor_name).ok_or_else(|| {
            ConnectError::InvalidArgument(format!("cannot find adaptor {}", adaptor_name))
        })?;
        let model = link.status.model.as_ref().ok_or_else(|| {
            ConnectError::InvalidArgument("model is not confirmed".to_string())
        })?;

        let key = link.key();
        let connection = match adaptor.create_connection(&key).await {
            Ok((overwritten, connection)) => {
                if !overwritten {
                    self.metrics.increase_connections(adaptor_name);
                }
                connection
            }
            Err(err) => {
                self.metrics.increase_connect_errors(adaptor_name);
                return Err(ConnectError::Connect {
                    adaptor: adaptor_name.to_string(),
                    device: key.to_string(),
                    source: err,
                });
            }
        };

        let started = Instant::now();
        let result = match serde_json::to_vec(&device.cleaned()) {
            Ok(payload) => connection
                .send(model, &payload, references)
                .await
                .map_err(|err| ConnectError::Send {
                    adaptor: adaptor_name.to_string(),
                    device: key.to_string(),
                    source: err,
                }),
            Err(err) => Err(ConnectError::Marshal {
                device: key.to_string(),
                source: err,
            }),
        };
        self.metrics
            .observe_send_latency(adaptor_name, started.elapsed());
        if let Err(err) = &result {
            self.metrics.increase_send_errors(adaptor_name);
            warn!(
                target: "devlink.connection",
                link = %key,
                adaptor = %adaptor_name,
                error = %err,
                "device send failed"
            );
        } else {
            debug!(
                target: "devlink.connection",
                link = %key,
                adaptor = %adaptor_name,
                "device state sent"
            );
        }
        result
    }

    /// 断开 link 的连接；适配器名为空或未注册时不做任何事。
    pub async fn disconnect(&self, link: &DeviceLink) {
        let adaptor_name = link.status.adaptor_name.as_str();
        if adaptor_name.is_empty() {
            return;
        }
        let Some(adaptor) = self.adaptor(adaptor_name) else {
            return;
        };
        let key = link.key();
        if adaptor.delete_connection(&key).await {
            self.metrics.decrease_connections(adaptor_name);
            debug!(
                target: "devlink.connection",
                link = %key,
                adaptor = %adaptor_name,
                "device disconnected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LogDialer;
    use devlink_telemetry::LimbMetrics;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[tokio::test]
    async fn poisoned_registry_still_registers() {
        let manager = ConnectionManager::new(Arc::new(LimbMetrics::new()));
        let poisoned = catch_unwind(AssertUnwindSafe(|| {
            let registry = manager.registry_mut();
            if registry.is_empty() {
                panic!("poison registry");
            }
        }));
        assert!(poisoned.is_err());
        assert!(manager.adaptors.is_poisoned());

        let mut events = manager.subscribe();
        manager
            .register_adaptor("log", Arc::new(LogDialer::new("log")))
            .await;
        assert!(manager.exists_adaptor("log"));
        assert_eq!(manager.adaptor_names(), vec!["log".to_string()]);
        assert_eq!(
            events.recv().await.expect("event"),
            AdaptorEvent::Registered("log".to_string())
        );
        assert!(manager.unregister_adaptor("log").await);
        assert!(!manager.exists_adaptor("log"));
    }
}
