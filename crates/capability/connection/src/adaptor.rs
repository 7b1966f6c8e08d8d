//! 适配器与连接。
//!
//! 适配器是进程内的协议插件，按设备键持有连接表；
//! 具体的线协议由 [`Dialer`] / [`Connection`] 实现提供。

use crate::error::ConnectionError;
use async_trait::async_trait;
use domain::{ModelRef, NamespacedName, ReferenceData};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// 到单个设备的通道。
#[async_trait]
pub trait Connection: Send + Sync {
    /// 发送模型标识、清理后的设备文档（JSON）与解析后的引用。
    async fn send(
        &self,
        model: &ModelRef,
        device: &[u8],
        references: &ReferenceData,
    ) -> Result<(), ConnectionError>;

    /// 关闭连接，可重复调用。
    async fn close(&self);
}

/// 为设备建立连接的传输实现。
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, key: &NamespacedName) -> Result<Arc<dyn Connection>, ConnectionError>;
}

/// 已注册的适配器。
pub struct Adaptor {
    name: String,
    dialer: Arc<dyn Dialer>,
    connections: Mutex<HashMap<NamespacedName, Arc<dyn Connection>>>,
    /// 注销后置位，只在持有连接表锁时读写。
    closed: AtomicBool,
}

impl Adaptor {
    pub fn new(name: impl Into<String>, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            name: name.into(),
            dialer,
            connections: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 建立连接并写入连接表。
    ///
    /// 返回 `(overwritten, connection)`；已有连接会被替换并关闭。
    /// 拨号期间适配器被注销时，新连接立即关闭并返回 `Closed`。
    pub async fn create_connection(
        &self,
        key: &NamespacedName,
    ) -> Result<(bool, Arc<dyn Connection>), ConnectionError> {
        let connection = self.dialer.dial(key).await?;
        let previous = {
            let mut connections = self.connections.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                None
            } else {
                Some(connections.insert(key.clone(), connection.clone()))
            }
        };
        let Some(previous) = previous else {
            connection.close().await;
            return Err(ConnectionError::Closed);
        };
        let overwritten = match previous {
            Some(previous) => {
                previous.close().await;
                true
            }
            None => false,
        };
        Ok((overwritten, connection))
    }

    /// 移除并关闭连接，返回连接此前是否存在。
    pub async fn delete_connection(&self, key: &NamespacedName) -> bool {
        let removed = self.connections.lock().await.remove(key);
        match removed {
            Some(connection) => {
                connection.close().await;
                true
            }
            None => false,
        }
    }

    pub async fn has_connection(&self, key: &NamespacedName) -> bool {
        self.connections.lock().await.contains_key(key)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// 关闭全部连接并拒绝之后的新连接，返回关闭的数量。
    pub(crate) async fn close_all(&self) -> usize {
        let drained: Vec<Arc<dyn Connection>> = {
            let mut connections = self.connections.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            connections.drain().map(|(_, connection)| connection).collect()
        };
        for connection in &drained {
            connection.close().await;
        }
        drained.len()
    }
}
