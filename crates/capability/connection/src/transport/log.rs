//! 日志传输：把发送内容写入结构化日志，用于本地联调。

use crate::adaptor::{Connection, Dialer};
use crate::error::ConnectionError;
use async_trait::async_trait;
use domain::{ModelRef, NamespacedName, ReferenceData};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

#[derive(Debug, Clone)]
pub struct LogDialer {
    adaptor: String,
}

impl LogDialer {
    pub fn new(adaptor: impl Into<String>) -> Self {
        Self {
            adaptor: adaptor.into(),
        }
    }
}

#[async_trait]
impl Dialer for LogDialer {
    async fn dial(&self, key: &NamespacedName) -> Result<Arc<dyn Connection>, ConnectionError> {
        Ok(Arc::new(LogConnection {
            adaptor: self.adaptor.clone(),
            key: key.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct LogConnection {
    adaptor: String,
    key: NamespacedName,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for LogConnection {
    async fn send(
        &self,
        model: &ModelRef,
        device: &[u8],
        references: &ReferenceData,
    ) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }
        let reference_names: Vec<&str> = references.keys().map(String::as_str).collect();
        info!(
            target: "devlink.connection",
            adaptor = %self.adaptor,
            device = %self.key,
            model = %model,
            payload_size = device.len(),
            references = ?reference_names,
            "log_transport_send"
        );
        Ok(())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(
                target: "devlink.connection",
                adaptor = %self.adaptor,
                device = %self.key,
                "log_transport_close"
            );
        }
    }
}
