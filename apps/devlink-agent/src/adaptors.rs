//! 按配置注册适配器。
//!
//! - `log`：日志传输
//! - `mqtt`：MQTT 传输（共享一个客户端，返回其事件循环句柄）

use devlink_config::AppConfig;
use devlink_connection::transport::{LogDialer, MqttDialer, MqttTransportConfig};
use devlink_connection::{ConnectionError, ConnectionManager};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

pub async fn register_adaptors(
    config: &AppConfig,
    connections: &ConnectionManager,
) -> Result<Vec<JoinHandle<()>>, ConnectionError> {
    let mut transports = Vec::new();
    for name in &config.adaptors {
        match name.as_str() {
            "log" => {
                connections
                    .register_adaptor(name, Arc::new(LogDialer::new(name.clone())))
                    .await;
            }
            "mqtt" => {
                let (dialer, eventloop) = MqttDialer::connect(
                    name.clone(),
                    MqttTransportConfig {
                        host: config.mqtt_host.clone(),
                        port: config.mqtt_port,
                        username: config.mqtt_username.clone(),
                        password: config.mqtt_password.clone(),
                        topic_prefix: config.mqtt_topic_prefix.clone(),
                        qos: config.mqtt_qos,
                    },
                )?;
                connections.register_adaptor(name, Arc::new(dialer)).await;
                transports.push(eventloop);
            }
            other => {
                warn!(target: "devlink.connection", adaptor = %other, "unknown adaptor transport, skipped");
            }
        }
    }
    Ok(transports)
}
