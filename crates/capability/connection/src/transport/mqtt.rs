//! MQTT 传输：每次发送发布一条 JSON 信封。
//!
//! - topic：`{prefix}/{adaptor}/{namespace}/{name}`
//! - 载荷：`{"model": {...}, "device": {...}, "references": {"<ref>": {"<key>": "<base64>"}}}`
//! - 关闭连接时向同一 topic 发布一条保留的空消息，清理设备侧状态

use crate::adaptor::{Connection, Dialer};
use crate::error::ConnectionError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::{ModelRef, NamespacedName, ReferenceData};
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// MQTT 传输配置。
#[derive(Debug, Clone)]
pub struct MqttTransportConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub qos: u8,
}

#[derive(Serialize)]
struct Envelope<'a> {
    model: &'a ModelRef,
    device: serde_json::Value,
    references: BTreeMap<&'a str, BTreeMap<&'a str, String>>,
}

/// 编码发送载荷；设备文档必须是合法 JSON。
pub fn encode_payload(
    model: &ModelRef,
    device: &[u8],
    references: &ReferenceData,
) -> Result<Vec<u8>, ConnectionError> {
    let device = serde_json::from_slice(device)
        .map_err(|err| ConnectionError::Send(format!("device is not JSON: {}", err)))?;
    let references = references
        .iter()
        .map(|(name, items)| {
            let items = items
                .iter()
                .map(|(key, value)| (key.as_str(), STANDARD.encode(value)))
                .collect();
            (name.as_str(), items)
        })
        .collect();
    serde_json::to_vec(&Envelope {
        model,
        device,
        references,
    })
    .map_err(|err| ConnectionError::Send(err.to_string()))
}

/// 设备 topic。
pub fn topic_for(prefix: &str, adaptor: &str, key: &NamespacedName) -> String {
    let prefix = prefix.trim_end_matches('/');
    if key.namespace.is_empty() {
        format!("{}/{}/{}", prefix, adaptor, key.name)
    } else {
        format!("{}/{}/{}/{}", prefix, adaptor, key.namespace, key.name)
    }
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// MQTT 拨号器，所有设备连接共享一个客户端。
#[derive(Clone)]
pub struct MqttDialer {
    adaptor: String,
    client: AsyncClient,
    topic_prefix: String,
    qos: QoS,
}

impl MqttDialer {
    pub fn connect(
        adaptor: impl Into<String>,
        config: MqttTransportConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), ConnectionError> {
        let adaptor = adaptor.into();
        let client_id = format!("devlink-{}-{}", adaptor, uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let handle = tokio::spawn(async move {
            loop {
                if let Err(err) = eventloop.poll().await {
                    warn!(target: "devlink.connection", "mqtt transport eventloop error: {}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });
        Ok((
            Self {
                adaptor,
                client,
                topic_prefix: config.topic_prefix,
                qos: qos_from_u8(config.qos),
            },
            handle,
        ))
    }
}

#[async_trait]
impl Dialer for MqttDialer {
    async fn dial(&self, key: &NamespacedName) -> Result<Arc<dyn Connection>, ConnectionError> {
        Ok(Arc::new(MqttConnection {
            client: self.client.clone(),
            topic: topic_for(&self.topic_prefix, &self.adaptor, key),
            qos: self.qos,
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct MqttConnection {
    client: AsyncClient,
    topic: String,
    qos: QoS,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for MqttConnection {
    async fn send(
        &self,
        model: &ModelRef,
        device: &[u8],
        references: &ReferenceData,
    ) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }
        let payload = encode_payload(model, device, references)?;
        info!(
            target: "devlink.connection",
            topic = %self.topic,
            payload_size = payload.len(),
            "mqtt_transport_publish"
        );
        self.client
            .publish(self.topic.clone(), self.qos, true, payload)
            .await
            .map_err(|err| ConnectionError::Send(err.to_string()))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self
            .client
            .publish(self.topic.clone(), self.qos, true, Vec::<u8>::new())
            .await
        {
            warn!(target: "devlink.connection", topic = %self.topic, "mqtt retained clear failed: {}", err);
        }
    }
}
