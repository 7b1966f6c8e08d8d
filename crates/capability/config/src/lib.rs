//! 代理运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 代理运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub node_name: String,
    pub http_addr: String,
    pub brain_enabled: bool,
    pub limb_enabled: bool,
    pub brain_workers: usize,
    pub limb_workers: usize,
    pub reference_retry_seconds: u64,
    pub reconcile_timeout_seconds: u64,
    pub requeue_base_ms: u64,
    pub requeue_max_ms: u64,
    pub adaptors: Vec<String>,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_prefix: String,
    pub mqtt_qos: u8,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let node_name = read_optional("DEVLINK_NODE_NAME")
            .ok_or_else(|| ConfigError::Missing("DEVLINK_NODE_NAME".to_string()))?;
        let http_addr =
            env::var("DEVLINK_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8090".to_string());
        let brain_enabled = read_bool_with_default("DEVLINK_BRAIN", true);
        let limb_enabled = read_bool_with_default("DEVLINK_LIMB", true);
        let brain_workers = read_workers("DEVLINK_BRAIN_WORKERS", 2)?;
        let limb_workers = read_workers("DEVLINK_LIMB_WORKERS", 4)?;
        let reference_retry_seconds =
            read_u64_with_default("DEVLINK_REFERENCE_RETRY_SECONDS", 10)?;
        let reconcile_timeout_seconds =
            read_u64_with_default("DEVLINK_RECONCILE_TIMEOUT_SECONDS", 30)?;
        let requeue_base_ms = read_u64_with_default("DEVLINK_REQUEUE_BASE_MS", 5)?;
        let requeue_max_ms = read_u64_with_default("DEVLINK_REQUEUE_MAX_MS", 60_000)?;
        if requeue_max_ms < requeue_base_ms {
            return Err(ConfigError::Invalid(
                "DEVLINK_REQUEUE_MAX_MS".to_string(),
                requeue_max_ms.to_string(),
            ));
        }
        let adaptors = read_list_with_default("DEVLINK_ADAPTORS", &["log"]);
        let mqtt_host = env::var("DEVLINK_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("DEVLINK_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("DEVLINK_MQTT_USERNAME");
        let mqtt_password = read_optional("DEVLINK_MQTT_PASSWORD");
        let mqtt_topic_prefix = env::var("DEVLINK_MQTT_TOPIC_PREFIX")
            .unwrap_or_else(|_| "devlink/devices".to_string())
            .trim_end_matches('/')
            .to_string();
        let mqtt_qos = read_u8_with_default("DEVLINK_MQTT_QOS", 1)?;
        if mqtt_qos > 2 {
            return Err(ConfigError::Invalid(
                "DEVLINK_MQTT_QOS".to_string(),
                mqtt_qos.to_string(),
            ));
        }

        Ok(Self {
            node_name,
            http_addr,
            brain_enabled,
            limb_enabled,
            brain_workers,
            limb_workers,
            reference_retry_seconds,
            reconcile_timeout_seconds,
            requeue_base_ms,
            requeue_max_ms,
            adaptors,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            mqtt_qos,
        })
    }

    pub fn reference_retry(&self) -> Duration {
        Duration::from_secs(self.reference_retry_seconds)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_seconds)
    }

    pub fn requeue_base(&self) -> Duration {
        Duration::from_millis(self.requeue_base_ms)
    }

    pub fn requeue_max(&self) -> Duration {
        Duration::from_millis(self.requeue_max_ms)
    }
}

fn read_workers(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = read_u64_with_default(key, default as u64)?;
    if value == 0 {
        return Err(ConfigError::Invalid(key.to_string(), value.to_string()));
    }
    Ok(value as usize)
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

/// 逗号分隔列表，忽略空项。
fn read_list_with_default(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(value) => value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => default.iter().map(|item| item.to_string()).collect(),
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
