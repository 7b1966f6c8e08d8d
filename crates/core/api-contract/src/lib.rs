//! 稳定的 DTO 与 API 响应契约。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::{DeviceLinkSpec, ModelVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// DeviceLink 写入请求体（status 由调谐循环维护，不接受写入）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLinkRequest {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub spec: DeviceLinkSpec,
}

/// 节点写入请求体（可为空）。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyNodeRequest {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// 设备模型 schema 写入请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyModelRequest {
    pub group: String,
    pub kind: String,
    #[serde(default)]
    pub plural: Option<String>,
    pub versions: Vec<ModelVersion>,
}

/// Secret 写入请求体：值为 base64 文本。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySecretRequest {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ApplySecretRequest {
    /// 解码全部值；任一值不是合法 base64 时返回对应的键。
    pub fn decode(self) -> Result<BTreeMap<String, Vec<u8>>, String> {
        self.data
            .into_iter()
            .map(|(key, value)| match STANDARD.decode(value.as_bytes()) {
                Ok(bytes) => Ok((key, bytes)),
                Err(_) => Err(key),
            })
            .collect()
    }
}

/// ConfigMap 写入请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyConfigMapRequest {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Device 查询参数。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQuery {
    pub api_version: String,
    pub kind: String,
}

/// 单个适配器的连接指标。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptorMetricsDto {
    pub adaptor: String,
    pub connect_errors: u64,
    pub send_errors: u64,
    pub send_latency_us_total: u64,
    pub send_latency_count: u64,
    pub connections: i64,
}

/// 指标快照返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub node_name: String,
    pub registered_adaptors: Vec<String>,
    pub adaptors: Vec<AdaptorMetricsDto>,
}

/// 告警事件返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub namespace: String,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub timestamp_ms: i64,
}
