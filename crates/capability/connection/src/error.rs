//! 连接层错误类型。

/// 适配器传输错误（拨号、发送）。
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    #[error("dial failed: {0}")]
    Dial(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("connection closed")]
    Closed,
}

/// connect 的失败原因。
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// 调用参数无效：适配器名为空或未注册、模型未确认。
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot link device {device} via adaptor {adaptor}: {source}")]
    Connect {
        adaptor: String,
        device: String,
        #[source]
        source: ConnectionError,
    },
    #[error("cannot marshal device {device} as JSON: {source}")]
    Marshal {
        device: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot send data to device {device} via adaptor {adaptor}: {source}")]
    Send {
        adaptor: String,
        device: String,
        #[source]
        source: ConnectionError,
    },
}
