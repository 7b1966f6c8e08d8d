//! 连接管理：适配器注册表、每设备连接、发送与指标记录。
//!
//! - [`adaptor`]：`Connection` / `Dialer` 能力契约与适配器连接表
//! - [`manager`]：`ConnectionManager`（connect / disconnect / 注册表变更通知）
//! - [`transport`]：日志与 MQTT 两种参考传输

pub mod adaptor;
pub mod error;
pub mod manager;
pub mod transport;

pub use adaptor::{Adaptor, Connection, Dialer};
pub use error::{ConnectError, ConnectionError};
pub use manager::{AdaptorEvent, ConnectionManager};
