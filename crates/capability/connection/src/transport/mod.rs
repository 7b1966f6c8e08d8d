//! 参考传输实现。

pub mod log;
pub mod mqtt;

pub use log::LogDialer;
pub use mqtt::{MqttDialer, MqttTransportConfig};
