//! 内存存储实现模块
//!
//! 单进程资源存储，用于本地运行和测试。
//!
//! 包含以下实现：
//! - ResourceStore: InMemoryStore

pub mod store;

pub use store::*;
