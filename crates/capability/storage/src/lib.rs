//! # Devlink Storage 模块
//!
//! 资源存储抽象：DeviceLink、Node、ModelSchema、Secret、ConfigMap 与 Device
//! 共用一个按 `(ResourceKind, NamespacedName)` 寻址的通用存储。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：`ResourceStore` 异步 Trait 与类型化扩展 `StoreExt`
//! 2. **对象层** (`object.rs`)：`Object` / `ResourceKind` / `Resource`
//! 3. **错误处理层** (`error.rs`)：NotFound / Conflict / Invalid 等分类
//! 4. **验证辅助层** (`validation.rs`)：写入前的语义校验
//! 5. **变更通知** (`watch.rs`)：Added / Modified / Deleted 事件
//! 6. **实现层** (`in_memory/`)：`RwLock<HashMap>` + broadcast 的内存实现
//!
//! ## 存储语义
//!
//! - 乐观并发：update 携带过期 resourceVersion 时返回 Conflict
//! - status 子资源：update 不改 status，update_status 只改 status
//! - 空写入：内容未变化时不递增版本、不发通知
//! - 删除：带 finalizer 的对象只打删除时间戳，finalizer 清空后物理删除
//! - 级联回收：对象物理删除后，ownerReferences 指向它的对象随之回收
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use devlink_storage::{InMemoryStore, ResourceKind, StoreExt};
//! use domain::{DeviceLink, NamespacedName};
//!
//! let store = InMemoryStore::new();
//! let link: DeviceLink = store
//!     .get_as(&ResourceKind::DeviceLink, &NamespacedName::new("default", "living-room"))
//!     .await?;
//! ```

pub mod error;
pub mod in_memory;
pub mod object;
pub mod traits;
pub mod validation;
pub mod watch;

pub use error::*;
pub use in_memory::InMemoryStore;
pub use object::*;
pub use traits::*;
pub use validation::*;
pub use watch::*;
