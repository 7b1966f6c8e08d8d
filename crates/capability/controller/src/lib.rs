//! # Devlink Controller 模块
//!
//! 两个独立的调谐循环，通过 DeviceLink 的 status 收敛到同一个实体上：
//!
//! - [`validator`]：集群校验循环（brain），写 NodeExisted / ModelExisted
//! - [`binder`]：节点绑定循环（limb），写 AdaptorExisted / DeviceCreated / DeviceConnected
//!
//! 支撑模块：
//!
//! - [`runtime`]：watch 驱动的 worker 池，`Reconciler` / `Trigger` 接口
//! - [`queue`]：按键串行、合并、延迟与退避重入队的工作队列
//! - [`predicate`]：事件过滤
//! - [`references`] / [`fieldpath`]：引用解析
//! - [`device`]：模板构造 Device 与结构化差异

pub mod binder;
pub mod device;
pub mod fieldpath;
pub mod predicate;
pub mod queue;
pub mod references;
pub mod runtime;
pub mod validator;

pub use binder::{BinderTrigger, NodeBinder, event_reasons, requeue_on_adaptor_events};
pub use device::{DeviceDrift, construct_from_template, template_spec};
pub use queue::WorkQueue;
pub use references::{ReferenceError, ReferenceResolver};
pub use runtime::{Action, Controller, ControllerConfig, Reconciler, Trigger};
pub use validator::{ClusterValidator, ValidatorTrigger};
