//! 存储层错误类型
//!
//! 调谐循环按错误类别决定后续动作：
//! - NotFound：驱动否定条件，停止或延迟重试
//! - Conflict：乐观锁冲突，立即重入队
//! - Invalid：存储拒绝（语义错误），本轮终止，不盲目重试
//! - 其他：可重试

use crate::object::ResourceKind;
use domain::NamespacedName;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: NamespacedName },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ResourceKind, key: NamespacedName },

    #[error("conflict on {kind} {key}: resource version {given} is stale, current is {current}")]
    Conflict {
        kind: ResourceKind,
        key: NamespacedName,
        given: u64,
        current: u64,
    },

    #[error("{kind} {key} is invalid: {reason}")]
    Invalid {
        kind: ResourceKind,
        key: NamespacedName,
        reason: String,
    },

    #[error("unexpected object for {0}")]
    UnexpectedKind(ResourceKind),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn not_found(kind: &ResourceKind, key: &NamespacedName) -> Self {
        Self::NotFound {
            kind: kind.clone(),
            key: key.clone(),
        }
    }

    pub fn invalid(kind: &ResourceKind, key: &NamespacedName, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind: kind.clone(),
            key: key.clone(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}
