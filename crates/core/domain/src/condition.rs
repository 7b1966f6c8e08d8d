//! DeviceLink 状态条件词汇表。
//!
//! 条件表以条件类型为键，因此同一类型在一个 link 上最多出现一次。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 条件类型。
///
/// - NodeExisted / ModelExisted：仅由集群校验循环（brain）写入
/// - AdaptorExisted / DeviceCreated / DeviceConnected：仅由节点绑定循环（limb）写入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionType {
    NodeExisted,
    ModelExisted,
    AdaptorExisted,
    DeviceCreated,
    DeviceConnected,
}

impl ConditionType {
    pub const ALL: [ConditionType; 5] = [
        ConditionType::NodeExisted,
        ConditionType::ModelExisted,
        ConditionType::AdaptorExisted,
        ConditionType::DeviceCreated,
        ConditionType::DeviceConnected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::NodeExisted => "NodeExisted",
            ConditionType::ModelExisted => "ModelExisted",
            ConditionType::AdaptorExisted => "AdaptorExisted",
            ConditionType::DeviceCreated => "DeviceCreated",
            ConditionType::DeviceConnected => "DeviceConnected",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 条件状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// 单个条件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCondition {
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    pub last_transition_time_ms: i64,
}

/// 条件表。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(BTreeMap<ConditionType, LinkCondition>);

impl Conditions {
    pub fn get(&self, condition_type: ConditionType) -> Option<&LinkCondition> {
        self.0.get(&condition_type)
    }

    /// 条件缺失时视为 Unknown。
    pub fn status_of(&self, condition_type: ConditionType) -> ConditionStatus {
        self.0
            .get(&condition_type)
            .map(|condition| condition.status)
            .unwrap_or_default()
    }

    /// 幂等写入条件：仅当 status 变化时更新 lastTransitionTime。
    ///
    /// 返回条件是否有任何变化。
    pub fn set(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now_ms: i64,
    ) -> bool {
        match self.0.get_mut(&condition_type) {
            Some(existing) => {
                let mut changed = false;
                if existing.status != status {
                    existing.status = status;
                    existing.last_transition_time_ms = now_ms;
                    changed = true;
                }
                if existing.reason != reason {
                    existing.reason = reason.to_string();
                    changed = true;
                }
                if existing.message != message {
                    existing.message = message.to_string();
                    changed = true;
                }
                changed
            }
            None => {
                self.0.insert(
                    condition_type,
                    LinkCondition {
                        status,
                        reason: reason.to_string(),
                        message: message.to_string(),
                        last_transition_time_ms: now_ms,
                    },
                );
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConditionType, &LinkCondition)> {
        self.0.iter()
    }
}
