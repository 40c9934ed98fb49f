use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{ConnectionId, Timestamp, UserId};

/// 社交关系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Friend,
    Follower,
    Following,
    Blocked,
    Mutual,
}

/// 两个用户之间的有向社交关系边。
///
/// `mutual` 只在创建时检测一次：若此刻存在同类型的反向边，
/// 双方同时置位；之后创建或删除反向边都不会回头改动它。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub target_user_id: UserId,
    pub connection_type: ConnectionType,
    pub created_at: Timestamp,
    pub strength: f64,
    pub mutual: bool,
    pub metadata: HashMap<String, Value>,
}

impl Connection {
    pub fn new(
        user_id: UserId,
        target_user_id: UserId,
        connection_type: ConnectionType,
        now: Timestamp,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            target_user_id,
            connection_type,
            created_at: now,
            strength: 0.5,
            mutual: false,
            metadata: HashMap::new(),
        }
    }

    /// 关系强度始终落在 [0, 1]。
    pub fn set_strength(&mut self, strength: f64) {
        self.strength = strength.clamp(0.0, 1.0);
    }
}
