use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{RoomId, Timestamp, UserId};

/// 房间类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Public,
    Private,
    InviteOnly,
    Temporary,
}

pub const DEFAULT_ROOM_CAPACITY: usize = 50;

/// 社交房间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub room_type: RoomType,
    pub owner_id: UserId,
    pub capacity: usize,
    pub members: HashSet<UserId>,
    pub moderators: HashSet<UserId>,
    pub settings: HashMap<String, Value>,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, Value>,
    pub created_at: Timestamp,
}

/// 创建房间的输入
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRoom {
    pub room_id: Option<RoomId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub room_type: Option<RoomType>,
    pub owner_id: Option<UserId>,
    pub capacity: Option<usize>,
    pub settings: Option<HashMap<String, Value>>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<HashMap<String, Value>>,
}

impl Room {
    pub fn create(data: NewRoom, now: Timestamp) -> DomainResult<Self> {
        let name = data
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| DomainError::missing_field("name"))?;
        let owner_id = data
            .owner_id
            .ok_or_else(|| DomainError::missing_field("owner_id"))?;
        let capacity = data.capacity.unwrap_or(DEFAULT_ROOM_CAPACITY);
        if capacity == 0 {
            return Err(DomainError::invalid_argument("capacity", "must be positive"));
        }

        // 房主始终是管理员
        let moderators = HashSet::from([owner_id]);

        Ok(Self {
            id: data.room_id.unwrap_or_default(),
            name,
            description: data.description.unwrap_or_default(),
            room_type: data.room_type.unwrap_or(RoomType::Public),
            owner_id,
            capacity,
            members: HashSet::new(),
            moderators,
            settings: data.settings.unwrap_or_default(),
            tags: data.tags.unwrap_or_default(),
            metadata: data.metadata.unwrap_or_default(),
            created_at: now,
        })
    }

    /// 容量只在加入时刻检查。
    pub fn has_space(&self) -> bool {
        self.members.len() < self.capacity
    }

    pub fn is_moderator(&self, user_id: UserId) -> bool {
        user_id == self.owner_id || self.moderators.contains(&user_id)
    }

    /// 文本匹配：名称 / 描述 / 标签，三者取或。
    pub fn matches_query(&self, query_lower: &str) -> bool {
        self.name.to_lowercase().contains(query_lower)
            || self.description.to_lowercase().contains(query_lower)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(query_lower))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_room(name: &str, owner: UserId) -> NewRoom {
        NewRoom {
            name: Some(name.to_owned()),
            owner_id: Some(owner),
            ..NewRoom::default()
        }
    }

    #[test]
    fn create_requires_name_and_owner() {
        let err = Room::create(NewRoom::default(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::missing_field("name"));

        let err = Room::create(
            NewRoom {
                name: Some("lounge".to_owned()),
                ..NewRoom::default()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::missing_field("owner_id"));
    }

    #[test]
    fn owner_is_always_moderator() {
        let owner = UserId::new();
        let room = Room::create(new_room("lounge", owner), Utc::now()).unwrap();
        assert!(room.is_moderator(owner));
        assert_eq!(room.capacity, DEFAULT_ROOM_CAPACITY);
        assert!(room.members.is_empty());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut data = new_room("lounge", UserId::new());
        data.capacity = Some(0);
        assert!(Room::create(data, Utc::now()).is_err());
    }
}
