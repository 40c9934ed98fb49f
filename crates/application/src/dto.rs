//! 门面读模型
//!
//! 门面只向调用方暴露这些裁剪过的视图，内部实体不外泄。

use std::collections::HashMap;

use domain::{
    Connection, Message, MessageId, Room, RoomId, RoomType, Timestamp, UserId, UserProfile,
    UserStatus,
};
use serde::Serialize;

/// `{success: true, ...}` 成功响应体
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// 用户摘要，列表与嵌套场景共用。
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub status: UserStatus,
}

impl From<&UserProfile> for UserSummary {
    fn from(user: &UserProfile) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            status: user.status,
        }
    }
}

/// 好友列表项：用户摘要加边上的关系属性。
#[derive(Debug, Clone, Serialize)]
pub struct FriendView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub connection_strength: f64,
    pub mutual: bool,
}

impl FriendView {
    pub fn new(friend: &UserProfile, connection: &Connection) -> Self {
        Self {
            user: UserSummary::from(friend),
            connection_strength: connection.strength,
            mutual: connection.mutual,
        }
    }
}

/// 搜索结果里的房间摘要。
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub name: String,
    pub description: String,
    pub room_type: RoomType,
    pub member_count: usize,
    pub capacity: usize,
    pub tags: Vec<String>,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id,
            name: room.name.clone(),
            description: room.description.clone(),
            room_type: room.room_type,
            member_count: room.members.len(),
            capacity: room.capacity,
            tags: room.tags.clone(),
        }
    }
}

/// 房间详情：摘要之外带上成员摘要与管理员列表。
#[derive(Debug, Clone, Serialize)]
pub struct RoomDetail {
    pub room_id: RoomId,
    pub name: String,
    pub description: String,
    pub room_type: RoomType,
    pub owner_id: UserId,
    pub capacity: usize,
    pub members: Vec<UserSummary>,
    pub moderators: Vec<UserId>,
    pub tags: Vec<String>,
}

/// 消息视图；发送者已注销时 `sender` 为空。
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub message_id: MessageId,
    pub sender: Option<UserSummary>,
    pub content: String,
    pub message_type: String,
    pub timestamp: Timestamp,
    pub reactions: HashMap<String, Vec<UserId>>,
}

impl MessageView {
    pub fn new(message: &Message, sender: Option<&UserProfile>) -> Self {
        Self {
            message_id: message.id,
            sender: sender.map(UserSummary::from),
            content: message.content.clone(),
            message_type: message.message_type.clone(),
            timestamp: message.timestamp,
            reactions: message.reactions.clone(),
        }
    }
}
