//! 平台事件与领域通知
//!
//! 目录的每个变更操作返回一组类型化的领域通知，由门面汇集成
//! `SocialEvent` 投递到事件总线；目录之间不持有回调。

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::user::UserStatus;
use crate::value_objects::{EventId, MessageId, RoomId, Timestamp, UserId};

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserPresenceChanged,
    RoomUserJoined,
    RoomUserLeft,
    MessageSent,
    MessageEdited,
    MessageDeleted,
    ReactionAdded,
    ReactionRemoved,
    FriendRequestSent,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserPresenceChanged => "user_presence_changed",
            EventKind::RoomUserJoined => "room_user_joined",
            EventKind::RoomUserLeft => "room_user_left",
            EventKind::MessageSent => "message_sent",
            EventKind::MessageEdited => "message_edited",
            EventKind::MessageDeleted => "message_deleted",
            EventKind::ReactionAdded => "reaction_added",
            EventKind::ReactionRemoved => "reaction_removed",
            EventKind::FriendRequestSent => "friend_request_sent",
        }
    }
}

/// 事件负载：每种事件只携带其契约需要的字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Presence {
        status: UserStatus,
    },
    Room,
    Message {
        message_id: MessageId,
        content: String,
        message_type: String,
    },
    Reaction {
        message_id: MessageId,
        emoji: String,
    },
    FriendRequest {
        target_user_id: UserId,
    },
}

/// 平台事件：追加进无界历史并扇出一次，创建后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub user_id: UserId,
    pub room_id: Option<RoomId>,
    pub payload: EventPayload,
    pub timestamp: Timestamp,
}

impl SocialEvent {
    pub fn new(
        kind: EventKind,
        user_id: UserId,
        room_id: Option<RoomId>,
        payload: EventPayload,
        now: Timestamp,
    ) -> Self {
        Self {
            id: EventId::new(),
            kind,
            user_id,
            room_id,
            payload,
            timestamp: now,
        }
    }
}

/// 用户在线状态变化通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChange {
    pub user_id: UserId,
    pub status: UserStatus,
}

/// 房间成员变动通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomActivity {
    Joined { room_id: RoomId, user_id: UserId },
    Left { room_id: RoomId, user_id: UserId },
}

/// 消息生命周期通知
#[derive(Debug, Clone, PartialEq)]
pub enum MessageActivity {
    Sent {
        message: Message,
    },
    Edited {
        message: Message,
    },
    Deleted {
        message: Message,
    },
    ReactionAdded {
        message_id: MessageId,
        room_id: Option<RoomId>,
        user_id: UserId,
        emoji: String,
    },
    ReactionRemoved {
        message_id: MessageId,
        room_id: Option<RoomId>,
        user_id: UserId,
        emoji: String,
    },
}
