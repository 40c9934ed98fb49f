use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{MessageId, RoomId, Timestamp, UserId};

/// 发给房间或用户的消息。
///
/// `reactions` 以表情符号为键，值为回应者列表；某个表情的最后
/// 一个回应被移除时整个键一并删除，不留空列表。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub room_id: Option<RoomId>,
    pub recipient_id: Option<UserId>,
    pub content: String,
    pub message_type: String,
    pub attachments: Vec<Value>,
    pub reactions: HashMap<String, Vec<UserId>>,
    pub timestamp: Timestamp,
    pub edited_at: Option<Timestamp>,
    pub metadata: HashMap<String, Value>,
}

/// 发送消息的输入
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMessage {
    pub sender_id: Option<UserId>,
    pub room_id: Option<RoomId>,
    pub recipient_id: Option<UserId>,
    pub content: Option<String>,
    pub message_type: Option<String>,
    pub attachments: Option<Vec<Value>>,
    pub metadata: Option<HashMap<String, Value>>,
}

impl Message {
    pub fn create(data: NewMessage, now: Timestamp) -> DomainResult<Self> {
        let sender_id = data
            .sender_id
            .ok_or_else(|| DomainError::missing_field("sender_id"))?;

        Ok(Self {
            id: MessageId::new(),
            sender_id,
            room_id: data.room_id,
            recipient_id: data.recipient_id,
            content: data.content.unwrap_or_default(),
            message_type: data.message_type.unwrap_or_else(|| "text".to_owned()),
            attachments: data.attachments.unwrap_or_default(),
            reactions: HashMap::new(),
            timestamp: now,
            edited_at: None,
            metadata: data.metadata.unwrap_or_default(),
        })
    }

    /// 追加回应；同一用户对同一表情的重复回应是幂等的。
    pub fn add_reaction(&mut self, user_id: UserId, emoji: &str) {
        let reactors = self.reactions.entry(emoji.to_owned()).or_default();
        if !reactors.contains(&user_id) {
            reactors.push(user_id);
        }
    }

    /// 移除回应；返回是否真的移除了。最后一个回应者离开时
    /// 删除整个表情键。
    pub fn remove_reaction(&mut self, user_id: UserId, emoji: &str) -> bool {
        let Some(reactors) = self.reactions.get_mut(emoji) else {
            return false;
        };
        let Some(pos) = reactors.iter().position(|id| *id == user_id) else {
            return false;
        };
        reactors.remove(pos);
        if reactors.is_empty() {
            self.reactions.remove(emoji);
        }
        true
    }

    /// 只有发送者本人可以编辑。
    pub fn edit(&mut self, content: impl Into<String>, editor: UserId, now: Timestamp) -> bool {
        if editor != self.sender_id {
            return false;
        }
        self.content = content.into();
        self.edited_at = Some(now);
        true
    }
}
