//! 消息存储
//!
//! 消息主表加两条只追加的索引：房间消息与私信收件箱。读取沿
//! 索引倒序扫描，最新的先出。变更操作返回消息生命周期通知。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{DomainResult, Message, MessageActivity, MessageId, NewMessage, RoomId, Timestamp, UserId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::Clock;

#[derive(Default)]
struct MessageState {
    messages: HashMap<MessageId, Message>,
    /// room_id -> 按发送顺序追加的消息
    room_index: HashMap<RoomId, Vec<MessageId>>,
    /// recipient_id -> 私信收件箱
    inbox_index: HashMap<UserId, Vec<MessageId>>,
}

pub struct MessageStore {
    clock: Arc<dyn Clock>,
    state: RwLock<MessageState>,
}

impl MessageStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: RwLock::new(MessageState::default()),
        }
    }

    /// 发送消息；缺失发送者是创建期致命错误。房间归属与收件人
    /// 均为可选，两者都会被索引。
    pub async fn send_message(
        &self,
        data: NewMessage,
    ) -> DomainResult<(Message, Vec<MessageActivity>)> {
        let message = Message::create(data, self.clock.now())?;
        let mut state = self.state.write().await;
        if let Some(room_id) = message.room_id {
            state.room_index.entry(room_id).or_default().push(message.id);
        }
        if let Some(recipient_id) = message.recipient_id {
            state
                .inbox_index
                .entry(recipient_id)
                .or_default()
                .push(message.id);
        }
        state.messages.insert(message.id, message.clone());
        debug!(message_id = %message.id, sender_id = %message.sender_id, "消息已发送");
        let activities = vec![MessageActivity::Sent {
            message: message.clone(),
        }];
        Ok((message, activities))
    }

    pub async fn get_message(&self, message_id: MessageId) -> Option<Message> {
        self.state.read().await.messages.get(&message_id).cloned()
    }

    /// 读取房间消息，最新的在前。`before` 为分页游标：只返回
    /// 严格早于该时刻的消息。
    pub async fn get_room_messages(
        &self,
        room_id: RoomId,
        limit: usize,
        before: Option<Timestamp>,
    ) -> Vec<Message> {
        let state = self.state.read().await;
        Self::collect_newest_first(&state, state.room_index.get(&room_id), limit, before)
    }

    /// 读取用户的私信收件箱，最新的在前。
    pub async fn get_user_messages(&self, user_id: UserId, limit: usize) -> Vec<Message> {
        let state = self.state.read().await;
        Self::collect_newest_first(&state, state.inbox_index.get(&user_id), limit, None)
    }

    /// 追加回应；消息未知返回 None。重复回应幂等，但依旧产生
    /// 一条通知。
    pub async fn add_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> Option<Vec<MessageActivity>> {
        let mut state = self.state.write().await;
        let message = state.messages.get_mut(&message_id)?;
        message.add_reaction(user_id, emoji);
        Some(vec![MessageActivity::ReactionAdded {
            message_id,
            room_id: message.room_id,
            user_id,
            emoji: emoji.to_owned(),
        }])
    }

    /// 移除回应；消息未知或该用户未回应过返回 None。
    pub async fn remove_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> Option<Vec<MessageActivity>> {
        let mut state = self.state.write().await;
        let message = state.messages.get_mut(&message_id)?;
        if !message.remove_reaction(user_id, emoji) {
            return None;
        }
        Some(vec![MessageActivity::ReactionRemoved {
            message_id,
            room_id: message.room_id,
            user_id,
            emoji: emoji.to_owned(),
        }])
    }

    /// 编辑消息；只有发送者本人可以。
    pub async fn edit_message(
        &self,
        message_id: MessageId,
        new_content: &str,
        editor: UserId,
    ) -> Option<Vec<MessageActivity>> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let message = state.messages.get_mut(&message_id)?;
        if !message.edit(new_content, editor, now) {
            return None;
        }
        Some(vec![MessageActivity::Edited {
            message: message.clone(),
        }])
    }

    /// 删除消息；只有发送者本人可以。索引与主表一并清理。
    pub async fn delete_message(
        &self,
        message_id: MessageId,
        requester: UserId,
    ) -> Option<Vec<MessageActivity>> {
        let mut state = self.state.write().await;
        if state.messages.get(&message_id)?.sender_id != requester {
            return None;
        }
        let message = state.messages.remove(&message_id)?;
        if let Some(room_id) = message.room_id {
            if let Some(index) = state.room_index.get_mut(&room_id) {
                index.retain(|id| *id != message_id);
            }
        }
        if let Some(recipient_id) = message.recipient_id {
            if let Some(index) = state.inbox_index.get_mut(&recipient_id) {
                index.retain(|id| *id != message_id);
            }
        }
        debug!(message_id = %message_id, "消息已删除");
        Some(vec![MessageActivity::Deleted { message }])
    }

    fn collect_newest_first(
        state: &MessageState,
        index: Option<&Vec<MessageId>>,
        limit: usize,
        before: Option<Timestamp>,
    ) -> Vec<Message> {
        let Some(index) = index else {
            return Vec::new();
        };
        index
            .iter()
            .rev()
            .filter_map(|id| state.messages.get(id))
            .filter(|message| before.is_none_or(|cutoff| message.timestamp < cutoff))
            .take(limit)
            .cloned()
            .collect()
    }
}
