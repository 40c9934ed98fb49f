//! 平台门面
//!
//! 组合五个核心组件，对外提供统一的社交操作入口。每次变更从
//! 组件取回领域通知，翻译成 `SocialEvent` 经事件总线扇出；失败
//! 统一映射为 `PlatformError` 四类，底层错误不外泄。

use std::sync::Arc;

use config::{AppConfig, LimitsConfig};
use domain::{
    ConnectionId, ConnectionType, EventKind, EventPayload, MessageActivity, MessageId, NewMessage,
    NewRoom, NewUser, PresenceChange, RoomActivity, RoomId, SessionId, SocialEvent, Timestamp,
    UserId, UserPatch, UserStatus,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{BcryptPasswordHasher, Claims, PasswordHasher, TokenService};
use crate::clock::{Clock, SystemClock};
use crate::connection_graph::ConnectionGraph;
use crate::dto::{FriendView, MessageView, RoomDetail, RoomSummary, UserSummary};
use crate::error::{PlatformError, PlatformResult};
use crate::event_bus::{EventBus, LogNotifier, Notifier};
use crate::message_store::MessageStore;
use crate::room_directory::{RoomDirectory, RoomFilters};
use crate::user_directory::{UserDirectory, UserFilters};

/// 注册请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    /// 为空时账号无凭据，登录不做口令校验
    pub password: Option<String>,
}

/// 注册与登录的统一响应
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: UserSummary,
    pub session_id: SessionId,
    pub token: String,
}

/// 好友推荐项
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub mutual_friends_count: usize,
    pub common_interests: Vec<String>,
}

/// 门面的外部依赖，便于测试替换。
pub struct PlatformDependencies {
    pub clock: Arc<dyn Clock>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub token_service: TokenService,
    pub notifier: Arc<dyn Notifier>,
    pub limits: LimitsConfig,
}

impl PlatformDependencies {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            password_hasher: Arc::new(BcryptPasswordHasher::new(config.auth.bcrypt_cost)),
            token_service: TokenService::new(
                config.auth.secret.clone(),
                config.auth.token_expiry_minutes,
            ),
            notifier: Arc::new(LogNotifier),
            limits: config.limits.clone(),
        }
    }
}

pub struct SocialPlatform {
    clock: Arc<dyn Clock>,
    users: UserDirectory,
    connections: ConnectionGraph,
    rooms: RoomDirectory,
    messages: MessageStore,
    events: EventBus,
    password_hasher: Arc<dyn PasswordHasher>,
    token_service: TokenService,
    limits: LimitsConfig,
}

impl SocialPlatform {
    pub fn new(deps: PlatformDependencies) -> Self {
        Self {
            users: UserDirectory::new(deps.clock.clone()),
            connections: ConnectionGraph::new(deps.clock.clone()),
            rooms: RoomDirectory::new(deps.clock.clone()),
            messages: MessageStore::new(deps.clock.clone()),
            events: EventBus::new(deps.notifier),
            clock: deps.clock,
            password_hasher: deps.password_hasher,
            token_service: deps.token_service,
            limits: deps.limits,
        }
    }

    /// 组件访问器；直接调用会绕过事件扇出。
    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn connections(&self) -> &ConnectionGraph {
        &self.connections
    }

    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ===== 用户与会话 =====

    /// 注册用户：建档、开首个会话并签发令牌。
    pub async fn register_user(&self, request: RegisterRequest) -> PlatformResult<LoginResponse> {
        let hashed_password = match &request.password {
            Some(password) => Some(self.password_hasher.hash(password).await?),
            None => None,
        };
        let (user, session_id, changes) = self
            .users
            .create_user(NewUser {
                username: request.username,
                display_name: request.display_name,
                avatar_url: request.avatar_url,
                bio: request.bio,
                interests: request.interests,
                hashed_password,
                ..NewUser::default()
            })
            .await?;
        self.emit_presence(changes).await;

        let token = self.token_service.issue(&user.username)?;
        info!(user_id = %user.id, username = %user.username, "用户注册完成");
        Ok(LoginResponse {
            user: UserSummary::from(&user),
            session_id,
            token,
        })
    }

    /// 登录：账号存在凭据时必须通过口令校验。
    pub async fn login_user(
        &self,
        user_id: UserId,
        password: Option<&str>,
    ) -> PlatformResult<LoginResponse> {
        let user = self
            .users
            .get_user(user_id)
            .await
            .ok_or_else(|| PlatformError::not_found("user not found"))?;

        if let Some(hashed) = &user.hashed_password {
            let verified = match password {
                Some(password) => self.password_hasher.verify(password, hashed).await?,
                None => false,
            };
            if !verified {
                return Err(PlatformError::forbidden("invalid credentials"));
            }
        }

        let (session_id, changes) = self
            .users
            .create_session(user_id)
            .await
            .ok_or_else(|| PlatformError::not_found("user not found"))?;
        self.emit_presence(changes).await;

        let token = self.token_service.issue(&user.username)?;
        Ok(LoginResponse {
            user: UserSummary::from(&user),
            session_id,
            token,
        })
    }

    pub async fn logout_user(&self, session_id: SessionId) -> PlatformResult<()> {
        let changes = self
            .users
            .end_session(session_id)
            .await
            .ok_or_else(|| PlatformError::not_found("session not found"))?;
        self.emit_presence(changes).await;
        Ok(())
    }

    /// 校验令牌，返回其声明。
    pub fn authenticate(&self, token: &str) -> PlatformResult<Claims> {
        self.token_service
            .verify(token)
            .map_err(|_| PlatformError::forbidden("invalid token"))
    }

    pub async fn set_user_status(
        &self,
        user_id: UserId,
        status: UserStatus,
    ) -> PlatformResult<()> {
        let changes = self
            .users
            .set_status(user_id, status)
            .await
            .ok_or_else(|| PlatformError::not_found("user not found"))?;
        self.emit_presence(changes).await;
        Ok(())
    }

    pub async fn update_profile(
        &self,
        user_id: UserId,
        patch: UserPatch,
    ) -> PlatformResult<UserSummary> {
        let (user, changes) = self
            .users
            .update_user(user_id, patch)
            .await
            .ok_or_else(|| PlatformError::not_found("user not found"))?;
        self.emit_presence(changes).await;
        Ok(UserSummary::from(&user))
    }

    pub async fn get_online_users(&self) -> Vec<UserSummary> {
        self.users
            .get_online_users()
            .await
            .iter()
            .map(UserSummary::from)
            .collect()
    }

    pub async fn search_users(
        &self,
        query: &str,
        filters: Option<&UserFilters>,
    ) -> Vec<UserSummary> {
        self.users
            .search_users(query, filters)
            .await
            .iter()
            .map(UserSummary::from)
            .collect()
    }

    // ===== 社交关系 =====

    /// 发送好友请求：双方都必须存在，且此前没有任何连接。
    pub async fn send_friend_request(
        &self,
        user_id: UserId,
        target_user_id: UserId,
    ) -> PlatformResult<ConnectionId> {
        if self.users.get_user(user_id).await.is_none()
            || self.users.get_user(target_user_id).await.is_none()
        {
            return Err(PlatformError::not_found("user not found"));
        }
        if self
            .connections
            .get_connection(user_id, target_user_id)
            .await
            .is_some()
        {
            return Err(PlatformError::conflict("connection already exists"));
        }

        let connection = self
            .connections
            .create_connection(user_id, target_user_id, ConnectionType::Friend)
            .await;

        self.events
            .emit(SocialEvent::new(
                EventKind::FriendRequestSent,
                user_id,
                None,
                EventPayload::FriendRequest { target_user_id },
                self.clock.now(),
            ))
            .await;
        Ok(connection.id)
    }

    pub async fn get_user_friends(&self, user_id: UserId) -> PlatformResult<Vec<FriendView>> {
        if self.users.get_user(user_id).await.is_none() {
            return Err(PlatformError::not_found("user not found"));
        }
        let connections = self
            .connections
            .get_user_connections(user_id, Some(ConnectionType::Friend))
            .await;

        let mut friends = Vec::with_capacity(connections.len());
        for connection in &connections {
            if let Some(friend) = self.users.get_user(connection.target_user_id).await {
                friends.push(FriendView::new(&friend, connection));
            }
        }
        Ok(friends)
    }

    /// 好友推荐：二跳候选附带共同好友数与共同兴趣。
    pub async fn get_suggestions(&self, user_id: UserId) -> PlatformResult<Vec<SuggestionView>> {
        let user = self
            .users
            .get_user(user_id)
            .await
            .ok_or_else(|| PlatformError::not_found("user not found"))?;
        let candidates = self
            .connections
            .suggest_connections(user_id, self.limits.suggestions)
            .await;

        let mut suggestions = Vec::with_capacity(candidates.len());
        for candidate_id in candidates {
            let Some(candidate) = self.users.get_user(candidate_id).await else {
                continue;
            };
            let mutual_friends = self
                .connections
                .get_mutual_connections(user_id, candidate_id)
                .await;
            let common_interests = candidate
                .interests
                .iter()
                .filter(|interest| user.interests.contains(interest))
                .cloned()
                .collect();
            suggestions.push(SuggestionView {
                user: UserSummary::from(&candidate),
                mutual_friends_count: mutual_friends.len(),
                common_interests,
            });
        }
        Ok(suggestions)
    }

    // ===== 房间 =====

    /// 建房并让房主走一遍加入流程（含房间订阅）。
    pub async fn create_room(&self, data: NewRoom) -> PlatformResult<RoomSummary> {
        let room = self.rooms.create_room(data).await?;
        if let Some(activities) = self.rooms.join_room(room.id, room.owner_id).await {
            self.events.subscribe_to_room(room.owner_id, room.id).await;
            self.emit_room(activities).await;
        }
        let room = self.rooms.get_room(room.id).await.unwrap_or(room);
        info!(room_id = %room.id, name = %room.name, "房间创建完成");
        Ok(RoomSummary::from(&room))
    }

    pub async fn join_room(&self, room_id: RoomId, user_id: UserId) -> PlatformResult<()> {
        if self.users.get_user(user_id).await.is_none() {
            return Err(PlatformError::not_found("user not found"));
        }
        if self.rooms.get_room(room_id).await.is_none() {
            return Err(PlatformError::not_found("room not found"));
        }
        let activities = self
            .rooms
            .join_room(room_id, user_id)
            .await
            .ok_or_else(|| PlatformError::conflict("room is full"))?;
        self.events.subscribe_to_room(user_id, room_id).await;
        self.emit_room(activities).await;
        Ok(())
    }

    pub async fn leave_room(&self, room_id: RoomId, user_id: UserId) -> PlatformResult<()> {
        if self.rooms.get_room(room_id).await.is_none() {
            return Err(PlatformError::not_found("room not found"));
        }
        let activities = self
            .rooms
            .leave_room(room_id, user_id)
            .await
            .ok_or_else(|| PlatformError::conflict("not a room member"))?;
        self.events.unsubscribe_from_room(user_id, room_id).await;
        self.emit_room(activities).await;
        Ok(())
    }

    pub async fn get_room_info(&self, room_id: RoomId) -> PlatformResult<RoomDetail> {
        let room = self
            .rooms
            .get_room(room_id)
            .await
            .ok_or_else(|| PlatformError::not_found("room not found"))?;

        let mut members = Vec::with_capacity(room.members.len());
        for member_id in &room.members {
            if let Some(member) = self.users.get_user(*member_id).await {
                members.push(UserSummary::from(&member));
            }
        }
        Ok(RoomDetail {
            room_id: room.id,
            name: room.name,
            description: room.description,
            room_type: room.room_type,
            owner_id: room.owner_id,
            capacity: room.capacity,
            members,
            moderators: room.moderators.into_iter().collect(),
            tags: room.tags,
        })
    }

    pub async fn search_rooms(
        &self,
        query: &str,
        filters: Option<&RoomFilters>,
    ) -> Vec<RoomSummary> {
        self.rooms
            .search_rooms(query, filters)
            .await
            .iter()
            .map(RoomSummary::from)
            .collect()
    }

    // ===== 消息 =====

    pub async fn send_message(&self, data: NewMessage) -> PlatformResult<MessageView> {
        if let Some(sender_id) = data.sender_id {
            if self.users.get_user(sender_id).await.is_none() {
                return Err(PlatformError::not_found("user not found"));
            }
        }
        let (message, activities) = self.messages.send_message(data).await?;
        self.emit_message(activities).await;

        let sender = self.users.get_user(message.sender_id).await;
        Ok(MessageView::new(&message, sender.as_ref()))
    }

    /// 房间消息历史，最新的在前；`limit` 缺省取配置窗口。
    pub async fn get_room_messages(
        &self,
        room_id: RoomId,
        limit: Option<usize>,
        before: Option<Timestamp>,
    ) -> Vec<MessageView> {
        let limit = limit.unwrap_or(self.limits.message_history);
        let messages = self.messages.get_room_messages(room_id, limit, before).await;
        self.render_messages(messages).await
    }

    /// 私信收件箱，最新的在前。
    pub async fn get_user_messages(
        &self,
        user_id: UserId,
        limit: Option<usize>,
    ) -> Vec<MessageView> {
        let limit = limit.unwrap_or(self.limits.message_history);
        let messages = self.messages.get_user_messages(user_id, limit).await;
        self.render_messages(messages).await
    }

    pub async fn add_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> PlatformResult<()> {
        let activities = self
            .messages
            .add_reaction(message_id, user_id, emoji)
            .await
            .ok_or_else(|| PlatformError::not_found("message not found"))?;
        self.emit_message(activities).await;
        Ok(())
    }

    pub async fn remove_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> PlatformResult<()> {
        if self.messages.get_message(message_id).await.is_none() {
            return Err(PlatformError::not_found("message not found"));
        }
        let activities = self
            .messages
            .remove_reaction(message_id, user_id, emoji)
            .await
            .ok_or_else(|| PlatformError::not_found("reaction not found"))?;
        self.emit_message(activities).await;
        Ok(())
    }

    pub async fn edit_message(
        &self,
        message_id: MessageId,
        new_content: &str,
        user_id: UserId,
    ) -> PlatformResult<()> {
        if self.messages.get_message(message_id).await.is_none() {
            return Err(PlatformError::not_found("message not found"));
        }
        let activities = self
            .messages
            .edit_message(message_id, new_content, user_id)
            .await
            .ok_or_else(|| PlatformError::forbidden("only the sender can edit a message"))?;
        self.emit_message(activities).await;
        Ok(())
    }

    pub async fn delete_message(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> PlatformResult<()> {
        if self.messages.get_message(message_id).await.is_none() {
            return Err(PlatformError::not_found("message not found"));
        }
        let activities = self
            .messages
            .delete_message(message_id, user_id)
            .await
            .ok_or_else(|| PlatformError::forbidden("only the sender can delete a message"))?;
        self.emit_message(activities).await;
        Ok(())
    }

    // ===== 实时事件 =====

    pub async fn subscribe_to_events(&self, user_id: UserId, kinds: &[EventKind]) {
        self.events.subscribe_user(user_id, kinds).await;
    }

    pub async fn unsubscribe_from_events(&self, user_id: UserId, kinds: &[EventKind]) {
        self.events.unsubscribe_user(user_id, kinds).await;
    }

    pub async fn get_recent_events(
        &self,
        user_id: UserId,
        limit: Option<usize>,
    ) -> Vec<SocialEvent> {
        let limit = limit.unwrap_or(self.limits.recent_events);
        self.events.get_recent_events(user_id, limit).await
    }

    // ===== 通知翻译 =====

    async fn emit_presence(&self, changes: Vec<PresenceChange>) {
        for change in changes {
            self.events
                .emit(SocialEvent::new(
                    EventKind::UserPresenceChanged,
                    change.user_id,
                    None,
                    EventPayload::Presence {
                        status: change.status,
                    },
                    self.clock.now(),
                ))
                .await;
        }
    }

    async fn emit_room(&self, activities: Vec<RoomActivity>) {
        for activity in activities {
            let (kind, room_id, user_id) = match activity {
                RoomActivity::Joined { room_id, user_id } => {
                    (EventKind::RoomUserJoined, room_id, user_id)
                }
                RoomActivity::Left { room_id, user_id } => {
                    (EventKind::RoomUserLeft, room_id, user_id)
                }
            };
            self.events
                .emit(SocialEvent::new(
                    kind,
                    user_id,
                    Some(room_id),
                    EventPayload::Room,
                    self.clock.now(),
                ))
                .await;
        }
    }

    async fn emit_message(&self, activities: Vec<MessageActivity>) {
        for activity in activities {
            let event = match activity {
                MessageActivity::Sent { message } => {
                    Self::message_event(EventKind::MessageSent, &message, self.clock.now())
                }
                MessageActivity::Edited { message } => {
                    Self::message_event(EventKind::MessageEdited, &message, self.clock.now())
                }
                MessageActivity::Deleted { message } => {
                    Self::message_event(EventKind::MessageDeleted, &message, self.clock.now())
                }
                MessageActivity::ReactionAdded {
                    message_id,
                    room_id,
                    user_id,
                    emoji,
                } => SocialEvent::new(
                    EventKind::ReactionAdded,
                    user_id,
                    room_id,
                    EventPayload::Reaction { message_id, emoji },
                    self.clock.now(),
                ),
                MessageActivity::ReactionRemoved {
                    message_id,
                    room_id,
                    user_id,
                    emoji,
                } => SocialEvent::new(
                    EventKind::ReactionRemoved,
                    user_id,
                    room_id,
                    EventPayload::Reaction { message_id, emoji },
                    self.clock.now(),
                ),
            };
            self.events.emit(event).await;
        }
    }

    fn message_event(kind: EventKind, message: &domain::Message, now: Timestamp) -> SocialEvent {
        SocialEvent::new(
            kind,
            message.sender_id,
            message.room_id,
            EventPayload::Message {
                message_id: message.id,
                content: message.content.clone(),
                message_type: message.message_type.clone(),
            },
            now,
        )
    }

    async fn render_messages(&self, messages: Vec<domain::Message>) -> Vec<MessageView> {
        let mut views = Vec::with_capacity(messages.len());
        for message in &messages {
            let sender = self.users.get_user(message.sender_id).await;
            views.push(MessageView::new(message, sender.as_ref()));
        }
        views
    }
}
