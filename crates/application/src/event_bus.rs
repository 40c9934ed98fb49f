//! 事件总线
//!
//! 事件先进入无界历史，再扇出给按类型注册的处理器与订阅者。
//! 单个处理器或通知通道失败只记日志，不影响其余投递。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{EventKind, RoomId, SocialEvent, UserId};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// 按事件类型挂载的处理器。
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &SocialEvent) -> anyhow::Result<()>;
}

/// 订阅者通知通道。生产部署里对接 WebSocket 或推送网关，
/// 这里默认落日志。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: UserId, event: &SocialEvent) -> anyhow::Result<()>;
}

/// 把通知打进结构化日志的缺省实现。
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: UserId, event: &SocialEvent) -> anyhow::Result<()> {
        info!(user_id = %user_id, kind = event.kind.as_str(), "通知订阅者");
        Ok(())
    }
}

#[derive(Default)]
struct BusState {
    /// user_id -> 订阅的事件类型
    user_subscriptions: HashMap<UserId, HashSet<EventKind>>,
    /// room_id -> 订阅该房间的用户
    room_subscriptions: HashMap<RoomId, HashSet<UserId>>,
    /// 按发生顺序追加的事件历史
    history: Vec<SocialEvent>,
}

pub struct EventBus {
    notifier: Arc<dyn Notifier>,
    handlers: RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
    state: RwLock<BusState>,
}

impl EventBus {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            handlers: RwLock::new(HashMap::new()),
            state: RwLock::new(BusState::default()),
        }
    }

    pub async fn register_handler(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.entry(kind).or_default().push(handler);
    }

    pub async fn subscribe_user(&self, user_id: UserId, kinds: &[EventKind]) {
        self.state
            .write()
            .await
            .user_subscriptions
            .entry(user_id)
            .or_default()
            .extend(kinds.iter().copied());
    }

    pub async fn unsubscribe_user(&self, user_id: UserId, kinds: &[EventKind]) {
        if let Some(subscribed) = self.state.write().await.user_subscriptions.get_mut(&user_id) {
            for kind in kinds {
                subscribed.remove(kind);
            }
        }
    }

    pub async fn subscribe_to_room(&self, user_id: UserId, room_id: RoomId) {
        self.state
            .write()
            .await
            .room_subscriptions
            .entry(room_id)
            .or_default()
            .insert(user_id);
    }

    pub async fn unsubscribe_from_room(&self, user_id: UserId, room_id: RoomId) {
        if let Some(subscribers) = self.state.write().await.room_subscriptions.get_mut(&room_id) {
            subscribers.remove(&user_id);
        }
    }

    /// 发布事件：先入历史，再依次跑处理器，最后通知订阅者。
    /// 订阅者集合是类型订阅与房间订阅的并集，每人至多一次。
    pub async fn emit(&self, event: SocialEvent) {
        let recipients = {
            let mut state = self.state.write().await;
            let mut recipients: HashSet<UserId> = state
                .user_subscriptions
                .iter()
                .filter(|(_, kinds)| kinds.contains(&event.kind))
                .map(|(user_id, _)| *user_id)
                .collect();
            if let Some(room_id) = event.room_id {
                if let Some(subscribers) = state.room_subscriptions.get(&room_id) {
                    recipients.extend(subscribers.iter().copied());
                }
            }
            state.history.push(event.clone());
            recipients
        };

        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .await
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            if let Err(error) = handler.handle_event(&event).await {
                warn!(kind = event.kind.as_str(), %error, "事件处理器执行失败");
            }
        }

        for user_id in recipients {
            if let Err(error) = self.notifier.notify(user_id, &event).await {
                warn!(user_id = %user_id, kind = event.kind.as_str(), %error, "订阅者通知失败");
            }
        }
    }

    /// 取用户视角的最近事件，最新的在前。命中条件：订阅了该
    /// 类型、事件属于自己，或订阅了事件所在房间。
    pub async fn get_recent_events(&self, user_id: UserId, limit: usize) -> Vec<SocialEvent> {
        let state = self.state.read().await;
        let subscribed = state.user_subscriptions.get(&user_id);
        state
            .history
            .iter()
            .rev()
            .filter(|event| {
                subscribed.is_some_and(|kinds| kinds.contains(&event.kind))
                    || event.user_id == user_id
                    || event.room_id.is_some_and(|room_id| {
                        state
                            .room_subscriptions
                            .get(&room_id)
                            .is_some_and(|subscribers| subscribers.contains(&user_id))
                    })
            })
            .take(limit)
            .cloned()
            .collect()
    }
}
