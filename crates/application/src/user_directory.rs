//! 用户目录
//!
//! 独占用户资料表与会话表。变更操作返回待投递的在线状态通知，
//! 由门面转发到事件总线。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{
    DomainResult, NewUser, PresenceChange, Session, SessionId, UserId, UserPatch, UserProfile,
    UserStatus,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::Clock;

/// 用户搜索过滤条件；全部条件取与。
#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    /// 精确状态匹配
    pub status: Option<UserStatus>,
    /// 与用户兴趣有交集
    pub interests: Option<Vec<String>>,
    /// 排除离线用户（invisible 不被此过滤排除）
    pub online_only: bool,
}

impl UserFilters {
    fn matches(&self, user: &UserProfile) -> bool {
        if let Some(status) = self.status {
            if user.status != status {
                return false;
            }
        }
        if let Some(interests) = &self.interests {
            if !interests.iter().any(|i| user.interests.contains(i)) {
                return false;
            }
        }
        if self.online_only && user.status == UserStatus::Offline {
            return false;
        }
        true
    }
}

#[derive(Default)]
struct UserState {
    users: HashMap<UserId, UserProfile>,
    sessions: HashMap<SessionId, Session>,
}

pub struct UserDirectory {
    clock: Arc<dyn Clock>,
    state: RwLock<UserState>,
}

impl UserDirectory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: RwLock::new(UserState::default()),
        }
    }

    /// 注册用户并打开首个会话。缺失 `username` 是创建期致命错误。
    pub async fn create_user(
        &self,
        data: NewUser,
    ) -> DomainResult<(UserProfile, SessionId, Vec<PresenceChange>)> {
        let now = self.clock.now();
        let user = UserProfile::register(data, now)?;
        let user_id = user.id;

        let mut state = self.state.write().await;
        state.users.insert(user_id, user.clone());

        let session = Session::open(user_id, now);
        let session_id = session.id;
        state.sessions.insert(session_id, session);

        // 初始状态就是 online，这里不会产生状态变化通知
        let mut changes = Vec::new();
        Self::set_status_locked(&mut state, user_id, UserStatus::Online, now, &mut changes);

        debug!(user_id = %user_id, username = %user.username, "用户注册");
        Ok((user, session_id, changes))
    }

    pub async fn get_user(&self, user_id: UserId) -> Option<UserProfile> {
        self.state.read().await.users.get(&user_id).cloned()
    }

    /// 应用资料补丁；标识符与创建时间不在补丁字段之列。
    /// 成功后总是产生一条在线状态通知。
    pub async fn update_user(
        &self,
        user_id: UserId,
        patch: UserPatch,
    ) -> Option<(UserProfile, Vec<PresenceChange>)> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&user_id)?;
        user.apply(patch, now);
        let snapshot = user.clone();

        let change = PresenceChange {
            user_id,
            status: snapshot.status,
        };
        Some((snapshot, vec![change]))
    }

    /// 设置在线状态；只有状态实际变化才产生通知。
    pub async fn set_status(
        &self,
        user_id: UserId,
        status: UserStatus,
    ) -> Option<Vec<PresenceChange>> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return None;
        }
        let mut changes = Vec::new();
        Self::set_status_locked(&mut state, user_id, status, now, &mut changes);
        Some(changes)
    }

    pub async fn create_session(&self, user_id: UserId) -> Option<(SessionId, Vec<PresenceChange>)> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return None;
        }

        let session = Session::open(user_id, now);
        let session_id = session.id;
        state.sessions.insert(session_id, session);

        let mut changes = Vec::new();
        Self::set_status_locked(&mut state, user_id, UserStatus::Online, now, &mut changes);
        Some((session_id, changes))
    }

    /// 结束会话；最后一个会话结束时用户转为离线。
    pub async fn end_session(&self, session_id: SessionId) -> Option<Vec<PresenceChange>> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let session = state.sessions.remove(&session_id)?;
        let user_id = session.user_id;

        let mut changes = Vec::new();
        let has_other_sessions = state
            .sessions
            .values()
            .any(|s| s.user_id == user_id);
        if !has_other_sessions {
            Self::set_status_locked(&mut state, user_id, UserStatus::Offline, now, &mut changes);
        }
        Some(changes)
    }

    /// 在线用户列表：online/away/busy；invisible 在场但不列出。
    pub async fn get_online_users(&self) -> Vec<UserProfile> {
        self.state
            .read()
            .await
            .users
            .values()
            .filter(|user| user.status.is_listed_online())
            .cloned()
            .collect()
    }

    /// 大小写不敏感的子串搜索，文本字段取或，过滤条件取与。
    pub async fn search_users(
        &self,
        query: &str,
        filters: Option<&UserFilters>,
    ) -> Vec<UserProfile> {
        let query_lower = query.to_lowercase();
        self.state
            .read()
            .await
            .users
            .values()
            .filter(|user| user.matches_query(&query_lower))
            .filter(|user| filters.is_none_or(|f| f.matches(user)))
            .cloned()
            .collect()
    }

    pub async fn session_count(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .count()
    }

    fn set_status_locked(
        state: &mut UserState,
        user_id: UserId,
        status: UserStatus,
        now: domain::Timestamp,
        out: &mut Vec<PresenceChange>,
    ) {
        let Some(user) = state.users.get_mut(&user_id) else {
            return;
        };
        let old_status = user.status;
        user.status = status;
        user.last_active = now;
        if old_status != status {
            out.push(PresenceChange { user_id, status });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn directory() -> UserDirectory {
        UserDirectory::new(Arc::new(SystemClock))
    }

    fn named(username: &str) -> NewUser {
        NewUser {
            username: Some(username.to_owned()),
            ..NewUser::default()
        }
    }

    #[tokio::test]
    async fn create_user_opens_initial_session() {
        let dir = directory();
        let (user, _session, changes) = dir.create_user(named("alice")).await.unwrap();

        assert_eq!(user.status, UserStatus::Online);
        assert_eq!(dir.session_count(user.id).await, 1);
        // 初始状态即 online，无状态变化
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn ending_last_session_sets_offline() {
        let dir = directory();
        let (user, first, _) = dir.create_user(named("alice")).await.unwrap();
        let (second, _) = dir.create_session(user.id).await.unwrap();

        // 还剩一个会话，状态不变
        let changes = dir.end_session(first).await.unwrap();
        assert!(changes.is_empty());
        assert_eq!(dir.get_user(user.id).await.unwrap().status, UserStatus::Online);

        // 最后一个会话结束，强制离线
        let changes = dir.end_session(second).await.unwrap();
        assert_eq!(
            changes,
            vec![PresenceChange {
                user_id: user.id,
                status: UserStatus::Offline
            }]
        );
        assert_eq!(dir.get_user(user.id).await.unwrap().status, UserStatus::Offline);
    }

    #[tokio::test]
    async fn end_unknown_session_fails() {
        let dir = directory();
        assert!(dir.end_session(SessionId::new()).await.is_none());
    }

    #[tokio::test]
    async fn set_status_notifies_only_on_change() {
        let dir = directory();
        let (user, _, _) = dir.create_user(named("alice")).await.unwrap();

        let changes = dir.set_status(user.id, UserStatus::Away).await.unwrap();
        assert_eq!(changes.len(), 1);

        // 重复设置同一状态不产生通知
        let changes = dir.set_status(user.id, UserStatus::Away).await.unwrap();
        assert!(changes.is_empty());

        assert!(dir.set_status(UserId::new(), UserStatus::Busy).await.is_none());
    }

    #[tokio::test]
    async fn online_list_hides_invisible_and_offline() {
        let dir = directory();
        let (alice, _, _) = dir.create_user(named("alice")).await.unwrap();
        let (bob, _, _) = dir.create_user(named("bob")).await.unwrap();
        let (carol, _, _) = dir.create_user(named("carol")).await.unwrap();

        dir.set_status(bob.id, UserStatus::Invisible).await.unwrap();
        dir.set_status(carol.id, UserStatus::Busy).await.unwrap();

        let online: Vec<UserId> = dir.get_online_users().await.iter().map(|u| u.id).collect();
        assert!(online.contains(&alice.id));
        assert!(online.contains(&carol.id));
        assert!(!online.contains(&bob.id));
    }

    #[tokio::test]
    async fn search_matches_text_fields_and_filters() {
        let dir = directory();
        let (alice, _, _) = dir
            .create_user(NewUser {
                username: Some("alice_wonder".to_owned()),
                bio: Some("Loves painting".to_owned()),
                interests: Some(vec!["art".to_owned(), "music".to_owned()]),
                ..NewUser::default()
            })
            .await
            .unwrap();
        dir.create_user(NewUser {
            username: Some("bob_builder".to_owned()),
            interests: Some(vec!["technology".to_owned()]),
            ..NewUser::default()
        })
        .await
        .unwrap();

        // 简介命中，大小写不敏感
        let hits = dir.search_users("PAINT", None).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, alice.id);

        // 兴趣过滤与文本匹配取与
        let filters = UserFilters {
            interests: Some(vec!["art".to_owned()]),
            ..UserFilters::default()
        };
        assert_eq!(dir.search_users("builder", Some(&filters)).await.len(), 0);
        assert_eq!(dir.search_users("alice", Some(&filters)).await.len(), 1);
    }

    #[tokio::test]
    async fn online_only_filter_keeps_invisible() {
        let dir = directory();
        let (alice, _, _) = dir.create_user(named("alice")).await.unwrap();
        let (bob, _, _) = dir.create_user(named("bobby")).await.unwrap();

        dir.set_status(alice.id, UserStatus::Invisible).await.unwrap();
        dir.set_status(bob.id, UserStatus::Offline).await.unwrap();

        let filters = UserFilters {
            online_only: true,
            ..UserFilters::default()
        };
        // invisible 通过 online_only；offline 被排除
        assert_eq!(dir.search_users("alice", Some(&filters)).await.len(), 1);
        assert_eq!(dir.search_users("bobby", Some(&filters)).await.len(), 0);
    }

    #[tokio::test]
    async fn update_user_touches_last_active() {
        let dir = directory();
        let (user, _, _) = dir.create_user(named("alice")).await.unwrap();
        let before = dir.get_user(user.id).await.unwrap().last_active;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (updated, changes) = dir
            .update_user(
                user.id,
                UserPatch {
                    display_name: Some("Alice".to_owned()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Alice");
        assert!(updated.last_active > before);
        assert_eq!(changes.len(), 1);
    }
}
