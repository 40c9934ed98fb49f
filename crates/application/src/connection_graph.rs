//! 社交关系图
//!
//! 有向边的集合，带每用户的出边索引（保持插入顺序，推荐遍历
//! 依赖发现顺序）。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{Connection, ConnectionId, ConnectionType, UserId};
use tokio::sync::RwLock;

use crate::clock::Clock;

#[derive(Default)]
struct GraphState {
    connections: HashMap<ConnectionId, Connection>,
    /// user_id -> 出边（插入顺序）
    outgoing: HashMap<UserId, Vec<ConnectionId>>,
}

pub struct ConnectionGraph {
    clock: Arc<dyn Clock>,
    state: RwLock<GraphState>,
}

impl ConnectionGraph {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: RwLock::new(GraphState::default()),
        }
    }

    /// 创建有向边。若此刻已存在同类型的反向边，两条边同时置
    /// mutual；这是一次性的检测，之后不再重算。
    pub async fn create_connection(
        &self,
        user_id: UserId,
        target_user_id: UserId,
        connection_type: ConnectionType,
    ) -> Connection {
        let now = self.clock.now();
        let mut connection = Connection::new(user_id, target_user_id, connection_type, now);

        let mut state = self.state.write().await;
        let reverse_id = Self::find_locked(&state, target_user_id, user_id)
            .filter(|conn| conn.connection_type == connection_type)
            .map(|conn| conn.id);
        if let Some(reverse_id) = reverse_id {
            connection.mutual = true;
            if let Some(reverse) = state.connections.get_mut(&reverse_id) {
                reverse.mutual = true;
            }
        }

        state.outgoing.entry(user_id).or_default().push(connection.id);
        state.connections.insert(connection.id, connection.clone());
        connection
    }

    /// 线性扫描出边索引，返回第一条指向目标的边。
    pub async fn get_connection(
        &self,
        user_id: UserId,
        target_user_id: UserId,
    ) -> Option<Connection> {
        let state = self.state.read().await;
        Self::find_locked(&state, user_id, target_user_id).cloned()
    }

    pub async fn get_user_connections(
        &self,
        user_id: UserId,
        connection_type: Option<ConnectionType>,
    ) -> Vec<Connection> {
        let state = self.state.read().await;
        Self::outgoing_locked(&state, user_id)
            .filter(|conn| {
                connection_type.is_none_or(|kind| conn.connection_type == kind)
            })
            .cloned()
            .collect()
    }

    /// 强度收窄到 [0, 1]。
    pub async fn update_connection_strength(
        &self,
        connection_id: ConnectionId,
        strength: f64,
    ) -> bool {
        let mut state = self.state.write().await;
        match state.connections.get_mut(&connection_id) {
            Some(connection) => {
                connection.set_strength(strength);
                true
            }
            None => false,
        }
    }

    /// 删除边与索引项；不回头清除反向边的 mutual 标志。
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> bool {
        let mut state = self.state.write().await;
        let Some(connection) = state.connections.remove(&connection_id) else {
            return false;
        };
        if let Some(index) = state.outgoing.get_mut(&connection.user_id) {
            index.retain(|id| *id != connection_id);
        }
        true
    }

    /// 双方好友目标集的交集。
    pub async fn get_mutual_connections(
        &self,
        user_id: UserId,
        target_user_id: UserId,
    ) -> Vec<UserId> {
        let state = self.state.read().await;
        let target_friends: std::collections::HashSet<UserId> =
            Self::friends_locked(&state, target_user_id).collect();
        Self::friends_locked(&state, user_id)
            .filter(|friend| target_friends.contains(friend))
            .collect()
    }

    /// 二跳好友推荐：按发现顺序收集好友的好友，跳过自己和已有
    /// 好友，去重后截断到 limit。
    pub async fn suggest_connections(&self, user_id: UserId, limit: usize) -> Vec<UserId> {
        let state = self.state.read().await;
        let friends: Vec<UserId> = Self::friends_locked(&state, user_id).collect();
        let friend_set: std::collections::HashSet<UserId> = friends.iter().copied().collect();

        let mut suggestions = Vec::new();
        for friend_id in friends {
            for candidate in Self::friends_locked(&state, friend_id) {
                if candidate != user_id
                    && !friend_set.contains(&candidate)
                    && !suggestions.contains(&candidate)
                {
                    suggestions.push(candidate);
                }
            }
        }
        suggestions.truncate(limit);
        suggestions
    }

    fn find_locked(
        state: &GraphState,
        user_id: UserId,
        target_user_id: UserId,
    ) -> Option<&Connection> {
        Self::outgoing_locked(state, user_id).find(|conn| conn.target_user_id == target_user_id)
    }

    fn outgoing_locked(state: &GraphState, user_id: UserId) -> impl Iterator<Item = &Connection> + '_ {
        state
            .outgoing
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.connections.get(id))
    }

    fn friends_locked(state: &GraphState, user_id: UserId) -> impl Iterator<Item = UserId> + '_ {
        Self::outgoing_locked(state, user_id)
            .filter(|conn| conn.connection_type == ConnectionType::Friend)
            .map(|conn| conn.target_user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn graph() -> ConnectionGraph {
        ConnectionGraph::new(Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn mutual_flag_set_on_matching_reverse_edge() {
        let graph = graph();
        let alice = UserId::new();
        let bob = UserId::new();

        let forward = graph
            .create_connection(alice, bob, ConnectionType::Friend)
            .await;
        assert!(!forward.mutual);

        let reverse = graph
            .create_connection(bob, alice, ConnectionType::Friend)
            .await;
        assert!(reverse.mutual);

        // 第二条边创建时，两侧同时置位
        assert!(graph.get_connection(alice, bob).await.unwrap().mutual);
        assert!(graph.get_connection(bob, alice).await.unwrap().mutual);
    }

    #[tokio::test]
    async fn mutual_requires_same_type() {
        let graph = graph();
        let alice = UserId::new();
        let bob = UserId::new();

        graph
            .create_connection(alice, bob, ConnectionType::Follower)
            .await;
        let reverse = graph
            .create_connection(bob, alice, ConnectionType::Friend)
            .await;
        assert!(!reverse.mutual);
    }

    #[tokio::test]
    async fn later_edges_never_flip_earlier_mutual_flags() {
        let graph = graph();
        let alice = UserId::new();
        let bob = UserId::new();
        let carol = UserId::new();

        graph
            .create_connection(alice, bob, ConnectionType::Friend)
            .await;
        graph
            .create_connection(bob, alice, ConnectionType::Friend)
            .await;

        // 无关的边不影响既有标志
        graph
            .create_connection(alice, carol, ConnectionType::Friend)
            .await;
        assert!(graph.get_connection(alice, bob).await.unwrap().mutual);

        // 删除反向边也不清除正向边的标志
        let reverse = graph.get_connection(bob, alice).await.unwrap();
        assert!(graph.remove_connection(reverse.id).await);
        assert!(graph.get_connection(alice, bob).await.unwrap().mutual);
        assert!(graph.get_connection(bob, alice).await.is_none());
    }

    #[tokio::test]
    async fn strength_updates_are_clamped() {
        let graph = graph();
        let conn = graph
            .create_connection(UserId::new(), UserId::new(), ConnectionType::Friend)
            .await;

        assert!(graph.update_connection_strength(conn.id, 2.5).await);
        let stored = graph
            .get_connection(conn.user_id, conn.target_user_id)
            .await
            .unwrap();
        assert_eq!(stored.strength, 1.0);

        assert!(!graph.update_connection_strength(ConnectionId::new(), 0.5).await);
    }

    #[tokio::test]
    async fn mutual_connections_intersect_friend_sets() {
        let graph = graph();
        let alice = UserId::new();
        let bob = UserId::new();
        let shared = UserId::new();
        let only_alice = UserId::new();

        graph.create_connection(alice, shared, ConnectionType::Friend).await;
        graph.create_connection(alice, only_alice, ConnectionType::Friend).await;
        graph.create_connection(bob, shared, ConnectionType::Friend).await;

        let mutual = graph.get_mutual_connections(alice, bob).await;
        assert_eq!(mutual, vec![shared]);
    }

    #[tokio::test]
    async fn suggestions_follow_discovery_order_and_dedup() {
        let graph = graph();
        let user = UserId::new();
        let f1 = UserId::new();
        let f2 = UserId::new();
        let c1 = UserId::new();
        let c2 = UserId::new();

        graph.create_connection(user, f1, ConnectionType::Friend).await;
        graph.create_connection(user, f2, ConnectionType::Friend).await;
        // f1 认识 c1、c2；f2 也认识 c1（重复路径）和 user 本人
        graph.create_connection(f1, c1, ConnectionType::Friend).await;
        graph.create_connection(f1, c2, ConnectionType::Friend).await;
        graph.create_connection(f2, c1, ConnectionType::Friend).await;
        graph.create_connection(f2, user, ConnectionType::Friend).await;

        let suggestions = graph.suggest_connections(user, 10).await;
        assert_eq!(suggestions, vec![c1, c2]);

        let limited = graph.suggest_connections(user, 1).await;
        assert_eq!(limited, vec![c1]);
    }

    #[tokio::test]
    async fn existing_friends_are_not_suggested() {
        let graph = graph();
        let user = UserId::new();
        let f1 = UserId::new();
        let f2 = UserId::new();

        graph.create_connection(user, f1, ConnectionType::Friend).await;
        graph.create_connection(user, f2, ConnectionType::Friend).await;
        graph.create_connection(f1, f2, ConnectionType::Friend).await;

        assert!(graph.suggest_connections(user, 10).await.is_empty());
    }
}
