//! 房间目录
//!
//! 独占房间表与用户→房间索引。成员变动返回待投递的房间通知；
//! 临时房间在最后一名成员离开时级联删除。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domain::{DomainResult, NewRoom, Room, RoomActivity, RoomId, RoomType, UserId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::Clock;

/// 房间搜索过滤条件；全部条件取与。
#[derive(Debug, Clone, Default)]
pub struct RoomFilters {
    /// 精确类型匹配
    pub room_type: Option<RoomType>,
    /// 仍有空位
    pub has_space: bool,
    /// 与房间标签有交集
    pub tags: Option<Vec<String>>,
}

impl RoomFilters {
    fn matches(&self, room: &Room) -> bool {
        if let Some(room_type) = self.room_type {
            if room.room_type != room_type {
                return false;
            }
        }
        if self.has_space && !room.has_space() {
            return false;
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().any(|t| room.tags.contains(t)) {
                return false;
            }
        }
        true
    }
}

#[derive(Default)]
struct RoomState {
    rooms: HashMap<RoomId, Room>,
    /// user_id -> 所在房间
    user_rooms: HashMap<UserId, HashSet<RoomId>>,
}

pub struct RoomDirectory {
    clock: Arc<dyn Clock>,
    state: RwLock<RoomState>,
}

impl RoomDirectory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: RwLock::new(RoomState::default()),
        }
    }

    /// 创建房间；缺失名称或房主是创建期致命错误。创建不附带
    /// 加入，房主入场由调用方显式发起。
    pub async fn create_room(&self, data: NewRoom) -> DomainResult<Room> {
        let room = Room::create(data, self.clock.now())?;
        let mut state = self.state.write().await;
        state.rooms.insert(room.id, room.clone());
        debug!(room_id = %room.id, name = %room.name, "房间创建");
        Ok(room)
    }

    pub async fn get_room(&self, room_id: RoomId) -> Option<Room> {
        self.state.read().await.rooms.get(&room_id).cloned()
    }

    /// 加入房间；房间未知或已满返回 None。容量只在此刻检查。
    pub async fn join_room(&self, room_id: RoomId, user_id: UserId) -> Option<Vec<RoomActivity>> {
        let mut state = self.state.write().await;
        let room = state.rooms.get_mut(&room_id)?;
        if !room.has_space() {
            return None;
        }
        room.members.insert(user_id);
        state.user_rooms.entry(user_id).or_default().insert(room_id);
        Some(vec![RoomActivity::Joined { room_id, user_id }])
    }

    /// 离开房间；非成员返回 None。临时房间空置时级联删除。
    pub async fn leave_room(&self, room_id: RoomId, user_id: UserId) -> Option<Vec<RoomActivity>> {
        let mut state = self.state.write().await;
        let mut activities = Vec::new();
        Self::leave_locked(&mut state, room_id, user_id, &mut activities).then_some(activities)
    }

    pub async fn get_user_rooms(&self, user_id: UserId) -> Vec<Room> {
        let state = self.state.read().await;
        state
            .user_rooms
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|room_id| state.rooms.get(room_id))
            .cloned()
            .collect()
    }

    /// 大小写不敏感的子串搜索，文本字段取或，过滤条件取与。
    pub async fn search_rooms(&self, query: &str, filters: Option<&RoomFilters>) -> Vec<Room> {
        let query_lower = query.to_lowercase();
        self.state
            .read()
            .await
            .rooms
            .values()
            .filter(|room| room.matches_query(&query_lower))
            .filter(|room| filters.is_none_or(|f| f.matches(room)))
            .cloned()
            .collect()
    }

    /// 任命管理员；发起者必须是房主或现任管理员。
    pub async fn add_moderator(
        &self,
        room_id: RoomId,
        user_id: UserId,
        requester: UserId,
    ) -> bool {
        let mut state = self.state.write().await;
        let Some(room) = state.rooms.get_mut(&room_id) else {
            return false;
        };
        if !room.is_moderator(requester) {
            return false;
        }
        room.moderators.insert(user_id);
        true
    }

    /// 删除房间：先让每名成员走一遍离开流程（保证临时房间级联
    /// 与索引清理的一致性），再移除房间记录。
    pub async fn delete_room(&self, room_id: RoomId) -> Option<Vec<RoomActivity>> {
        let mut state = self.state.write().await;
        let mut activities = Vec::new();
        Self::delete_locked(&mut state, room_id, &mut activities).then_some(activities)
    }

    fn leave_locked(
        state: &mut RoomState,
        room_id: RoomId,
        user_id: UserId,
        out: &mut Vec<RoomActivity>,
    ) -> bool {
        let Some(room) = state.rooms.get_mut(&room_id) else {
            return false;
        };
        if !room.members.remove(&user_id) {
            return false;
        }
        room.moderators.remove(&user_id);
        let now_empty = room.members.is_empty();
        let is_temporary = room.room_type == RoomType::Temporary;

        if let Some(rooms) = state.user_rooms.get_mut(&user_id) {
            rooms.remove(&room_id);
        }
        out.push(RoomActivity::Left { room_id, user_id });

        if is_temporary && now_empty {
            Self::delete_locked(state, room_id, out);
            debug!(room_id = %room_id, "临时房间空置，已删除");
        }
        true
    }

    fn delete_locked(state: &mut RoomState, room_id: RoomId, out: &mut Vec<RoomActivity>) -> bool {
        let Some(room) = state.rooms.get(&room_id) else {
            return false;
        };
        let members: Vec<UserId> = room.members.iter().copied().collect();
        for user_id in members {
            Self::leave_locked(state, room_id, user_id, out);
        }
        // 临时房间可能已在级联里被移除
        state.rooms.remove(&room_id);
        true
    }
}
