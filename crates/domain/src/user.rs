use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{SessionId, Timestamp, UserId};

/// 用户在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Online,
    Away,
    Busy,
    Invisible,
    Offline,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Online => "online",
            UserStatus::Away => "away",
            UserStatus::Busy => "busy",
            UserStatus::Invisible => "invisible",
            UserStatus::Offline => "offline",
        }
    }

    /// 在线用户列表只包含 online/away/busy；invisible 视为
    /// “在场但不出现在列表里”。
    pub fn is_listed_online(&self) -> bool {
        matches!(self, UserStatus::Online | UserStatus::Away | UserStatus::Busy)
    }
}

/// 资料字段的可见级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Friends,
    Private,
    Custom,
}

/// 用户资料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub status: UserStatus,
    pub preferences: HashMap<String, Value>,
    pub privacy_settings: HashMap<String, PrivacyLevel>,
    pub interests: Vec<String>,
    pub achievements: Vec<Value>,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
    // 凭据哈希不暴露给客户端
    #[serde(skip_serializing, default)]
    pub hashed_password: Option<String>,
    pub metadata: HashMap<String, Value>,
}

/// 注册新用户的输入
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<HashMap<String, Value>>,
    pub privacy_settings: Option<HashMap<String, PrivacyLevel>>,
    pub interests: Option<Vec<String>>,
    pub hashed_password: Option<String>,
    pub metadata: Option<HashMap<String, Value>>,
}

/// 资料更新补丁：只允许修改这里列出的字段，
/// 标识符与创建时间不可变。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub status: Option<UserStatus>,
    pub preferences: Option<HashMap<String, Value>>,
    pub privacy_settings: Option<HashMap<String, PrivacyLevel>>,
    pub interests: Option<Vec<String>>,
    pub achievements: Option<Vec<Value>>,
    pub metadata: Option<HashMap<String, Value>>,
}

impl UserProfile {
    /// 默认隐私设置：资料公开，状态与动态仅好友可见，社交关系私密。
    pub fn default_privacy_settings() -> HashMap<String, PrivacyLevel> {
        HashMap::from([
            ("profile".to_owned(), PrivacyLevel::Public),
            ("status".to_owned(), PrivacyLevel::Friends),
            ("activity".to_owned(), PrivacyLevel::Friends),
            ("connections".to_owned(), PrivacyLevel::Private),
        ])
    }

    pub fn register(data: NewUser, now: Timestamp) -> DomainResult<Self> {
        let username = data
            .username
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| DomainError::missing_field("username"))?;

        Ok(Self {
            id: data.user_id.unwrap_or_default(),
            display_name: data.display_name.unwrap_or_else(|| username.clone()),
            username,
            avatar_url: data.avatar_url,
            bio: data.bio,
            status: UserStatus::Online,
            preferences: data.preferences.unwrap_or_default(),
            privacy_settings: data
                .privacy_settings
                .unwrap_or_else(Self::default_privacy_settings),
            interests: data.interests.unwrap_or_default(),
            achievements: Vec::new(),
            created_at: now,
            last_active: now,
            hashed_password: data.hashed_password,
            metadata: data.metadata.unwrap_or_default(),
        })
    }

    /// 应用资料补丁并刷新活跃时间。
    pub fn apply(&mut self, patch: UserPatch, now: Timestamp) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(display_name) = patch.display_name {
            self.display_name = display_name;
        }
        if let Some(avatar_url) = patch.avatar_url {
            self.avatar_url = Some(avatar_url);
        }
        if let Some(bio) = patch.bio {
            self.bio = Some(bio);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(preferences) = patch.preferences {
            self.preferences = preferences;
        }
        if let Some(privacy_settings) = patch.privacy_settings {
            self.privacy_settings = privacy_settings;
        }
        if let Some(interests) = patch.interests {
            self.interests = interests;
        }
        if let Some(achievements) = patch.achievements {
            self.achievements = achievements;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
        self.last_active = now;
    }

    /// 文本匹配：用户名 / 显示名 / 简介，三者取或。
    pub fn matches_query(&self, query_lower: &str) -> bool {
        self.username.to_lowercase().contains(query_lower)
            || self.display_name.to_lowercase().contains(query_lower)
            || self
                .bio
                .as_ref()
                .is_some_and(|bio| bio.to_lowercase().contains(query_lower))
    }
}

/// 用户会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
    pub metadata: HashMap<String, Value>,
}

impl Session {
    pub fn open(user_id: UserId, now: Timestamp) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            created_at: now,
            last_activity: now,
            metadata: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn register_requires_username() {
        let err = UserProfile::register(NewUser::default(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::missing_field("username"));
    }

    #[test]
    fn register_fills_defaults() {
        let user = UserProfile::register(
            NewUser {
                username: Some("alice".to_owned()),
                ..NewUser::default()
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(user.display_name, "alice");
        assert_eq!(user.status, UserStatus::Online);
        assert_eq!(
            user.privacy_settings.get("connections"),
            Some(&PrivacyLevel::Private)
        );
    }

    #[test]
    fn patch_cannot_touch_identity() {
        let now = Utc::now();
        let mut user = UserProfile::register(
            NewUser {
                username: Some("alice".to_owned()),
                ..NewUser::default()
            },
            now,
        )
        .unwrap();
        let id = user.id;

        user.apply(
            UserPatch {
                bio: Some("hello".to_owned()),
                ..UserPatch::default()
            },
            now + chrono::Duration::seconds(5),
        );

        assert_eq!(user.id, id);
        assert_eq!(user.created_at, now);
        assert_eq!(user.bio.as_deref(), Some("hello"));
        assert!(user.last_active > now);
    }
}
