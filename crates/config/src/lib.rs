//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 令牌与密码哈希
//! - 消息历史与事件查询的默认窗口

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 认证配置
    pub auth: AuthConfig,
    /// 查询窗口配置
    pub limits: LimitsConfig,
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub token_expiry_minutes: i64,
    pub bcrypt_cost: u32,
}

/// 查询窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// 房间/私信历史一次返回的默认条数
    pub message_history: usize,
    /// 最近事件一次返回的默认条数
    pub recent_events: usize,
    /// 好友推荐的默认条数
    pub suggestions: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // 仅用于开发环境，生产部署必须通过环境变量覆盖
            secret: "a_very_secret_key_for_dev_only".to_owned(),
            token_expiry_minutes: 30,
            bcrypt_cost: bcrypt_default_cost(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            message_history: 50,
            recent_events: 50,
            suggestions: 10,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

// bcrypt::DEFAULT_COST，不在此引入 bcrypt 依赖
const fn bcrypt_default_cost() -> u32 {
    12
}

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl AppConfig {
    /// 加载配置：默认值 < `social-platform.yaml` < `SOCIAL_*` 环境变量。
    pub fn load() -> Result<Self, ConfigError> {
        let config = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file("social-platform.yaml"))
            .merge(Env::prefixed("SOCIAL_").split("__"))
            .extract()
            .map_err(Box::new)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.auth.token_expiry_minutes, 30);
        assert_eq!(config.limits.message_history, 50);
        assert_eq!(config.limits.suggestions, 10);
    }

    #[test]
    fn load_without_sources_uses_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            let config = AppConfig::load().expect("load defaults");
            assert_eq!(config.auth.bcrypt_cost, 12);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("SOCIAL_AUTH__TOKEN_EXPIRY_MINUTES", "120");
            let config = AppConfig::load().expect("load from env");
            assert_eq!(config.auth.token_expiry_minutes, 120);
            Ok(())
        });
    }
}
