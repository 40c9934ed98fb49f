//! 门面层错误定义
//!
//! 目录层以布尔值或 `Option` 表达失败，门面把它们翻译成统一的
//! 错误分类；任何底层错误都不会越过门面传给调用方。

use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// 门面错误分类
#[derive(Debug, Error)]
pub enum PlatformError {
    /// 标识符未命中任何实体
    #[error("not found: {0}")]
    NotFound(String),

    /// 与现有状态冲突（重复关系、房间已满）
    #[error("conflict: {0}")]
    Conflict(String),

    /// 权限不足（非发送者编辑、非管理员操作）
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// 输入缺失或不合法
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 内部适配器错误（密码哈希、令牌签发）
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<DomainError> for PlatformError {
    fn from(err: DomainError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<crate::auth::AuthError> for PlatformError {
    fn from(err: crate::auth::AuthError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// 门面结果类型
pub type PlatformResult<T> = Result<T, PlatformError>;

/// `{success: false, error: ...}` 响应体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl From<&PlatformError> for ErrorBody {
    fn from(err: &PlatformError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_carries_failure_envelope() {
        let err = PlatformError::not_found("room not found");
        let json = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "not found: room not found");
    }

    #[test]
    fn domain_errors_map_to_invalid_input() {
        let err = PlatformError::from(domain::DomainError::missing_field("username"));
        assert!(matches!(err, PlatformError::InvalidInput(_)));
    }
}
