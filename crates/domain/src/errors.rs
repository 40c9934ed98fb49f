//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
///
/// 目录操作通过布尔值或 `Option` 表达失败；只有创建实体时
/// 缺失必填字段才会返回错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 缺失必填字段
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// 字段取值不合法
    #[error("invalid argument: {field}: {message}")]
    InvalidArgument { field: String, message: String },
}

impl DomainError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
