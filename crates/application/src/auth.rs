//! 认证适配器：密码哈希与访问令牌。
//!
//! 仅供门面的注册/登录路径使用，目录本身不依赖这里的任何东西。

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("hash error: {0}")]
    Hash(String),
    #[error("verify error: {0}")]
    Verify(String),
    #[error("token error: {0}")]
    Token(String),
}

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<String, AuthError>;
    async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, AuthError>;
}

/// bcrypt 实现
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| AuthError::Hash(e.to_string()))
    }

    async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, AuthError> {
        bcrypt::verify(plaintext, hashed).map_err(|e| AuthError::Verify(e.to_string()))
    }
}

/// 令牌声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// HS256 签名的过期令牌
pub struct TokenService {
    secret: String,
    expiry: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, expiry_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            expiry: Duration::minutes(expiry_minutes),
        }
    }

    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_owned(),
            exp: (Utc::now() + self.expiry).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Token(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| AuthError::Token(e.to_string()))
    }
}
