//! 社交平台核心领域模型
//!
//! 包含用户、会话、社交关系、房间、消息等核心实体，以及
//! 目录操作返回的领域通知和事件类型。

pub mod connection;
pub mod errors;
pub mod events;
pub mod message;
pub mod room;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use connection::*;
pub use errors::*;
pub use events::*;
pub use message::*;
pub use room::*;
pub use user::*;
pub use value_objects::*;
