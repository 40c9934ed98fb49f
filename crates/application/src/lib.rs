//! 应用层实现。
//!
//! 五个目录各自独占自己的实体表和索引，变更操作返回待投递的
//! 领域通知；`SocialPlatform` 门面负责组合目录、汇集通知并经
//! 事件总线扇出。

pub mod auth;
pub mod clock;
pub mod connection_graph;
pub mod dto;
pub mod error;
pub mod event_bus;
pub mod message_store;
pub mod platform;
pub mod room_directory;
pub mod user_directory;

pub use auth::{AuthError, BcryptPasswordHasher, Claims, PasswordHasher, TokenService};
pub use clock::{Clock, SystemClock};
pub use connection_graph::ConnectionGraph;
pub use dto::{Envelope, FriendView, MessageView, RoomDetail, RoomSummary, UserSummary};
pub use error::{PlatformError, PlatformResult};
pub use event_bus::{EventBus, EventHandler, LogNotifier, Notifier};
pub use message_store::MessageStore;
pub use platform::{
    LoginResponse, PlatformDependencies, RegisterRequest, SocialPlatform, SuggestionView,
};
pub use room_directory::{RoomDirectory, RoomFilters};
pub use user_directory::{UserDirectory, UserFilters};
