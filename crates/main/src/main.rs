//! 主应用程序入口
//!
//! 装配平台门面并跑一段演示流程：注册、加好友、建房、发消息、
//! 回应与推荐。

use application::{PlatformDependencies, RegisterRequest, SocialPlatform};
use config::AppConfig;
use domain::{EventKind, NewMessage, NewRoom};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    let platform = SocialPlatform::new(PlatformDependencies::from_config(&config));

    // 注册两名演示用户
    let alice = platform
        .register_user(RegisterRequest {
            username: Some("alice_wonder".to_owned()),
            display_name: Some("Alice".to_owned()),
            bio: Some("Love exploring virtual worlds".to_owned()),
            interests: Some(vec!["gaming".into(), "art".into(), "music".into()]),
            ..RegisterRequest::default()
        })
        .await?;
    let bob = platform
        .register_user(RegisterRequest {
            username: Some("bob_builder".to_owned()),
            display_name: Some("Bob".to_owned()),
            bio: Some("Creative developer and designer".to_owned()),
            interests: Some(vec!["technology".into(), "design".into(), "music".into()]),
            ..RegisterRequest::default()
        })
        .await?;
    tracing::info!(
        alice = %alice.user.username,
        bob = %bob.user.username,
        "演示用户注册完成"
    );

    // 互加好友
    platform
        .send_friend_request(alice.user.user_id, bob.user.user_id)
        .await?;
    platform
        .send_friend_request(bob.user.user_id, alice.user.user_id)
        .await?;
    let friends = platform.get_user_friends(alice.user.user_id).await?;
    let mutual = friends.first().map(|f| f.mutual).unwrap_or(false);
    tracing::info!(count = friends.len(), mutual, "好友关系建立");

    // 建房并拉人
    let room = platform
        .create_room(NewRoom {
            name: Some("Creative Lounge".to_owned()),
            description: Some("A space for creative minds to connect".to_owned()),
            owner_id: Some(alice.user.user_id),
            capacity: Some(10),
            tags: Some(vec!["creative".into(), "art".into(), "collaboration".into()]),
            ..NewRoom::default()
        })
        .await?;
    platform.join_room(room.room_id, bob.user.user_id).await?;

    // 房间消息与回应
    let message = platform
        .send_message(NewMessage {
            sender_id: Some(alice.user.user_id),
            room_id: Some(room.room_id),
            content: Some("Welcome to the Creative Lounge!".to_owned()),
            ..NewMessage::default()
        })
        .await?;
    platform
        .send_message(NewMessage {
            sender_id: Some(bob.user.user_id),
            room_id: Some(room.room_id),
            content: Some("Thanks! Excited to be here.".to_owned()),
            ..NewMessage::default()
        })
        .await?;
    platform
        .add_reaction(message.message_id, bob.user.user_id, "🎉")
        .await?;

    let history = platform.get_room_messages(room.room_id, None, None).await;
    for view in &history {
        tracing::info!(
            sender = view.sender.as_ref().map(|s| s.username.as_str()).unwrap_or("?"),
            content = %view.content,
            reactions = view.reactions.len(),
            "房间消息"
        );
    }

    // 搜索与推荐
    let artists = platform.search_users("art", None).await;
    tracing::info!(hits = artists.len(), "按兴趣搜索用户");
    let rooms = platform.search_rooms("creative", None).await;
    tracing::info!(hits = rooms.len(), "搜索房间");

    // bob 订阅在线状态事件后查看自己的事件流
    platform
        .subscribe_to_events(bob.user.user_id, &[EventKind::UserPresenceChanged])
        .await;
    let events = platform.get_recent_events(bob.user.user_id, None).await;
    for event in &events {
        tracing::info!(kind = event.kind.as_str(), payload = %serde_json::to_string(&event.payload)?, "最近事件");
    }

    // 登出后不再出现在在线列表
    platform.logout_user(alice.session_id).await?;
    let online = platform.get_online_users().await;
    tracing::info!(online = online.len(), "演示结束");

    Ok(())
}
