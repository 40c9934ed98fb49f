//! 门面级端到端流程测试。

use std::sync::Arc;

use application::{
    BcryptPasswordHasher, LogNotifier, PlatformDependencies, PlatformError, RegisterRequest,
    SocialPlatform, SystemClock, TokenService,
};
use config::LimitsConfig;
use domain::{EventKind, NewMessage, NewRoom, RoomType, UserId, UserStatus};

fn platform() -> SocialPlatform {
    SocialPlatform::new(PlatformDependencies {
        clock: Arc::new(SystemClock),
        // 低 cost，只为测试速度
        password_hasher: Arc::new(BcryptPasswordHasher::new(4)),
        token_service: TokenService::new("test-secret", 30),
        notifier: Arc::new(LogNotifier),
        limits: LimitsConfig::default(),
    })
}

fn named(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: Some(username.to_owned()),
        ..RegisterRequest::default()
    }
}

async fn register(platform: &SocialPlatform, username: &str) -> UserId {
    platform
        .register_user(named(username))
        .await
        .expect("register")
        .user
        .user_id
}

#[tokio::test]
async fn mutual_friendship_emerges_from_two_requests() {
    let platform = platform();
    let alice = register(&platform, "alice").await;
    let bob = register(&platform, "bob").await;

    platform.send_friend_request(alice, bob).await.unwrap();
    let friends = platform.get_user_friends(alice).await.unwrap();
    assert_eq!(friends.len(), 1);
    assert!(!friends[0].mutual);

    // 反向请求补全互相关注
    platform.send_friend_request(bob, alice).await.unwrap();
    let friends = platform.get_user_friends(alice).await.unwrap();
    assert!(friends[0].mutual);

    // 已有连接不能重复发起
    let err = platform.send_friend_request(alice, bob).await.unwrap_err();
    assert!(matches!(err, PlatformError::Conflict(_)));

    // 未知用户直接拒绝
    let err = platform
        .send_friend_request(alice, UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::NotFound(_)));
}

#[tokio::test]
async fn full_room_rejects_extra_member() {
    let platform = platform();
    let alice = register(&platform, "alice").await;
    let bob = register(&platform, "bob").await;

    let room = platform
        .create_room(NewRoom {
            name: Some("tiny".to_owned()),
            owner_id: Some(alice),
            capacity: Some(1),
            ..NewRoom::default()
        })
        .await
        .unwrap();
    // 房主已自动入场
    assert_eq!(room.member_count, 1);

    let err = platform.join_room(room.room_id, bob).await.unwrap_err();
    assert!(matches!(err, PlatformError::Conflict(_)));
}

#[tokio::test]
async fn room_subscriber_sees_message_events() {
    let platform = platform();
    let alice = register(&platform, "alice").await;
    let bob = register(&platform, "bob").await;

    let room = platform
        .create_room(NewRoom {
            name: Some("lounge".to_owned()),
            owner_id: Some(alice),
            ..NewRoom::default()
        })
        .await
        .unwrap();
    platform.join_room(room.room_id, bob).await.unwrap();

    let message = platform
        .send_message(NewMessage {
            sender_id: Some(alice),
            room_id: Some(room.room_id),
            content: Some("hello".to_owned()),
            ..NewMessage::default()
        })
        .await
        .unwrap();

    // bob 通过房间订阅看到 message_sent，且事件落在该房间
    let events = platform.get_recent_events(bob, None).await;
    assert!(events.iter().any(|event| {
        event.kind == EventKind::MessageSent && event.room_id == Some(room.room_id)
    }));

    // 非发送者不能编辑
    let err = platform
        .edit_message(message.message_id, "hacked", bob)
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::Forbidden(_)));

    platform
        .edit_message(message.message_id, "hello again", alice)
        .await
        .unwrap();
    let history = platform.get_room_messages(room.room_id, None, None).await;
    assert_eq!(history[0].content, "hello again");
}

#[tokio::test]
async fn logout_of_last_session_goes_offline() {
    let platform = platform();
    let response = platform.register_user(named("alice")).await.unwrap();
    let alice = response.user.user_id;

    assert_eq!(platform.get_online_users().await.len(), 1);

    platform.logout_user(response.session_id).await.unwrap();
    assert!(platform.get_online_users().await.is_empty());
    assert_eq!(
        platform.users().get_user(alice).await.unwrap().status,
        UserStatus::Offline
    );

    // 会话已结束，重复登出报未找到
    let err = platform.logout_user(response.session_id).await.unwrap_err();
    assert!(matches!(err, PlatformError::NotFound(_)));
}

#[tokio::test]
async fn login_verifies_stored_credential() {
    let platform = platform();
    let response = platform
        .register_user(RegisterRequest {
            username: Some("alice".to_owned()),
            password: Some("hunter2".to_owned()),
            ..RegisterRequest::default()
        })
        .await
        .unwrap();
    let alice = response.user.user_id;

    let err = platform.login_user(alice, Some("wrong")).await.unwrap_err();
    assert!(matches!(err, PlatformError::Forbidden(_)));
    let err = platform.login_user(alice, None).await.unwrap_err();
    assert!(matches!(err, PlatformError::Forbidden(_)));

    let login = platform.login_user(alice, Some("hunter2")).await.unwrap();
    let claims = platform.authenticate(&login.token).unwrap();
    assert_eq!(claims.sub, "alice");
}

#[tokio::test]
async fn temporary_room_disappears_after_owner_leaves() {
    let platform = platform();
    let alice = register(&platform, "alice").await;

    let room = platform
        .create_room(NewRoom {
            name: Some("popup".to_owned()),
            owner_id: Some(alice),
            room_type: Some(RoomType::Temporary),
            ..NewRoom::default()
        })
        .await
        .unwrap();

    platform.leave_room(room.room_id, alice).await.unwrap();
    let err = platform.get_room_info(room.room_id).await.unwrap_err();
    assert!(matches!(err, PlatformError::NotFound(_)));
}

#[tokio::test]
async fn suggestions_carry_mutual_counts_and_interests() {
    let platform = platform();
    let alice = platform
        .register_user(RegisterRequest {
            username: Some("alice".to_owned()),
            interests: Some(vec!["music".to_owned(), "art".to_owned()]),
            ..RegisterRequest::default()
        })
        .await
        .unwrap()
        .user
        .user_id;
    let bob = register(&platform, "bob").await;
    let carol = platform
        .register_user(RegisterRequest {
            username: Some("carol".to_owned()),
            interests: Some(vec!["music".to_owned(), "hiking".to_owned()]),
            ..RegisterRequest::default()
        })
        .await
        .unwrap()
        .user
        .user_id;

    platform.send_friend_request(alice, bob).await.unwrap();
    platform.send_friend_request(bob, carol).await.unwrap();
    platform.send_friend_request(carol, bob).await.unwrap();

    let suggestions = platform.get_suggestions(alice).await.unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].user.user_id, carol);
    assert_eq!(suggestions[0].mutual_friends_count, 1);
    assert_eq!(suggestions[0].common_interests, vec!["music".to_owned()]);
}

#[tokio::test]
async fn reactions_flow_through_the_facade() {
    let platform = platform();
    let alice = register(&platform, "alice").await;
    let bob = register(&platform, "bob").await;

    let room = platform
        .create_room(NewRoom {
            name: Some("lounge".to_owned()),
            owner_id: Some(alice),
            ..NewRoom::default()
        })
        .await
        .unwrap();
    let message = platform
        .send_message(NewMessage {
            sender_id: Some(alice),
            room_id: Some(room.room_id),
            content: Some("hello".to_owned()),
            ..NewMessage::default()
        })
        .await
        .unwrap();

    platform
        .add_reaction(message.message_id, bob, "🎉")
        .await
        .unwrap();
    platform
        .remove_reaction(message.message_id, bob, "🎉")
        .await
        .unwrap();

    // 回应已清空，再移除报未找到
    let err = platform
        .remove_reaction(message.message_id, bob, "🎉")
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::NotFound(_)));

    let history = platform.get_room_messages(room.room_id, None, None).await;
    assert!(history[0].reactions.is_empty());
}
