//! Tests for components/mod.rs

use chat_bg_delivery::components::{
    ActionId, ConversationId, DeliveryError, NotificationCategory, NotificationId, SessionId,
    TokenStatus,
};

#[test]
fn test_notification_id_generation() {
    let id1 = NotificationId::generate();
    let id2 = NotificationId::generate();
    assert_ne!(id1, id2);

    let parsed: NotificationId = id1.to_string().parse().unwrap();
    assert_eq!(id1, parsed);
    assert!("not-a-uuid".parse::<NotificationId>().is_err());
}

#[test]
fn test_session_id_generation() {
    assert_ne!(SessionId::generate(), SessionId::generate());
}

#[test]
fn test_conversation_id_conversions() {
    let from_str = ConversationId::from("@alice");
    let from_string = ConversationId::from("@alice".to_string());
    assert_eq!(from_str, from_string);
    assert_eq!(from_str.as_str(), "@alice");
    assert_eq!(from_str.to_string(), "@alice");
}

#[test]
fn test_category_identifiers() {
    for category in NotificationCategory::ALL {
        assert_eq!(
            NotificationCategory::from_identifier(category.identifier()),
            Some(category)
        );
    }
    assert_eq!(
        NotificationCategory::CallInvitation.identifier(),
        "NTF_CAT_CALL_INVITATION"
    );
    assert_eq!(NotificationCategory::from_identifier("NTF_CAT_UNKNOWN"), None);
}

#[test]
fn test_only_check_message_has_no_conversation() {
    let without: Vec<_> = NotificationCategory::ALL
        .into_iter()
        .filter(|category| !category.carries_conversation())
        .collect();
    assert_eq!(without, vec![NotificationCategory::CheckMessage]);
}

#[test]
fn test_action_ids() {
    assert_eq!(ActionId::accept_contact().as_str(), "NTF_ACT_ACCEPT_CONTACT");
    assert_eq!(ActionId::accept_call().as_str(), "NTF_ACT_ACCEPT_CALL");
    assert_eq!(ActionId::reject_call().as_str(), "NTF_ACT_REJECT_CALL");
    assert_ne!(ActionId::default_action(), ActionId::accept_call());
}

#[test]
fn test_error_display() {
    let error = DeliveryError::InvalidTransition {
        from: TokenStatus::Active,
        to: TokenStatus::Registered,
    };
    assert_eq!(
        error.to_string(),
        "invalid token transition from Active to Registered"
    );

    let error = DeliveryError::PushBackend {
        operation: "register".to_string(),
        status_code: Some(503),
        message: "unavailable".to_string(),
    };
    assert!(error.to_string().contains("register"));
    assert!(error.to_string().contains("503"));
}
