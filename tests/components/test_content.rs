//! Tests for components/content.rs and components/classifier.rs

use chat_bg_delivery::components::content::MAX_PREVIEW_CHARS;
use chat_bg_delivery::components::{
    ActionId, ConversationId, EventPayload, MediaKind, NotificationCategory, NotificationContent,
    RawEvent, RawEventKind, RichText, classify, default_categories,
};

#[test]
fn test_classify_preserves_conversation() {
    let cases = vec![
        (
            RawEventKind::ContactRequest {
                conversation_id: "<@bob".into(),
                request_id: 3,
                display_name: "bob".to_string(),
                full_name: Some("Bob Smith".to_string()),
            },
            NotificationCategory::ContactRequest,
        ),
        (
            RawEventKind::ContactConnected {
                conversation_id: "@bob".into(),
                display_name: "bob".to_string(),
            },
            NotificationCategory::ContactConnected,
        ),
        (
            RawEventKind::MessageReceived {
                conversation_id: "@bob".into(),
                sender_name: "bob".to_string(),
                text: RichText::plain("hi"),
            },
            NotificationCategory::MessageReceived,
        ),
        (
            RawEventKind::CallInvitation {
                conversation_id: "@bob".into(),
                display_name: "bob".to_string(),
                media: MediaKind::Video,
                shared_key: Some("key".to_string()),
            },
            NotificationCategory::CallInvitation,
        ),
    ];

    for (kind, category) in cases {
        let event = classify(&RawEvent::new(kind));
        assert_eq!(event.category, category);
        assert!(event.conversation_id.is_some(), "{category} lost its conversation");
    }

    let check = classify(&RawEvent::new(RawEventKind::CheckMessages));
    assert_eq!(check.category, NotificationCategory::CheckMessage);
    assert_eq!(check.conversation_id, None);
}

#[test]
fn test_classify_is_deterministic() {
    let raw = RawEvent::new(RawEventKind::MessageReceived {
        conversation_id: "#team".into(),
        sender_name: "carol".to_string(),
        text: RichText::markdown("**ship** it"),
    });
    assert_eq!(classify(&raw), classify(&raw));
    assert_eq!(classify(&raw).occurred_at, raw.occurred_at);
}

#[test]
fn test_message_preview_is_flattened_and_truncated() {
    let long = "word ".repeat(100);
    let event = classify(&RawEvent::new(RawEventKind::MessageReceived {
        conversation_id: "@bob".into(),
        sender_name: "bob".to_string(),
        text: RichText::plain(long),
    }));
    let EventPayload::Message { preview, .. } = event.payload else {
        panic!("expected message payload");
    };
    assert_eq!(preview.chars().count(), MAX_PREVIEW_CHARS);
    assert!(preview.ends_with("..."));

    let markdown = RichText::markdown("# Title\n\nSome *emphasis* and [a link](https://example.com)");
    assert_eq!(markdown.to_plain_text(), "Title Some emphasis and a link");
}

#[test]
fn test_content_for_contact_request() {
    let event = classify(&RawEvent::new(RawEventKind::ContactRequest {
        conversation_id: "<@bob".into(),
        request_id: 42,
        display_name: "bob".to_string(),
        full_name: Some("Bob Smith".to_string()),
    }));
    let content = NotificationContent::from_event(&event);

    assert_eq!(content.title, "bob (Bob Smith)");
    assert_eq!(content.body, "wants to connect to you!");
    assert_eq!(content.target_conversation, Some(ConversationId::from("<@bob")));
    assert_eq!(content.user_info.get("chatId").map(String::as_str), Some("<@bob"));
    assert_eq!(
        content.user_info.get("contactRequestId").map(String::as_str),
        Some("42")
    );
    content.validate().unwrap();
}

#[test]
fn test_content_for_call_and_check() {
    let call = classify(&RawEvent::new(RawEventKind::CallInvitation {
        conversation_id: "@bob".into(),
        display_name: "bob".to_string(),
        media: MediaKind::Audio,
        shared_key: None,
    }));
    assert_eq!(NotificationContent::from_event(&call).body, "Incoming audio call");

    let check = classify(&RawEvent::new(RawEventKind::CheckMessages));
    let content = NotificationContent::from_event(&check);
    assert_eq!(content.title, "Checking new messages...");
    assert_eq!(content.target_conversation, None);
}

#[test]
fn test_empty_title_fails_validation() {
    let content = NotificationContent::new(NotificationCategory::MessageReceived, "  ");
    assert!(content.validate().is_err());
}

#[test]
fn test_default_categories() {
    let categories = default_categories();
    assert_eq!(categories.len(), NotificationCategory::ALL.len());

    let call = categories
        .iter()
        .find(|registration| registration.category == NotificationCategory::CallInvitation)
        .unwrap();
    assert_eq!(call.find_action(&ActionId::accept_call()).unwrap().title, "Answer");
    assert_eq!(call.find_action(&ActionId::reject_call()).unwrap().title, "Ignore");
    assert_eq!(call.hidden_preview_placeholder, "Incoming call");

    let contact = categories
        .iter()
        .find(|registration| registration.category == NotificationCategory::ContactRequest)
        .unwrap();
    assert_eq!(contact.find_action(&ActionId::accept_contact()).unwrap().title, "Accept");
}
