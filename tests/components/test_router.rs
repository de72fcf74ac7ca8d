//! Tests for components/router.rs

use chat_bg_delivery::components::{
    ActionId, ActionRouter, ActiveCall, CallContext, CallState, Command, ConversationId,
    MediaKind, NotificationEvent, NotificationId, RawEvent, RawEventKind, RichText, classify,
};

fn invitation(conversation: &str, media: MediaKind, key: &str) -> NotificationEvent {
    classify(&RawEvent::new(RawEventKind::CallInvitation {
        conversation_id: conversation.into(),
        display_name: conversation.trim_start_matches('@').to_string(),
        media,
        shared_key: Some(key.to_string()),
    }))
}

fn contact_request(conversation: &str, request_id: i64) -> NotificationEvent {
    classify(&RawEvent::new(RawEventKind::ContactRequest {
        conversation_id: conversation.into(),
        request_id,
        display_name: "dave".to_string(),
        full_name: None,
    }))
}

fn route(event: &NotificationEvent, action: ActionId, context: &mut CallContext) -> Command {
    ActionRouter::new().route(NotificationId::generate(), &action, event, context)
}

#[test]
fn test_accept_call_starts_call_and_removes_invitation() {
    let mut context = CallContext::new();
    let event = invitation("@bob", MediaKind::Video, "k1");
    context.record_event(&event);

    let command = route(&event, ActionId::accept_call(), &mut context);
    assert_eq!(
        command,
        Command::StartCall {
            conversation_id: "@bob".into(),
            media: MediaKind::Video,
            shared_key: Some("k1".to_string()),
            replaced_call: None,
        }
    );
    assert_eq!(context.pending_invitations(), 0);
    let active = context.active_call().unwrap();
    assert_eq!(active.conversation_id, ConversationId::from("@bob"));
    assert_eq!(active.state, CallState::InvitationAccepted);
}

#[test]
fn test_stale_reject_after_accept_leaves_active_call() {
    let mut context = CallContext::new();
    let event = invitation("@bob", MediaKind::Audio, "k1");
    context.record_event(&event);
    route(&event, ActionId::accept_call(), &mut context);

    let command = route(&event, ActionId::reject_call(), &mut context);
    assert_eq!(
        command,
        Command::FocusConversation {
            conversation_id: Some("@bob".into()),
        }
    );
    assert_eq!(
        context.active_call().map(|call| call.conversation_id.clone()),
        Some(ConversationId::from("@bob"))
    );
}

#[test]
fn test_accept_replaces_call_in_other_conversation() {
    let mut context = CallContext::new();
    context.set_active_call(Some(ActiveCall {
        conversation_id: "@carol".into(),
        state: CallState::InvitationAccepted,
        local_media: MediaKind::Audio,
    }));
    let event = invitation("@bob", MediaKind::Audio, "k1");
    context.record_event(&event);

    let Command::StartCall { replaced_call, .. } = route(&event, ActionId::accept_call(), &mut context)
    else {
        panic!("expected start call");
    };
    assert_eq!(replaced_call, Some(ConversationId::from("@carol")));
    assert_eq!(
        context.active_call().unwrap().conversation_id,
        ConversationId::from("@bob")
    );
}

#[test]
fn test_reject_clears_only_matching_active_call() {
    let mut context = CallContext::new();
    context.set_active_call(Some(ActiveCall {
        conversation_id: "@carol".into(),
        state: CallState::InvitationAccepted,
        local_media: MediaKind::Video,
    }));
    let event = invitation("@bob", MediaKind::Audio, "k1");
    context.record_event(&event);

    assert_eq!(
        route(&event, ActionId::reject_call(), &mut context),
        Command::RejectCall {
            conversation_id: "@bob".into(),
            end_active_call: false,
        }
    );
    assert_eq!(context.pending_invitations(), 0);
    assert!(context.active_call().is_some());

    let own = invitation("@carol", MediaKind::Video, "k2");
    context.record_event(&own);
    assert_eq!(
        route(&own, ActionId::reject_call(), &mut context),
        Command::RejectCall {
            conversation_id: "@carol".into(),
            end_active_call: true,
        }
    );
    assert!(context.active_call().is_none());
}

#[test]
fn test_newer_invitation_supersedes_older() {
    let mut context = CallContext::new();
    let first = invitation("@bob", MediaKind::Audio, "old");
    let second = invitation("@bob", MediaKind::Video, "new");
    context.record_event(&first);
    context.record_event(&second);
    assert_eq!(context.pending_invitations(), 1);

    // Answering the older notification uses the latest invitation
    let Command::StartCall { media, shared_key, .. } =
        route(&first, ActionId::accept_call(), &mut context)
    else {
        panic!("expected start call");
    };
    assert_eq!(media, MediaKind::Video);
    assert_eq!(shared_key.as_deref(), Some("new"));
}

#[test]
fn test_accept_contact_uses_stored_request() {
    let mut context = CallContext::new();
    let event = contact_request("<@dave", 99);
    context.record_event(&event);
    assert!(context.pending_contact_request(&"<@dave".into()).is_some());

    assert_eq!(
        route(&event, ActionId::accept_contact(), &mut context),
        Command::AcceptContact {
            conversation_id: "<@dave".into(),
            request_id: 99,
        }
    );
    assert!(context.pending_contact_request(&"<@dave".into()).is_none());

    // Already accepted: just open the conversation
    assert_eq!(
        route(&event, ActionId::accept_contact(), &mut context),
        Command::FocusConversation {
            conversation_id: Some("<@dave".into()),
        }
    );
}

#[test]
fn test_unrecognized_pairs_focus_conversation() {
    let mut context = CallContext::new();
    let message = classify(&RawEvent::new(RawEventKind::MessageReceived {
        conversation_id: "@bob".into(),
        sender_name: "bob".to_string(),
        text: RichText::plain("hi"),
    }));

    for action in [
        ActionId::default_action(),
        ActionId::accept_call(),
        ActionId::new("NTF_ACT_SOMETHING_ELSE"),
    ] {
        assert_eq!(
            route(&message, action, &mut context),
            Command::FocusConversation {
                conversation_id: Some("@bob".into()),
            }
        );
    }

    let check = classify(&RawEvent::new(RawEventKind::CheckMessages));
    assert_eq!(
        route(&check, ActionId::default_action(), &mut context),
        Command::FocusConversation {
            conversation_id: None
        }
    );
}

#[test]
fn test_default_action_on_invitation_keeps_it_pending() {
    let mut context = CallContext::new();
    let event = invitation("@bob", MediaKind::Audio, "k1");
    context.record_event(&event);

    route(&event, ActionId::default_action(), &mut context);
    assert!(context.pending_invitation(&"@bob".into()).is_some());
}
