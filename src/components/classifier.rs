//! Maps raw chat client events to notification events.
//!
//! Pure and deterministic: the same raw event always yields the same
//! notification event. The conversation id is carried over for every
//! category that has one, since it keys deduplication and routing.

use super::NotificationCategory;
use super::content::{
    CallInvitationPayload, ContactRequestPayload, EventPayload, MAX_PREVIEW_CHARS,
    NotificationEvent, RawEvent, RawEventKind,
};

pub fn classify(raw: &RawEvent) -> NotificationEvent {
    let (category, conversation_id, payload) = match &raw.kind {
        RawEventKind::ContactRequest {
            conversation_id,
            request_id,
            display_name,
            full_name,
        } => (
            NotificationCategory::ContactRequest,
            Some(conversation_id.clone()),
            EventPayload::ContactRequest(ContactRequestPayload {
                request_id: *request_id,
                display_name: display_name.clone(),
                full_name: full_name.clone(),
            }),
        ),
        RawEventKind::ContactConnected {
            conversation_id,
            display_name,
        } => (
            NotificationCategory::ContactConnected,
            Some(conversation_id.clone()),
            EventPayload::ContactConnected {
                display_name: display_name.clone(),
            },
        ),
        RawEventKind::MessageReceived {
            conversation_id,
            sender_name,
            text,
        } => (
            NotificationCategory::MessageReceived,
            Some(conversation_id.clone()),
            EventPayload::Message {
                sender_name: sender_name.clone(),
                preview: text.preview(MAX_PREVIEW_CHARS),
            },
        ),
        RawEventKind::CallInvitation {
            conversation_id,
            display_name,
            media,
            shared_key,
        } => (
            NotificationCategory::CallInvitation,
            Some(conversation_id.clone()),
            EventPayload::CallInvitation(CallInvitationPayload {
                display_name: display_name.clone(),
                peer_media: *media,
                shared_key: shared_key.clone(),
            }),
        ),
        RawEventKind::CheckMessages => {
            (NotificationCategory::CheckMessage, None, EventPayload::CheckMessage)
        },
    };

    NotificationEvent {
        category,
        conversation_id,
        payload,
        occurred_at: raw.occurred_at,
    }
}
