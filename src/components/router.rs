// Action router: turns a user response to a delivered notification into a
// domain command. Call and contact bookkeeping lives in an explicit
// `CallContext` owned by the caller instead of process-wide state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{ContactRequestPayload, EventPayload, MediaKind, NotificationEvent};
use super::{ActionId, ConversationId, NotificationCategory, NotificationId};

/// Command for the domain/session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    AcceptContact {
        conversation_id: ConversationId,
        request_id: i64,
    },
    StartCall {
        conversation_id: ConversationId,
        media: MediaKind,
        shared_key: Option<String>,
        /// Call in another conversation that was dropped to make room
        replaced_call: Option<ConversationId>,
    },
    RejectCall {
        conversation_id: ConversationId,
        /// The active call belonged to this conversation and must be ended
        end_active_call: bool,
    },
    FocusConversation {
        conversation_id: Option<ConversationId>,
    },
}

/// Call invitation waiting for the user to answer or ignore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCallInvitation {
    pub conversation_id: ConversationId,
    pub peer_media: MediaKind,
    pub shared_key: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    InvitationAccepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCall {
    pub conversation_id: ConversationId,
    pub state: CallState,
    pub local_media: MediaKind,
}

/// Pending invitations, pending contact requests and the active call
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    invitations: HashMap<ConversationId, PendingCallInvitation>,
    contact_requests: HashMap<ConversationId, ContactRequestPayload>,
    active_call: Option<ActiveCall>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store what a classified event makes actionable. A newer invitation
    /// for the same conversation supersedes the older one.
    pub fn record_event(&mut self, event: &NotificationEvent) {
        let Some(conversation_id) = event.conversation_id.clone() else {
            return;
        };

        match &event.payload {
            EventPayload::CallInvitation(invitation) => {
                let superseded = self.invitations.insert(
                    conversation_id.clone(),
                    PendingCallInvitation {
                        conversation_id,
                        peer_media: invitation.peer_media,
                        shared_key: invitation.shared_key.clone(),
                        received_at: event.occurred_at,
                    },
                );
                if superseded.is_some() {
                    tracing::debug!("call invitation superseded");
                }
            },
            EventPayload::ContactRequest(request) => {
                self.contact_requests.insert(conversation_id, request.clone());
            },
            _ => {},
        }
    }

    pub fn pending_invitation(&self, conversation_id: &ConversationId) -> Option<&PendingCallInvitation> {
        self.invitations.get(conversation_id)
    }

    pub fn pending_invitations(&self) -> usize {
        self.invitations.len()
    }

    pub fn pending_contact_request(
        &self,
        conversation_id: &ConversationId,
    ) -> Option<&ContactRequestPayload> {
        self.contact_requests.get(conversation_id)
    }

    pub fn active_call(&self) -> Option<&ActiveCall> {
        self.active_call.as_ref()
    }

    /// Set by the call layer when a call starts outside of notifications
    pub fn set_active_call(&mut self, call: Option<ActiveCall>) {
        self.active_call = call;
    }
}

/// Stateless router over a caller supplied `CallContext`
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionRouter;

impl ActionRouter {
    pub fn new() -> Self {
        Self
    }

    pub fn route(
        &self,
        notification_id: NotificationId,
        action_id: &ActionId,
        event: &NotificationEvent,
        context: &mut CallContext,
    ) -> Command {
        let command = match (event.category, action_id.as_str(), &event.conversation_id) {
            (NotificationCategory::ContactRequest, ActionId::ACCEPT_CONTACT, Some(conversation_id)) => {
                Self::accept_contact(conversation_id, context)
            },
            (NotificationCategory::CallInvitation, ActionId::ACCEPT_CALL, Some(conversation_id)) => {
                Self::accept_call(conversation_id, context)
            },
            (NotificationCategory::CallInvitation, ActionId::REJECT_CALL, Some(conversation_id)) => {
                Self::reject_call(conversation_id, context)
            },
            _ => None,
        };

        let command = command.unwrap_or_else(|| Command::FocusConversation {
            conversation_id: event.conversation_id.clone(),
        });

        tracing::debug!(
            notification = %notification_id,
            action = %action_id,
            category = %event.category,
            command = ?command,
            "notification action routed"
        );
        command
    }

    fn accept_contact(conversation_id: &ConversationId, context: &mut CallContext) -> Option<Command> {
        let request = context.contact_requests.remove(conversation_id)?;
        Some(Command::AcceptContact {
            conversation_id: conversation_id.clone(),
            request_id: request.request_id,
        })
    }

    fn accept_call(conversation_id: &ConversationId, context: &mut CallContext) -> Option<Command> {
        let Some(invitation) = context.invitations.remove(conversation_id) else {
            tracing::debug!(conversation = %conversation_id, "accept for stale call invitation");
            return None;
        };

        let replaced_call = match context.active_call.take() {
            Some(call) if &call.conversation_id != conversation_id => Some(call.conversation_id),
            _ => None,
        };

        context.active_call = Some(ActiveCall {
            conversation_id: conversation_id.clone(),
            state: CallState::InvitationAccepted,
            local_media: invitation.peer_media,
        });

        Some(Command::StartCall {
            conversation_id: conversation_id.clone(),
            media: invitation.peer_media,
            shared_key: invitation.shared_key,
            replaced_call,
        })
    }

    fn reject_call(conversation_id: &ConversationId, context: &mut CallContext) -> Option<Command> {
        if context.invitations.remove(conversation_id).is_none() {
            tracing::debug!(conversation = %conversation_id, "reject for stale call invitation");
            return None;
        }

        // Only end the active call if it belongs to the rejected conversation
        let end_active_call = context
            .active_call
            .as_ref()
            .is_some_and(|call| &call.conversation_id == conversation_id);
        if end_active_call {
            context.active_call = None;
        }

        Some(Command::RejectCall {
            conversation_id: conversation_id.clone(),
            end_active_call,
        })
    }
}
