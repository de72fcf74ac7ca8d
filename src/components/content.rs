// Incoming chat events and the notification content built from them.
// Category registrations mirror what the surface shows for each category,
// including action buttons and the placeholder used when previews are hidden.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActionId, ConversationId, DeliveryError, DeliveryResult, NotificationCategory};

/// Maximum number of characters kept in a message preview
pub const MAX_PREVIEW_CHARS: usize = 120;

/// Raw event surfaced by the chat protocol client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl RawEvent {
    pub fn new(kind: RawEventKind) -> Self {
        Self {
            kind,
            occurred_at: Utc::now(),
        }
    }

    pub fn at(kind: RawEventKind, occurred_at: DateTime<Utc>) -> Self {
        Self { kind, occurred_at }
    }
}

/// The event shapes the chat client reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawEventKind {
    ContactRequest {
        conversation_id: ConversationId,
        request_id: i64,
        display_name: String,
        full_name: Option<String>,
    },
    ContactConnected {
        conversation_id: ConversationId,
        display_name: String,
    },
    MessageReceived {
        conversation_id: ConversationId,
        sender_name: String,
        text: RichText,
    },
    CallInvitation {
        conversation_id: ConversationId,
        display_name: String,
        media: MediaKind,
        shared_key: Option<String>,
    },
    /// Wake-up from the notifications server
    CheckMessages,
}

/// Classified, immutable notification event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub category: NotificationCategory,
    pub conversation_id: Option<ConversationId>,
    pub payload: EventPayload,
    pub occurred_at: DateTime<Utc>,
}

/// Category specific data carried by a notification event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    ContactRequest(ContactRequestPayload),
    ContactConnected { display_name: String },
    Message { sender_name: String, preview: String },
    CallInvitation(CallInvitationPayload),
    CheckMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRequestPayload {
    pub request_id: i64,
    pub display_name: String,
    pub full_name: Option<String>,
}

impl ContactRequestPayload {
    /// Name shown in titles: "display (full)" when a distinct full name exists
    pub fn chat_view_name(&self) -> String {
        match &self.full_name {
            Some(full) if !full.is_empty() && full != &self.display_name => {
                format!("{} ({})", self.display_name, full)
            },
            _ => self.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInvitationPayload {
    pub display_name: String,
    pub peer_media: MediaKind,
    pub shared_key: Option<String>,
}

/// Media offered by the calling peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn name(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Message text as sent by the peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RichText {
    Plain(String),
    /// Markdown formatted text, flattened for previews
    Markdown(String),
}

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::Markdown(text.into())
    }

    pub fn to_plain_text(&self) -> String {
        match self {
            RichText::Plain(text) => text.clone(),
            RichText::Markdown(md) => convert_markdown_to_plain(md),
        }
    }

    /// Plain text cut to `max_chars` characters, with an ellipsis when cut
    pub fn preview(&self, max_chars: usize) -> String {
        let plain = self.to_plain_text();
        let trimmed = plain.trim();
        if trimmed.chars().count() <= max_chars {
            return trimmed.to_string();
        }
        let mut cut: String = trimmed.chars().take(max_chars.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

impl From<&str> for RichText {
    fn from(text: &str) -> Self {
        RichText::Plain(text.to_string())
    }
}

impl From<String> for RichText {
    fn from(text: String) -> Self {
        RichText::Plain(text)
    }
}

/// Content handed to the notification surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    /// Conversation to open when the notification is tapped
    pub target_conversation: Option<ConversationId>,
    /// Extra data returned with user responses
    pub user_info: HashMap<String, String>,
}

impl NotificationContent {
    pub fn new(category: NotificationCategory, title: impl Into<String>) -> Self {
        Self {
            category,
            title: title.into(),
            body: String::new(),
            target_conversation: None,
            user_info: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_target(mut self, conversation_id: ConversationId) -> Self {
        self.user_info
            .insert("chatId".to_string(), conversation_id.to_string());
        self.target_conversation = Some(conversation_id);
        self
    }

    pub fn with_user_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_info.insert(key.into(), value.into());
        self
    }

    /// Build the user-visible content for a classified event
    pub fn from_event(event: &NotificationEvent) -> Self {
        let content = match &event.payload {
            EventPayload::ContactRequest(request) => {
                NotificationContent::new(event.category, request.chat_view_name())
                    .with_body("wants to connect to you!")
                    .with_user_info("contactRequestId", request.request_id.to_string())
            },
            EventPayload::ContactConnected { display_name } => {
                NotificationContent::new(event.category, display_name.clone())
                    .with_body("is connected!")
            },
            EventPayload::Message {
                sender_name,
                preview,
            } => NotificationContent::new(event.category, sender_name.clone())
                .with_body(preview.clone()),
            EventPayload::CallInvitation(invitation) => NotificationContent::new(
                event.category,
                invitation.display_name.clone(),
            )
            .with_body(format!("Incoming {} call", invitation.peer_media.name())),
            EventPayload::CheckMessage => {
                NotificationContent::new(event.category, "Checking new messages...")
            },
        };

        match &event.conversation_id {
            Some(conversation_id) => content.with_target(conversation_id.clone()),
            None => content,
        }
    }

    pub fn validate(&self) -> DeliveryResult<()> {
        if self.title.trim().is_empty() {
            return Err(DeliveryError::Validation {
                field: "title".to_string(),
                message: "Title cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Action button registered for a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAction {
    pub id: ActionId,
    pub title: String,
}

impl CategoryAction {
    pub fn new(id: ActionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// Category registration: actions and the body shown when previews are hidden
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRegistration {
    pub category: NotificationCategory,
    pub actions: Vec<CategoryAction>,
    pub hidden_preview_placeholder: String,
}

impl CategoryRegistration {
    pub fn new(category: NotificationCategory, placeholder: impl Into<String>) -> Self {
        Self {
            category,
            actions: Vec::new(),
            hidden_preview_placeholder: placeholder.into(),
        }
    }

    pub fn with_action(mut self, action: CategoryAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn find_action(&self, action_id: &ActionId) -> Option<&CategoryAction> {
        self.actions.iter().find(|action| &action.id == action_id)
    }
}

/// The categories registered with the surface at start-up
pub fn default_categories() -> Vec<CategoryRegistration> {
    vec![
        CategoryRegistration::new(NotificationCategory::ContactRequest, "New contact request")
            .with_action(CategoryAction::new(ActionId::accept_contact(), "Accept")),
        CategoryRegistration::new(NotificationCategory::ContactConnected, "Contact is connected"),
        CategoryRegistration::new(NotificationCategory::MessageReceived, "New message"),
        CategoryRegistration::new(NotificationCategory::CallInvitation, "Incoming call")
            .with_action(CategoryAction::new(ActionId::accept_call(), "Answer"))
            .with_action(CategoryAction::new(ActionId::reject_call(), "Ignore")),
        CategoryRegistration::new(NotificationCategory::CheckMessage, "Checking new messages..."),
    ]
}

fn convert_markdown_to_plain(markdown: &str) -> String {
    use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut plain_text = String::new();

    // Keep text only; links keep their label, paragraphs become single spaces
    for event in parser {
        match event {
            Event::Text(text) | Event::Code(text) => {
                plain_text.push_str(&text);
            },
            Event::SoftBreak | Event::HardBreak => {
                plain_text.push(' ');
            },
            Event::Start(Tag::Paragraph) if !plain_text.is_empty() => {
                plain_text.push(' ');
            },
            Event::End(TagEnd::Item) => {
                plain_text.push(' ');
            },
            _ => {},
        }
    }

    plain_text.split_whitespace().collect::<Vec<_>>().join(" ")
}
