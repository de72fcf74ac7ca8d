// Domain components for background delivery: identities, categories, errors
// and the pure state machines that the engine and scheduler drive.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod analytics;
pub mod classifier;
pub mod config;
pub mod content;
pub mod lifecycle;
pub mod platform;
pub mod policy;
pub mod router;
pub mod time_wrapper;

pub use analytics::{AnalyticsSummary, DeliveryAnalytics};
pub use classifier::classify;
pub use config::{DeliveryConfig, PolicyConfig, RefreshConfig};
pub use content::{
    CallInvitationPayload, CategoryAction, CategoryRegistration, ContactRequestPayload,
    EventPayload, MediaKind, NotificationContent, NotificationEvent, RawEvent, RawEventKind,
    RichText, default_categories,
};
pub use lifecycle::{PushToken, TokenLifecycle, TokenStatus, TokenTransition, TransitionReason};
pub use platform::{
    AuthorizationState, BoxFuture, CommandSink, DeliveryReceipt, DeliveryRequest,
    MessageReceiver, NotificationSurface, PushBackend, ReceiverFactory, SchedulingHost,
    SessionProvider,
};
pub use policy::{AppState, ConversationRecency, Presentation, PresentationPolicy, PresentationSet};
pub use router::{ActionRouter, ActiveCall, CallContext, CallState, Command, PendingCallInvitation};
pub use time_wrapper::Timestamp;

/// Identifier of a conversation (direct chat, group or contact request).
///
/// Keys deduplication, call bookkeeping and "focus conversation" routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Globally unique identifier of a delivered notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of a single background refresh session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification categories. Drive both presentation policy and action routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationCategory {
    /// Someone asked to connect via an address or invitation link
    ContactRequest,
    /// A pending connection was established
    ContactConnected,
    /// A new chat item arrived
    MessageReceived,
    /// An incoming audio or video call
    CallInvitation,
    /// Wake-up delivered by the notifications server; only tells the app to poll
    CheckMessage,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 5] = [
        NotificationCategory::ContactRequest,
        NotificationCategory::ContactConnected,
        NotificationCategory::MessageReceived,
        NotificationCategory::CallInvitation,
        NotificationCategory::CheckMessage,
    ];

    /// Stable identifier registered with the notification surface
    pub fn identifier(&self) -> &'static str {
        match self {
            NotificationCategory::ContactRequest => "NTF_CAT_CONTACT_REQUEST",
            NotificationCategory::ContactConnected => "NTF_CAT_CONTACT_CONNECTED",
            NotificationCategory::MessageReceived => "NTF_CAT_MESSAGE_RECEIVED",
            NotificationCategory::CallInvitation => "NTF_CAT_CALL_INVITATION",
            NotificationCategory::CheckMessage => "NTF_CAT_CHECK_MESSAGE",
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.identifier() == identifier)
    }

    /// Whether events of this category are keyed to a conversation
    pub fn carries_conversation(&self) -> bool {
        !matches!(self, NotificationCategory::CheckMessage)
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Identifier of a user action on a delivered notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(String);

impl ActionId {
    pub const ACCEPT_CONTACT: &'static str = "NTF_ACT_ACCEPT_CONTACT";
    pub const ACCEPT_CALL: &'static str = "NTF_ACT_ACCEPT_CALL";
    pub const REJECT_CALL: &'static str = "NTF_ACT_REJECT_CALL";
    /// The user tapped the notification body
    pub const DEFAULT: &'static str = "NTF_ACT_DEFAULT";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn accept_contact() -> Self {
        Self::new(Self::ACCEPT_CONTACT)
    }

    pub fn accept_call() -> Self {
        Self::new(Self::ACCEPT_CALL)
    }

    pub fn reject_call() -> Self {
        Self::new(Self::REJECT_CALL)
    }

    pub fn default_action() -> Self {
        Self::new(Self::DEFAULT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error types for delivery, token and scheduling operations.
///
/// None of these are fatal: the caller reports them and the system keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum DeliveryError {
    /// Push backend rejected or failed a token request
    #[error("push backend error during {operation}: {message} (code: {status_code:?})")]
    PushBackend {
        operation: String,
        status_code: Option<u16>,
        message: String,
    },
    /// Token state machine refused a transition
    #[error("invalid token transition from {from:?} to {to:?}")]
    InvalidTransition { from: TokenStatus, to: TokenStatus },
    /// No device token has been received from the OS yet
    #[error("no push token available")]
    MissingToken,
    /// Notification surface failed to present or remove a notification
    #[error("surface error on {surface}: {message}")]
    Surface { surface: String, message: String },
    /// User has not granted notification permission
    #[error("notifications are not authorized")]
    NotAuthorized,
    /// A response arrived for a notification this process did not deliver
    #[error("unknown notification {0}")]
    UnknownNotification(NotificationId),
    /// Scheduling host refused the next refresh request
    #[error("scheduling error: {message}")]
    Scheduling { message: String },
    /// Content or configuration validation error
    #[error("validation error in {field}: {message}")]
    Validation { field: String, message: String },
}

/// Type alias for delivery results
pub type DeliveryResult<T> = Result<T, DeliveryError>;
