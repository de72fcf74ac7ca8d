// Contracts of the external collaborators: the OS notification surface, the
// push backend, the message receiver, the scheduling host, the session
// provider and the command consumer. Async calls use boxed futures so the
// traits stay object safe.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{CategoryRegistration, NotificationContent};
use super::lifecycle::TokenStatus;
use super::policy::PresentationSet;
use super::router::Command;
use super::time_wrapper::Timestamp;
use super::{DeliveryResult, NotificationId, SessionId};

/// Boxed future returned by collaborator traits
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Notification permission as reported by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthorizationState {
    /// The user has not been asked yet
    #[default]
    NotDetermined,
    /// The user declined; delivery is skipped
    Denied,
    Authorized,
}

impl AuthorizationState {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationState::Authorized)
    }

    /// Whether asking the user again can change the outcome
    pub fn can_request(&self) -> bool {
        matches!(self, AuthorizationState::NotDetermined)
    }
}

/// A notification accepted by the policy and handed to the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub notification_id: NotificationId,
    pub content: NotificationContent,
    pub presentation: PresentationSet,
}

/// Receipt returned by the surface after presenting a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub notification_id: NotificationId,
    /// Surface specific identifier (D-Bus id, request identifier, ...)
    pub native_id: String,
    pub surface: String,
    pub delivered_at: DateTime<Utc>,
}

impl DeliveryReceipt {
    pub fn new(
        notification_id: NotificationId,
        surface: impl Into<String>,
        native_id: impl Into<String>,
    ) -> Self {
        Self {
            notification_id,
            native_id: native_id.into(),
            surface: surface.into(),
            delivered_at: Utc::now(),
        }
    }
}

/// OS-level notification surface
pub trait NotificationSurface: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    fn register_categories<'a>(
        &'a self,
        categories: &'a [CategoryRegistration],
    ) -> BoxFuture<'a, DeliveryResult<()>>;

    fn authorization_state(&self) -> BoxFuture<'_, DeliveryResult<AuthorizationState>>;

    fn request_authorization(&self) -> BoxFuture<'_, DeliveryResult<AuthorizationState>>;

    fn deliver<'a>(&'a self, request: &'a DeliveryRequest)
    -> BoxFuture<'a, DeliveryResult<DeliveryReceipt>>;

    /// Remove delivered and pending notifications
    fn remove<'a>(&'a self, ids: &'a [NotificationId]) -> BoxFuture<'a, DeliveryResult<()>>;

    /// The user responded and the OS already dismissed the notification;
    /// drop any bookkeeping kept for it.
    fn dismissed(&self, _id: NotificationId) {}
}

/// Push notifications backend holding the device token registration
pub trait PushBackend: Send + Sync {
    /// Register the token; the backend answers with the token status it assigned
    fn register_token<'a>(&'a self, token: &'a str) -> BoxFuture<'a, DeliveryResult<TokenStatus>>;

    fn delete_token<'a>(&'a self, token: &'a str) -> BoxFuture<'a, DeliveryResult<()>>;
}

/// Message receiver started for the duration of a refresh session.
///
/// `start` and `stop` are not assumed idempotent; the scheduler calls each
/// at most once per receiver.
pub trait MessageReceiver: Send {
    fn start(&mut self);

    fn stop(&mut self);

    /// Time of the last received message (or of `start` if none arrived)
    fn last_activity(&self) -> Timestamp;
}

/// Creates a fresh receiver for each refresh session
pub trait ReceiverFactory: Send + Sync {
    fn create_receiver(&self) -> Box<dyn MessageReceiver>;
}

impl<F> ReceiverFactory for F
where
    F: Fn() -> Box<dyn MessageReceiver> + Send + Sync,
{
    fn create_receiver(&self) -> Box<dyn MessageReceiver> {
        self()
    }
}

/// Authentication state of the chat client
pub trait SessionProvider: Send + Sync {
    fn has_current_user(&self) -> bool;
}

impl<F> SessionProvider for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn has_current_user(&self) -> bool {
        self()
    }
}

/// Host that runs background sessions (OS task scheduler or an app timer)
pub trait SchedulingHost: Send + Sync {
    /// Request the next session no earlier than `earliest_begin`
    fn submit_refresh(&self, earliest_begin: Timestamp) -> DeliveryResult<()>;

    /// Report that the session has finished
    fn complete_session(&self, session_id: SessionId, success: bool);
}

/// Consumer of routed commands (domain/session layer)
pub trait CommandSink: Send + Sync {
    fn dispatch(&self, command: Command);
}

impl<F> CommandSink for F
where
    F: Fn(Command) + Send + Sync,
{
    fn dispatch(&self, command: Command) {
        self(command)
    }
}
