//! Background delivery for a peer-to-peer chat client.
//!
//! Two loosely coupled halves:
//!
//! - [`refresh`]: bounded background sessions that start a message receiver,
//!   wait for activity and finalize exactly once through a completion latch.
//! - [`DeliveryEngine`]: turns incoming chat events into notifications. Events
//!   are classified, filtered by the presentation policy (foreground state and
//!   per-conversation repeat suppression), handed to a [`NotificationSurface`]
//!   and, when the user responds, routed to a domain [`Command`].
//!
//! The push token registration state machine lives in
//! [`components::lifecycle`].

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

pub mod backends;
pub mod components;
pub mod refresh;

// Re-export all components for convenience
pub use backends::*;
pub use components::*;
pub use refresh::*;

/// What happened to an incoming event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(DeliveryReceipt),
    /// The presentation policy chose no channel
    Suppressed,
    /// The user has not granted notification permission
    NotAuthorized,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered(_))
    }
}

/// Notification pipeline: classify, decide, deliver, route responses.
pub struct DeliveryEngine {
    config: DeliveryConfig,
    surface: Arc<dyn NotificationSurface>,
    policy: PresentationPolicy,
    router: ActionRouter,
    calls: Mutex<CallContext>,
    delivered: DashMap<NotificationId, NotificationEvent>,
    app_state: RwLock<AppState>,
    authorization: RwLock<AuthorizationState>,
    analytics: Arc<DeliveryAnalytics>,
    commands: Option<Arc<dyn CommandSink>>,
}

impl DeliveryEngine {
    pub fn builder(surface: Arc<dyn NotificationSurface>) -> DeliveryEngineBuilder {
        DeliveryEngineBuilder::new(surface)
    }

    /// Register the notification categories and settle authorization,
    /// asking the user if they have not been asked yet.
    pub async fn initialize(&self) -> DeliveryResult<AuthorizationState> {
        self.surface.register_categories(&default_categories()).await?;

        let mut state = self.surface.authorization_state().await?;
        if state.can_request() {
            state = self.surface.request_authorization().await?;
        }
        *self.authorization.write() = state;

        if state.is_authorized() {
            tracing::info!(surface = self.surface.name(), "notifications authorized");
        } else {
            tracing::warn!(
                surface = self.surface.name(),
                state = ?state,
                "notifications not authorized"
            );
        }
        Ok(state)
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub fn authorization(&self) -> AuthorizationState {
        *self.authorization.read()
    }

    pub fn set_app_state(&self, state: AppState) {
        tracing::debug!(state = ?state, "app state changed");
        *self.app_state.write() = state;
    }

    pub fn app_state(&self) -> AppState {
        self.app_state.read().clone()
    }

    pub fn policy(&self) -> &PresentationPolicy {
        &self.policy
    }

    pub fn analytics(&self) -> &Arc<DeliveryAnalytics> {
        &self.analytics
    }

    /// Snapshot of pending invitations, contact requests and the active call
    pub fn call_context(&self) -> CallContext {
        self.calls.lock().clone()
    }

    /// Report a call started or ended outside of notification actions
    pub fn set_active_call(&self, call: Option<ActiveCall>) {
        self.calls.lock().set_active_call(call);
    }

    pub async fn notify(&self, raw: &RawEvent) -> DeliveryResult<DeliveryOutcome> {
        self.notify_at(raw, Timestamp::now()).await
    }

    /// Process an incoming event as of `now`
    pub async fn notify_at(&self, raw: &RawEvent, now: Timestamp) -> DeliveryResult<DeliveryOutcome> {
        let event = classify(raw);
        self.calls.lock().record_event(&event);

        let app_state = self.app_state();
        let presentation = self.policy.decide(&event, &app_state, now);
        if presentation.is_empty() {
            self.analytics.record_suppressed();
            tracing::debug!(category = %event.category, "notification suppressed");
            return Ok(DeliveryOutcome::Suppressed);
        }

        if !self.authorization().is_authorized() {
            self.analytics.record_unauthorized();
            tracing::debug!(category = %event.category, "notification skipped, not authorized");
            return Ok(DeliveryOutcome::NotAuthorized);
        }

        let content = NotificationContent::from_event(&event);
        content.validate()?;

        let request = DeliveryRequest {
            notification_id: NotificationId::generate(),
            content,
            presentation,
        };

        match self.surface.deliver(&request).await {
            Ok(receipt) => {
                self.analytics.record_delivered(presentation);
                tracing::info!(
                    notification = %request.notification_id,
                    category = %event.category,
                    presentation = ?presentation,
                    "notification delivered"
                );
                self.delivered.insert(request.notification_id, event);
                Ok(DeliveryOutcome::Delivered(receipt))
            },
            Err(error) => {
                self.analytics.record_delivery_failure();
                tracing::error!(
                    error = %error,
                    category = %event.category,
                    "notification delivery failed"
                );
                Err(error)
            },
        }
    }

    /// Route the user's response to a delivered notification and hand the
    /// resulting command to the command sink.
    pub fn handle_action(
        &self,
        notification_id: NotificationId,
        action_id: &ActionId,
    ) -> DeliveryResult<Command> {
        // The OS dismisses a notification once the user responds to it
        let (_, event) = self
            .delivered
            .remove(&notification_id)
            .ok_or(DeliveryError::UnknownNotification(notification_id))?;
        self.surface.dismissed(notification_id);

        let command = {
            let mut calls = self.calls.lock();
            self.router.route(notification_id, action_id, &event, &mut calls)
        };

        if let Some(commands) = &self.commands {
            commands.dispatch(command.clone());
        }
        Ok(command)
    }

    /// Remove every delivered notification for a conversation, e.g. when the
    /// user opens it. Returns how many were removed.
    pub async fn clear_conversation(&self, conversation_id: &ConversationId) -> DeliveryResult<usize> {
        let ids: Vec<NotificationId> = self
            .delivered
            .iter()
            .filter(|entry| entry.value().conversation_id.as_ref() == Some(conversation_id))
            .map(|entry| *entry.key())
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        self.surface.remove(&ids).await?;
        for id in &ids {
            self.delivered.remove(id);
        }
        tracing::debug!(
            conversation = %conversation_id,
            removed = ids.len(),
            "conversation notifications cleared"
        );
        Ok(ids.len())
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }
}

/// Builder for [`DeliveryEngine`]
pub struct DeliveryEngineBuilder {
    surface: Arc<dyn NotificationSurface>,
    config: DeliveryConfig,
    analytics: Option<Arc<DeliveryAnalytics>>,
    commands: Option<Arc<dyn CommandSink>>,
}

impl DeliveryEngineBuilder {
    pub fn new(surface: Arc<dyn NotificationSurface>) -> Self {
        Self {
            surface,
            config: DeliveryConfig::default(),
            analytics: None,
            commands: None,
        }
    }

    pub fn with_config(mut self, config: DeliveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Share counters with a scheduler or token lifecycle
    pub fn with_analytics(mut self, analytics: Arc<DeliveryAnalytics>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_command_sink(mut self, commands: Arc<dyn CommandSink>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn build(self) -> DeliveryEngine {
        DeliveryEngine {
            policy: PresentationPolicy::new(self.config.policy.clone()),
            config: self.config,
            surface: self.surface,
            router: ActionRouter::new(),
            calls: Mutex::new(CallContext::new()),
            delivered: DashMap::new(),
            app_state: RwLock::new(AppState::default()),
            authorization: RwLock::new(AuthorizationState::default()),
            analytics: self.analytics.unwrap_or_default(),
            commands: self.commands,
        }
    }
}
