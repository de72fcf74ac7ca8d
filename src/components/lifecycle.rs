// Push token lifecycle: tracks registration of the device token with the
// notifications server. Every transition is caller initiated and every
// failure is returned to the caller; nothing is retried here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::analytics::DeliveryAnalytics;
use super::platform::PushBackend;
use super::{DeliveryError, DeliveryResult};

/// Registration status of the device token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TokenStatus {
    /// Known locally, not registered with the server
    #[default]
    New,
    /// Registered, verification pending
    Registered,
    /// Server rejected the token
    Invalid,
    /// Verification notification received and confirmed
    Confirmed,
    /// Server is delivering periodic checks
    Active,
    /// Server reported the registration expired
    Expired,
}

impl TokenStatus {
    /// Check if transition to target status is valid
    pub fn can_transition_to(&self, target: TokenStatus) -> bool {
        use TokenStatus::*;

        match (self, target) {
            // Invalid, Expired and deletion back to New are reachable from anywhere
            (_, Invalid) | (_, Expired) | (_, New) => true,

            // Registration outcomes
            (New | Invalid | Expired, Registered | Confirmed | Active) => true,

            // Forward progress along the verification chain
            (Registered, Confirmed | Active) => true,
            (Confirmed, Active) => true,

            _ => false,
        }
    }

    /// Statuses from which a registration request may be issued
    pub fn can_register(&self) -> bool {
        matches!(
            self,
            TokenStatus::New | TokenStatus::Expired | TokenStatus::Invalid
        )
    }

    /// Statuses a successful registration may land in
    pub fn is_registration_outcome(&self) -> bool {
        matches!(
            self,
            TokenStatus::Registered | TokenStatus::Confirmed | TokenStatus::Active
        )
    }

    /// Whether periodic checks are (or are about to be) enabled
    pub fn is_enabled(&self) -> bool {
        self.is_registration_outcome()
    }

    pub fn label(&self) -> &'static str {
        match self {
            TokenStatus::New => "new",
            TokenStatus::Registered => "registered",
            TokenStatus::Invalid => "invalid",
            TokenStatus::Confirmed => "confirmed",
            TokenStatus::Active => "active",
            TokenStatus::Expired => "expired",
        }
    }
}

/// Why a token status changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionReason {
    /// OS handed over a (new) device token
    DeviceToken,
    RegistrationSucceeded,
    RegistrationFailed,
    DeletionSucceeded,
    /// Server pushed a status change (expiry, invalidation, activation)
    BackendReported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransition {
    pub from_status: Option<TokenStatus>,
    pub to_status: TokenStatus,
    pub reason: TransitionReason,
    pub at: DateTime<Utc>,
}

/// Device push token and its status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushToken {
    pub value: String,
    pub status: TokenStatus,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<TokenTransition>,
}

impl PushToken {
    pub fn new(value: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            value: value.into(),
            status: TokenStatus::New,
            updated_at: now,
            history: vec![TokenTransition {
                from_status: None,
                to_status: TokenStatus::New,
                reason: TransitionReason::DeviceToken,
                at: now,
            }],
        }
    }

    /// Transition to a new status with validation and history tracking
    pub fn transition_to(
        &mut self,
        new_status: TokenStatus,
        reason: TransitionReason,
    ) -> DeliveryResult<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(DeliveryError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        let now = Utc::now();
        self.history.push(TokenTransition {
            from_status: Some(self.status),
            to_status: new_status,
            reason,
            at: now,
        });
        self.status = new_status;
        self.updated_at = now;

        // History keeps the most recent 64 transitions
        if self.history.len() > 64 {
            self.history.remove(0);
        }

        Ok(())
    }
}

/// Token lifecycle manager.
///
/// Backend calls happen outside the state lock; register and delete are
/// serialized so their outcomes apply in call order.
pub struct TokenLifecycle {
    backend: Arc<dyn PushBackend>,
    token: Mutex<Option<PushToken>>,
    operation: tokio::sync::Mutex<()>,
    analytics: Arc<DeliveryAnalytics>,
}

impl TokenLifecycle {
    pub fn new(backend: Arc<dyn PushBackend>) -> Self {
        Self::with_analytics(backend, Arc::new(DeliveryAnalytics::new()))
    }

    pub fn with_analytics(backend: Arc<dyn PushBackend>, analytics: Arc<DeliveryAnalytics>) -> Self {
        Self {
            backend,
            token: Mutex::new(None),
            operation: tokio::sync::Mutex::new(()),
            analytics,
        }
    }

    /// OS registration callback. A different value replaces the token and
    /// starts over from `New`; the same value keeps the current status.
    pub fn on_device_token(&self, value: impl Into<String>) -> TokenStatus {
        let value = value.into();
        let mut token = self.token.lock();
        match token.as_ref() {
            Some(existing) if existing.value == value => existing.status,
            _ => {
                tracing::info!("device token received");
                *token = Some(PushToken::new(value));
                TokenStatus::New
            },
        }
    }

    pub fn status(&self) -> Option<TokenStatus> {
        self.token.lock().as_ref().map(|token| token.status)
    }

    pub fn snapshot(&self) -> Option<PushToken> {
        self.token.lock().clone()
    }

    /// Register the token with the push backend.
    ///
    /// Allowed from `New`, `Expired` and `Invalid`. On success the status
    /// becomes whatever the backend assigned; on failure it becomes `Invalid`
    /// and the error is returned so the caller can revert its toggle.
    pub async fn register_attempt(&self) -> DeliveryResult<TokenStatus> {
        let _guard = self.operation.lock().await;

        let (value, current) = self.current()?;
        if !current.can_register() {
            return Err(DeliveryError::InvalidTransition {
                from: current,
                to: TokenStatus::Registered,
            });
        }

        tracing::debug!(status = ?current, "registering push token");
        let outcome = match self.backend.register_token(&value).await {
            Ok(status) if status.is_registration_outcome() => Ok(status),
            Ok(status) => Err(DeliveryError::PushBackend {
                operation: "register".to_string(),
                status_code: None,
                message: format!("unexpected status {} in registration response", status.label()),
            }),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(status) => {
                self.apply(&value, status, TransitionReason::RegistrationSucceeded)?;
                tracing::info!(status = ?status, "push token registered");
                Ok(status)
            },
            Err(error) => {
                self.analytics.record_token_failure();
                tracing::error!(error = %error, "push token registration failed");
                self.apply(&value, TokenStatus::Invalid, TransitionReason::RegistrationFailed)?;
                Err(error)
            },
        }
    }

    /// Delete the registration. Success returns the token to `New`;
    /// failure leaves the status unchanged.
    pub async fn delete_attempt(&self) -> DeliveryResult<()> {
        let _guard = self.operation.lock().await;

        let (value, current) = self.current()?;
        tracing::debug!(status = ?current, "deleting push token");

        match self.backend.delete_token(&value).await {
            Ok(()) => {
                self.apply(&value, TokenStatus::New, TransitionReason::DeletionSucceeded)?;
                tracing::info!("push token deleted");
                Ok(())
            },
            Err(error) => {
                self.analytics.record_token_failure();
                tracing::error!(error = %error, status = ?current, "push token deletion failed");
                Err(error)
            },
        }
    }

    /// Status pushed by the server (e.g. verification confirmed, expiry)
    pub fn apply_backend_status(&self, status: TokenStatus) -> DeliveryResult<()> {
        let mut token = self.token.lock();
        let token = token.as_mut().ok_or(DeliveryError::MissingToken)?;
        token.transition_to(status, TransitionReason::BackendReported)?;
        tracing::info!(status = ?status, "push token status reported by backend");
        Ok(())
    }

    fn current(&self) -> DeliveryResult<(String, TokenStatus)> {
        self.token
            .lock()
            .as_ref()
            .map(|token| (token.value.clone(), token.status))
            .ok_or(DeliveryError::MissingToken)
    }

    /// Apply an outcome unless the token was replaced while the call was in flight
    fn apply(&self, value: &str, status: TokenStatus, reason: TransitionReason) -> DeliveryResult<()> {
        let mut token = self.token.lock();
        match token.as_mut() {
            Some(token) if token.value == value => token.transition_to(status, reason),
            _ => {
                tracing::warn!("device token changed during backend call; outcome dropped");
                Ok(())
            },
        }
    }
}
