// Tunables for the refresh scheduler and the presentation policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Background refresh timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Period of the activity check while a session runs
    pub check_interval: Duration,
    /// Idle time after which a session finishes (transport timeout + margin)
    pub wait_for_messages: Duration,
    /// Delay before the next session is requested from the host
    pub refresh_interval: Duration,
    /// Upper bound on a single session, measured from its start
    pub session_budget: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(2),
            wait_for_messages: Duration::from_secs(6),
            refresh_interval: Duration::from_secs(450),
            session_budget: Duration::from_secs(30),
        }
    }
}

impl RefreshConfig {
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_wait_for_messages(mut self, wait: Duration) -> Self {
        self.wait_for_messages = wait;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_session_budget(mut self, budget: Duration) -> Self {
        self.session_budget = budget;
        self
    }
}

/// Presentation policy tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Window within which a repeat notification for a conversation is muted
    pub dedup_window: Duration,
    /// Recency map size that triggers a sweep of stale entries
    pub sweep_threshold: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(30),
            sweep_threshold: 1024,
        }
    }
}

impl PolicyConfig {
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold;
        self
    }
}

/// Top-level configuration for the delivery subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Application name reported to the notification surface
    pub app_name: String,
    pub refresh: RefreshConfig,
    pub policy: PolicyConfig,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            app_name: "Chat".to_string(),
            refresh: RefreshConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl DeliveryConfig {
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }
}
