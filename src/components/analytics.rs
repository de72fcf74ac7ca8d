// Delivery analytics: lock-free counters shared by the engine, the token
// lifecycle and the refresh scheduler, exported as a serializable summary.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::policy::{Presentation, PresentationSet};

/// Counters for refresh sessions, notifications and token operations
#[derive(Debug, Default)]
pub struct DeliveryAnalytics {
    sessions_started: AtomicU64,
    sessions_timed_out: AtomicU64,
    sessions_expired: AtomicU64,
    sessions_without_user: AtomicU64,
    sessions_other: AtomicU64,
    notifications_delivered: AtomicU64,
    notifications_suppressed: AtomicU64,
    notifications_silent: AtomicU64,
    notifications_unauthorized: AtomicU64,
    delivery_failures: AtomicU64,
    token_failures: AtomicU64,
}

impl DeliveryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_timeout(&self) {
        self.sessions_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_expired(&self) {
        self.sessions_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_without_user(&self) {
        self.sessions_without_user.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_other(&self) {
        self.sessions_other.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a presentation decision that reached the surface
    pub fn record_delivered(&self, presentation: PresentationSet) {
        self.notifications_delivered.fetch_add(1, Ordering::Relaxed);
        if !presentation.contains(Presentation::Sound) {
            self.notifications_silent.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_suppressed(&self) {
        self.notifications_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unauthorized(&self) {
        self.notifications_unauthorized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_token_failure(&self) {
        self.token_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> AnalyticsSummary {
        AnalyticsSummary {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_timed_out: self.sessions_timed_out.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
            sessions_without_user: self.sessions_without_user.load(Ordering::Relaxed),
            sessions_other: self.sessions_other.load(Ordering::Relaxed),
            notifications_delivered: self.notifications_delivered.load(Ordering::Relaxed),
            notifications_suppressed: self.notifications_suppressed.load(Ordering::Relaxed),
            notifications_silent: self.notifications_silent.load(Ordering::Relaxed),
            notifications_unauthorized: self.notifications_unauthorized.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            token_failures: self.token_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub sessions_started: u64,
    pub sessions_timed_out: u64,
    pub sessions_expired: u64,
    pub sessions_without_user: u64,
    pub sessions_other: u64,
    pub notifications_delivered: u64,
    /// Accepted without sound (downgraded repeats, silent categories)
    pub notifications_silent: u64,
    pub notifications_suppressed: u64,
    pub notifications_unauthorized: u64,
    pub delivery_failures: u64,
    pub token_failures: u64,
}

impl AnalyticsSummary {
    pub fn sessions_finished(&self) -> u64 {
        self.sessions_timed_out
            + self.sessions_expired
            + self.sessions_without_user
            + self.sessions_other
    }

    /// Share of classified events that reached the surface
    pub fn delivery_rate(&self) -> f64 {
        let total = self.notifications_delivered + self.notifications_suppressed;
        if total == 0 {
            return 0.0;
        }
        self.notifications_delivered as f64 / total as f64
    }
}
