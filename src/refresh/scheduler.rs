// Background refresh scheduler.
//
// Each scheduled tick runs one bounded session: request the next tick from
// the host, start a message receiver, poll its activity on a fixed period
// and finish through the completion latch on timeout, deadline or host
// expiration. At most one session runs at a time.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::latch::{CompletionLatch, CompletionReason};
use crate::components::analytics::DeliveryAnalytics;
use crate::components::config::RefreshConfig;
use crate::components::platform::{ReceiverFactory, SchedulingHost, SessionProvider};
use crate::components::time_wrapper::Timestamp;
use crate::components::{DeliveryResult, SessionId};

/// Scheduler gate: `Idle -> Running -> Completed -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    /// Finalization in progress
    Completed,
}

impl SchedulerState {
    pub fn can_transition_to(&self, target: SchedulerState) -> bool {
        matches!(
            (self, target),
            (SchedulerState::Idle, SchedulerState::Running)
                | (SchedulerState::Running, SchedulerState::Completed)
                | (SchedulerState::Completed, SchedulerState::Idle)
        )
    }
}

/// One background refresh session. Cloning shares the same latch.
#[derive(Debug, Clone)]
pub struct RefreshSession {
    pub id: SessionId,
    pub scheduled_at: Timestamp,
    pub deadline: Timestamp,
    latch: Arc<CompletionLatch>,
}

impl RefreshSession {
    /// Host hard deadline. Wins over any check that has not finished yet.
    pub fn expire(&self) -> bool {
        self.latch.try_complete(CompletionReason::Expired)
    }

    pub fn complete(&self, reason: impl Into<String>) -> bool {
        self.latch.try_complete(CompletionReason::Explicit(reason.into()))
    }

    pub fn is_completed(&self) -> bool {
        self.latch.is_completed()
    }

    pub fn reason(&self) -> Option<CompletionReason> {
        self.latch.reason()
    }

    /// Wait until the session has finished
    pub async fn finished(&self) -> Option<CompletionReason> {
        let mut reason = self.latch.subscribe();
        let finished = reason.wait_for(Option::is_some).await.ok()?;
        finished.clone()
    }
}

pub struct BackgroundRefreshScheduler {
    config: RefreshConfig,
    host: Arc<dyn SchedulingHost>,
    sessions: Arc<dyn SessionProvider>,
    receivers: Arc<dyn ReceiverFactory>,
    state: Arc<Mutex<SchedulerState>>,
    current: Arc<Mutex<Option<RefreshSession>>>,
    analytics: Arc<DeliveryAnalytics>,
}

impl BackgroundRefreshScheduler {
    pub fn new(
        config: RefreshConfig,
        host: Arc<dyn SchedulingHost>,
        sessions: Arc<dyn SessionProvider>,
        receivers: Arc<dyn ReceiverFactory>,
    ) -> Self {
        Self {
            config,
            host,
            sessions,
            receivers,
            state: Arc::new(Mutex::new(SchedulerState::Idle)),
            current: Arc::new(Mutex::new(None)),
            analytics: Arc::new(DeliveryAnalytics::new()),
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<DeliveryAnalytics>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn current_session(&self) -> Option<RefreshSession> {
        self.current.lock().clone()
    }

    /// Ask the host for the next session one refresh interval from now
    pub fn schedule(&self) -> DeliveryResult<Timestamp> {
        let earliest_begin = Timestamp::now() + self.config.refresh_interval;
        self.host.submit_refresh(earliest_begin)?;
        tracing::debug!(
            in_secs = self.config.refresh_interval.as_secs(),
            "next refresh scheduled"
        );
        Ok(earliest_begin)
    }

    /// Run one session for a scheduled tick. Must be called inside a tokio
    /// runtime. The next session is requested before any work starts.
    pub fn run_session(&self) -> RefreshSession {
        if let Err(error) = self.schedule() {
            tracing::error!(error = %error, "failed to schedule next refresh");
        }

        let owns_gate = self.try_enter_running();
        let scheduled_at = Timestamp::now();
        let id = SessionId::generate();
        let session = RefreshSession {
            id,
            scheduled_at,
            deadline: scheduled_at + self.config.session_budget,
            latch: Arc::new(CompletionLatch::new(self.finalizer(id, owns_gate))),
        };

        if !owns_gate {
            tracing::warn!(session = %id, "refresh triggered while a session is running");
            session.latch.try_complete(CompletionReason::AlreadyRunning);
            return session;
        }

        self.analytics.record_session_started();
        *self.current.lock() = Some(session.clone());
        tracing::info!(session = %id, "refresh session started");

        if !self.sessions.has_current_user() {
            session.latch.try_complete(CompletionReason::NoSession);
            return session;
        }

        if session.latch.attach_receiver(self.receivers.create_receiver()) {
            let handle = tokio::spawn(watch_activity(
                session.latch.clone(),
                self.config.clone(),
                session.deadline,
            ));
            session.latch.arm_timer(handle);
        }

        session
    }

    fn try_enter_running(&self) -> bool {
        let mut state = self.state.lock();
        if !state.can_transition_to(SchedulerState::Running) {
            return false;
        }
        *state = SchedulerState::Running;
        true
    }

    /// Teardown run by the latch winner. Only the session that entered the
    /// gate moves the scheduler state.
    fn finalizer(
        &self,
        id: SessionId,
        owns_gate: bool,
    ) -> impl FnOnce(&CompletionReason) + Send + 'static {
        let host = self.host.clone();
        let state = self.state.clone();
        let current = self.current.clone();
        let analytics = self.analytics.clone();

        move |reason: &CompletionReason| {
            if owns_gate {
                *state.lock() = SchedulerState::Completed;
                match reason {
                    CompletionReason::Timeout { .. } | CompletionReason::Deadline => {
                        analytics.record_session_timeout()
                    },
                    CompletionReason::Expired => analytics.record_session_expired(),
                    CompletionReason::NoSession => analytics.record_session_without_user(),
                    CompletionReason::AlreadyRunning | CompletionReason::Explicit(_) => {
                        analytics.record_session_other()
                    },
                }
            }

            host.complete_session(id, true);

            if owns_gate {
                let mut current = current.lock();
                if current.as_ref().is_some_and(|session| session.id == id) {
                    *current = None;
                }
                *state.lock() = SchedulerState::Idle;
            }

            tracing::info!(session = %id, reason = %reason, "refresh session finished");
        }
    }
}

/// Periodic activity check for a running session
async fn watch_activity(latch: Arc<CompletionLatch>, config: RefreshConfig, deadline: Timestamp) {
    let start = Timestamp::now() + config.check_interval;
    let mut ticker = tokio::time::interval_at(start.inner(), config.check_interval);

    loop {
        ticker.tick().await;
        if latch.is_completed() {
            break;
        }

        let Some(last_activity) = latch.last_activity() else {
            break;
        };
        let now = Timestamp::now();
        let idle = now.duration_since(last_activity);
        tracing::trace!(idle_ms = idle.as_millis() as u64, "refresh activity check");

        if idle >= config.wait_for_messages {
            latch.try_complete(CompletionReason::Timeout { idle });
            break;
        }
        if now >= deadline {
            latch.try_complete(CompletionReason::Deadline);
            break;
        }
    }
}
