// Completion latch: exactly-once finalization of a refresh session.
//
// The expiration signal and the periodic activity check race to finish a
// session. The first caller to flip `completed` owns the whole teardown;
// every other caller returns `false` without touching anything.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::components::platform::MessageReceiver;
use crate::components::time_wrapper::Timestamp;

/// Why a refresh session finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionReason {
    /// No message arrived within the wait threshold
    Timeout { idle: Duration },
    /// The host's hard deadline fired
    Expired,
    /// No authenticated user, nothing to receive
    NoSession,
    /// The session ran past its own budget
    Deadline,
    /// Another session was still running when this one was triggered
    AlreadyRunning,
    /// Finished by the caller
    Explicit(String),
}

impl CompletionReason {
    pub fn label(&self) -> &str {
        match self {
            CompletionReason::Timeout { .. } => "timeout",
            CompletionReason::Expired => "expired",
            CompletionReason::NoSession => "no session",
            CompletionReason::Deadline => "deadline",
            CompletionReason::AlreadyRunning => "already running",
            CompletionReason::Explicit(reason) => reason,
        }
    }
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReason::Timeout { idle } => {
                write!(f, "timeout (no messages for {}ms)", idle.as_millis())
            },
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Callback run once by the winning `try_complete`; signals the host
pub type Finalizer = Box<dyn FnOnce(&CompletionReason) + Send>;

pub struct CompletionLatch {
    completed: AtomicBool,
    receiver: Mutex<Option<Box<dyn MessageReceiver>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    finalizer: Mutex<Option<Finalizer>>,
    reason: watch::Sender<Option<CompletionReason>>,
}

impl CompletionLatch {
    pub fn new(finalizer: impl FnOnce(&CompletionReason) + Send + 'static) -> Self {
        let (reason, _) = watch::channel(None);
        Self {
            completed: AtomicBool::new(false),
            receiver: Mutex::new(None),
            timer: Mutex::new(None),
            finalizer: Mutex::new(Some(Box::new(finalizer))),
            reason,
        }
    }

    /// Finish the session. Returns `true` for exactly one caller.
    ///
    /// The winner stops and releases the receiver, cancels the periodic
    /// check, runs the finalizer and then publishes the reason, in that order.
    pub fn try_complete(&self, reason: CompletionReason) -> bool {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(reason = %reason, "completion already claimed");
            return false;
        }

        if let Some(mut receiver) = self.receiver.lock().take() {
            receiver.stop();
        }
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
        if let Some(finalizer) = self.finalizer.lock().take() {
            finalizer(&reason);
        }

        tracing::debug!(reason = %reason, "completion latch released");
        self.reason.send_replace(Some(reason));
        true
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Start `receiver` and hand it to the latch. A receiver attached after
    /// completion is never started; returns whether it was.
    pub fn attach_receiver(&self, mut receiver: Box<dyn MessageReceiver>) -> bool {
        let mut slot = self.receiver.lock();
        // Holding the slot keeps the winner from taking it between check and store
        if self.is_completed() {
            return false;
        }
        receiver.start();
        *slot = Some(receiver);
        true
    }

    /// Hand over the periodic check task; aborted at once if already completed
    pub fn arm_timer(&self, handle: JoinHandle<()>) {
        let mut slot = self.timer.lock();
        if self.is_completed() {
            handle.abort();
            return;
        }
        *slot = Some(handle);
    }

    /// Last activity reported by the attached receiver
    pub fn last_activity(&self) -> Option<Timestamp> {
        self.receiver
            .lock()
            .as_ref()
            .map(|receiver| receiver.last_activity())
    }

    pub fn reason(&self) -> Option<CompletionReason> {
        self.reason.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CompletionReason>> {
        self.reason.subscribe()
    }
}

impl fmt::Debug for CompletionLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionLatch")
            .field("completed", &self.is_completed())
            .field("reason", &self.reason())
            .finish()
    }
}
