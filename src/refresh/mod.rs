//! Bounded background refresh sessions.
//!
//! [`BackgroundRefreshScheduler`] drives one session per scheduled tick and
//! [`CompletionLatch`] guarantees each session is finalized exactly once,
//! whichever of the host expiration signal and the activity check fires first.

pub mod latch;
pub mod scheduler;

pub use latch::{CompletionLatch, CompletionReason, Finalizer};
pub use scheduler::{BackgroundRefreshScheduler, RefreshSession, SchedulerState};
