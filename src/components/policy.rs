// Presentation policy: decides which channels (sound, banner, list) a
// notification uses given its category and what the user is looking at.
// The decision table is explicit; repeat suppression is driven by a
// per-conversation recency map.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use super::content::NotificationEvent;
use super::time_wrapper::Timestamp;
use super::{ConversationId, NotificationCategory, PolicyConfig};

/// A single presentation channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Presentation {
    Sound,
    Banner,
    List,
}

impl Presentation {
    fn bit(self) -> u8 {
        match self {
            Presentation::Sound => 0b001,
            Presentation::Banner => 0b010,
            Presentation::List => 0b100,
        }
    }
}

/// Set of presentation channels. Empty means the notification is suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PresentationSet(u8);

impl PresentationSet {
    pub const EMPTY: PresentationSet = PresentationSet(0);
    pub const SOUND_LIST: PresentationSet = PresentationSet(0b101);
    pub const BANNER_LIST: PresentationSet = PresentationSet(0b110);
    pub const ALL: PresentationSet = PresentationSet(0b111);

    pub fn of(channels: &[Presentation]) -> Self {
        Self(channels.iter().fold(0, |bits, channel| bits | channel.bit()))
    }

    pub fn contains(&self, channel: Presentation) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Presentation> + '_ {
        [Presentation::Sound, Presentation::Banner, Presentation::List]
            .into_iter()
            .filter(|channel| self.contains(*channel))
    }
}

/// What the application is showing when a notification arrives
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppState {
    Foreground {
        active_conversation: Option<ConversationId>,
    },
    #[default]
    Background,
}

impl AppState {
    /// Foreground on the chat list
    pub fn chat_list() -> Self {
        AppState::Foreground {
            active_conversation: None,
        }
    }

    /// Foreground inside a conversation
    pub fn in_conversation(conversation_id: impl Into<ConversationId>) -> Self {
        AppState::Foreground {
            active_conversation: Some(conversation_id.into()),
        }
    }

    pub fn is_foreground(&self) -> bool {
        matches!(self, AppState::Foreground { .. })
    }
}

/// Column of the decision table an event falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Situation {
    ForegroundNoActive,
    ForegroundSameConversation,
    ForegroundOtherConversation,
    Background,
}

impl Situation {
    fn of(app_state: &AppState, event_conversation: Option<&ConversationId>) -> Self {
        match app_state {
            AppState::Background => Situation::Background,
            AppState::Foreground {
                active_conversation: None,
            } => Situation::ForegroundNoActive,
            AppState::Foreground {
                active_conversation: Some(active),
            } if Some(active) == event_conversation => Situation::ForegroundSameConversation,
            AppState::Foreground { .. } => Situation::ForegroundOtherConversation,
        }
    }
}

/// One cell of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Fixed(PresentationSet),
    /// `fresh` unless the conversation was notified within the dedup window
    DedupGated {
        fresh: PresentationSet,
        recent: PresentationSet,
    },
}

fn decision_table(category: NotificationCategory, situation: Situation) -> Cell {
    use NotificationCategory::*;
    use Situation::*;

    match (category, situation) {
        (MessageReceived, ForegroundNoActive) => Cell::DedupGated {
            fresh: PresentationSet::SOUND_LIST,
            recent: PresentationSet::EMPTY,
        },
        (MessageReceived, ForegroundSameConversation) => Cell::DedupGated {
            fresh: PresentationSet::SOUND_LIST,
            recent: PresentationSet::EMPTY,
        },
        (MessageReceived, ForegroundOtherConversation) => Cell::DedupGated {
            fresh: PresentationSet::ALL,
            recent: PresentationSet::BANNER_LIST,
        },
        (MessageReceived, Background) => Cell::Fixed(PresentationSet::ALL),

        // Server wake-ups only trigger a poll, never a visible notification
        (CheckMessage, _) => Cell::Fixed(PresentationSet::EMPTY),

        (ContactRequest | ContactConnected | CallInvitation, _) => {
            Cell::Fixed(PresentationSet::ALL)
        },
    }
}

/// Last time each conversation was notified.
///
/// Entries are logically stale once older than the dedup window. A sweep
/// runs when the map outgrows the threshold on top of whatever survived the
/// previous sweep, so a map full of fresh entries is not rescanned on every
/// decision.
#[derive(Debug)]
pub struct ConversationRecency {
    entries: DashMap<ConversationId, Timestamp>,
    /// Size left by the last sweep
    retained: AtomicUsize,
    config: PolicyConfig,
}

impl ConversationRecency {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            entries: DashMap::new(),
            retained: AtomicUsize::new(0),
            config,
        }
    }

    /// Record `now` for the conversation and report whether the previous
    /// notification fell within the dedup window.
    ///
    /// Read and write happen under the same entry lock, so concurrent events
    /// for one conversation observe each other in order.
    pub fn touch(&self, conversation_id: &ConversationId, now: Timestamp) -> bool {
        let recent = match self.entries.entry(conversation_id.clone()) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(now);
                now.duration_since(previous) < self.config.dedup_window
            },
            Entry::Vacant(entry) => {
                entry.insert(now);
                false
            },
        };

        let limit = self
            .config
            .sweep_threshold
            .saturating_add(self.retained.load(Ordering::Relaxed));
        if self.entries.len() > limit {
            let removed = self.sweep_stale(now);
            tracing::debug!(removed, remaining = self.entries.len(), "swept conversation recency");
        }

        recent
    }

    pub fn last_notified(&self, conversation_id: &ConversationId) -> Option<Timestamp> {
        self.entries.get(conversation_id).map(|entry| *entry)
    }

    /// Remove entries older than the dedup window; returns how many were removed
    pub fn sweep_stale(&self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, last| now.duration_since(*last) < self.config.dedup_window);
        let after = self.entries.len();
        self.retained.store(after, Ordering::Relaxed);
        before.saturating_sub(after)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Presentation decisions over the recency map. Never blocks on I/O.
#[derive(Debug)]
pub struct PresentationPolicy {
    recency: ConversationRecency,
}

impl PresentationPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            recency: ConversationRecency::new(config),
        }
    }

    pub fn recency(&self) -> &ConversationRecency {
        &self.recency
    }

    /// Decide the presentation channels for `event` given `app_state`.
    ///
    /// Every dedup-gated decision records `now` for the conversation, even
    /// when the outcome is to suppress.
    pub fn decide(
        &self,
        event: &NotificationEvent,
        app_state: &AppState,
        now: Timestamp,
    ) -> PresentationSet {
        let situation = Situation::of(app_state, event.conversation_id.as_ref());

        match decision_table(event.category, situation) {
            Cell::Fixed(set) => set,
            Cell::DedupGated { fresh, recent } => {
                let is_recent = match &event.conversation_id {
                    Some(conversation_id) => self.recency.touch(conversation_id, now),
                    None => false,
                };
                let decision = if is_recent { recent } else { fresh };
                tracing::debug!(
                    category = %event.category,
                    conversation = ?event.conversation_id,
                    situation = ?situation,
                    recent = is_recent,
                    decision = ?decision,
                    "presentation decided"
                );
                decision
            },
        }
    }
}

impl Default for PresentationPolicy {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}
