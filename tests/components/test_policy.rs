//! Tests for components/policy.rs

use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use chat_bg_delivery::components::{
    AppState, ConversationId, NotificationCategory, PolicyConfig, Presentation,
    PresentationPolicy, PresentationSet, RawEvent, RawEventKind, RichText, Timestamp, classify,
};

fn message(conversation: &str) -> chat_bg_delivery::components::NotificationEvent {
    classify(&RawEvent::new(RawEventKind::MessageReceived {
        conversation_id: ConversationId::from(conversation),
        sender_name: "Alice".to_string(),
        text: RichText::plain("hello"),
    }))
}

fn contact_request(conversation: &str) -> chat_bg_delivery::components::NotificationEvent {
    classify(&RawEvent::new(RawEventKind::ContactRequest {
        conversation_id: ConversationId::from(conversation),
        request_id: 7,
        display_name: "bob".to_string(),
        full_name: None,
    }))
}

fn all_states() -> Vec<AppState> {
    vec![
        AppState::Background,
        AppState::chat_list(),
        AppState::in_conversation("@alice"),
        AppState::in_conversation("@carol"),
    ]
}

#[test]
fn test_presentation_set() {
    let set = PresentationSet::of(&[Presentation::Sound, Presentation::List]);
    assert_eq!(set, PresentationSet::SOUND_LIST);
    assert!(set.contains(Presentation::Sound));
    assert!(!set.contains(Presentation::Banner));
    assert_eq!(
        set.iter().collect::<Vec<_>>(),
        vec![Presentation::Sound, Presentation::List]
    );
    assert!(PresentationSet::EMPTY.is_empty());
    assert!(PresentationSet::default().is_empty());
}

#[test]
fn test_repeat_in_active_conversation_within_window_is_suppressed() {
    let policy = PresentationPolicy::default();
    let state = AppState::in_conversation("@alice");
    let t0 = Timestamp::now();

    assert_eq!(
        policy.decide(&message("@alice"), &state, t0),
        PresentationSet::SOUND_LIST
    );
    assert_eq!(
        policy.decide(&message("@alice"), &state, t0 + Duration::from_secs(5)),
        PresentationSet::EMPTY
    );
}

#[test]
fn test_repeat_after_window_is_presented_again() {
    let policy = PresentationPolicy::default();
    let state = AppState::in_conversation("@alice");
    let t0 = Timestamp::now();

    policy.decide(&message("@alice"), &state, t0);
    assert_eq!(
        policy.decide(&message("@alice"), &state, t0 + Duration::from_secs(31)),
        PresentationSet::SOUND_LIST
    );
}

#[test]
fn test_window_boundary_is_exclusive() {
    let policy = PresentationPolicy::default();
    let state = AppState::chat_list();
    let t0 = Timestamp::now();

    policy.decide(&message("@alice"), &state, t0);
    assert_eq!(
        policy.decide(&message("@alice"), &state, t0 + Duration::from_secs(30)),
        PresentationSet::SOUND_LIST
    );
}

#[test]
fn test_suppressed_decision_still_refreshes_recency() {
    let policy = PresentationPolicy::default();
    let state = AppState::chat_list();
    let t0 = Timestamp::now();

    policy.decide(&message("@alice"), &state, t0);
    // Suppressed, but records t0 + 20s
    assert!(policy
        .decide(&message("@alice"), &state, t0 + Duration::from_secs(20))
        .is_empty());
    // 40s after the first event, 20s after the suppressed one
    assert!(policy
        .decide(&message("@alice"), &state, t0 + Duration::from_secs(40))
        .is_empty());
    assert_eq!(
        policy.recency().last_notified(&ConversationId::from("@alice")),
        Some(t0 + Duration::from_secs(40))
    );
}

#[test]
fn test_other_active_conversation_downgrades_to_silent_banner() {
    let policy = PresentationPolicy::default();
    let state = AppState::in_conversation("@carol");
    let t0 = Timestamp::now();

    assert_eq!(
        policy.decide(&message("@alice"), &state, t0),
        PresentationSet::ALL
    );
    assert_eq!(
        policy.decide(&message("@alice"), &state, t0 + Duration::from_secs(3)),
        PresentationSet::BANNER_LIST
    );
}

#[test]
fn test_background_messages_are_never_gated() {
    let policy = PresentationPolicy::default();
    let t0 = Timestamp::now();

    for offset in 0..3 {
        assert_eq!(
            policy.decide(
                &message("@alice"),
                &AppState::Background,
                t0 + Duration::from_secs(offset)
            ),
            PresentationSet::ALL
        );
    }
    assert!(policy.recency().is_empty());
}

#[test]
fn test_recency_is_per_conversation() {
    let policy = PresentationPolicy::default();
    let state = AppState::chat_list();
    let t0 = Timestamp::now();

    policy.decide(&message("@alice"), &state, t0);
    assert_eq!(
        policy.decide(&message("@bob"), &state, t0 + Duration::from_secs(1)),
        PresentationSet::SOUND_LIST
    );
}

#[test]
fn test_check_message_is_never_presented() {
    let policy = PresentationPolicy::default();
    let event = classify(&RawEvent::new(RawEventKind::CheckMessages));
    assert_eq!(event.category, NotificationCategory::CheckMessage);

    for state in all_states() {
        assert!(policy.decide(&event, &state, Timestamp::now()).is_empty());
    }
}

#[test]
fn test_other_categories_always_use_every_channel() {
    let policy = PresentationPolicy::default();
    let t0 = Timestamp::now();

    for state in all_states() {
        // Repeats are not gated either
        for offset in 0..2 {
            assert_eq!(
                policy.decide(
                    &contact_request("@alice"),
                    &state,
                    t0 + Duration::from_secs(offset)
                ),
                PresentationSet::ALL
            );
        }
    }
}

#[test]
fn test_stale_entries_are_swept_past_threshold() {
    let config = PolicyConfig::default()
        .with_dedup_window(Duration::from_secs(30))
        .with_sweep_threshold(2);
    let policy = PresentationPolicy::new(config);
    let state = AppState::chat_list();
    let t0 = Timestamp::now();

    policy.decide(&message("@a"), &state, t0);
    policy.decide(&message("@b"), &state, t0);
    assert_eq!(policy.recency().len(), 2);

    // Third entry crosses the threshold; the first two are stale by then
    policy.decide(&message("@c"), &state, t0 + Duration::from_secs(60));
    assert_eq!(policy.recency().len(), 1);
    assert!(policy
        .recency()
        .last_notified(&ConversationId::from("@c"))
        .is_some());
}

#[test]
fn test_fresh_entries_do_not_trigger_repeated_sweeps() {
    let config = PolicyConfig::default()
        .with_dedup_window(Duration::from_secs(30))
        .with_sweep_threshold(2);
    let policy = PresentationPolicy::new(config);
    let state = AppState::chat_list();
    let t0 = Timestamp::now();

    // Crossing the threshold with fresh entries sweeps nothing
    for conversation in ["@a", "@b", "@c"] {
        policy.decide(&message(conversation), &state, t0);
    }
    assert_eq!(policy.recency().len(), 3);

    // The next sweep waits for another threshold's worth of growth
    let later = t0 + Duration::from_secs(60);
    policy.decide(&message("@d"), &state, later);
    policy.decide(&message("@e"), &state, later);
    assert_eq!(policy.recency().len(), 5);

    policy.decide(&message("@f"), &state, later);
    assert_eq!(policy.recency().len(), 3);
    assert!(policy
        .recency()
        .last_notified(&ConversationId::from("@a"))
        .is_none());
}

#[test]
fn test_concurrent_decisions_for_one_conversation_present_once() {
    const THREADS: usize = 16;

    let policy = PresentationPolicy::default();
    let state = AppState::in_conversation("@c");
    let event = message("@c");
    let now = Timestamp::now();
    let barrier = Barrier::new(THREADS);

    let decisions: Vec<PresentationSet> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    policy.decide(&event, &state, now)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let presented: Vec<_> = decisions.iter().filter(|set| !set.is_empty()).collect();
    assert_eq!(presented, vec![&PresentationSet::SOUND_LIST]);
    assert_eq!(policy.recency().len(), 1);
}
