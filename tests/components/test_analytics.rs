//! Tests for components/analytics.rs

use chat_bg_delivery::components::{AnalyticsSummary, DeliveryAnalytics, PresentationSet};

#[test]
fn test_delivery_counters() {
    let analytics = DeliveryAnalytics::new();
    analytics.record_delivered(PresentationSet::ALL);
    analytics.record_delivered(PresentationSet::BANNER_LIST);
    analytics.record_suppressed();
    analytics.record_unauthorized();
    analytics.record_delivery_failure();

    let summary = analytics.summary();
    assert_eq!(summary.notifications_delivered, 2);
    assert_eq!(summary.notifications_silent, 1);
    assert_eq!(summary.notifications_suppressed, 1);
    assert_eq!(summary.notifications_unauthorized, 1);
    assert_eq!(summary.delivery_failures, 1);
    assert!((summary.delivery_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
}

#[test]
fn test_session_counters() {
    let analytics = DeliveryAnalytics::new();
    analytics.record_session_started();
    analytics.record_session_started();
    analytics.record_session_timeout();
    analytics.record_session_without_user();

    let summary = analytics.summary();
    assert_eq!(summary.sessions_started, 2);
    assert_eq!(summary.sessions_finished(), 2);
}

#[test]
fn test_empty_summary() {
    let summary = AnalyticsSummary::default();
    assert_eq!(summary.delivery_rate(), 0.0);
    assert_eq!(summary.sessions_finished(), 0);
    assert_eq!(DeliveryAnalytics::default().summary(), summary);
}
