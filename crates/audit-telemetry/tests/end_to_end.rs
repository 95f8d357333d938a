//! Ingestion through analytics and export, on a controlled clock.

use std::sync::Arc;

use authz_audit_telemetry::{
    AuditConfig, AuditError, AuditTelemetry, Clock, ExportQuery, ManualClock, ThreatBand, MAX_CAPACITY,
};
use authz_audit_types::{
    AuthorizationDecisionEvent, ConfigurationChangeEvent, Decision, EventCategory, EventPayload,
    PerformanceEvent, PolicySyncEvent, SystemEvent, SystemEventKind,
};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn setup(config: AuditConfig) -> (AuditTelemetry, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
    let telemetry = AuditTelemetry::builder(config)
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    (telemetry, clock)
}

fn quiet() -> AuditConfig {
    AuditConfig {
        detailed_logging: false,
        ..Default::default()
    }
}

fn deny(action: &str, resource: &str) -> AuthorizationDecisionEvent {
    AuthorizationDecisionEvent::new(Decision::Deny, action, resource, "mallory")
        .with_response_time_ms(4.0)
        .with_policies(["deny-all"])
        .with_reason("no matching permit")
        .with_client("10.0.0.9", "curl/8.0")
        .with_origin_node("node-1")
}

fn allow(action: &str) -> AuthorizationDecisionEvent {
    AuthorizationDecisionEvent::new(Decision::Allow, action, "orders", "alice")
        .with_response_time_ms(2.0)
        .with_origin_node("node-1")
}

fn config_change(key: &str) -> ConfigurationChangeEvent {
    ConfigurationChangeEvent {
        key: key.to_string(),
        old_value: None,
        new_value: Some("on".into()),
        changed_by: Some("ops".into()),
        origin_node: "node-2".into(),
    }
}

#[test]
fn bounded_retention_keeps_last_capacity_records() {
    let (t, _) = setup(quiet());
    let n = MAX_CAPACITY + 500;
    for i in 0..n {
        t.record_configuration_change(config_change(&format!("key-{i}")));
    }
    assert_eq!(t.retained_events(), MAX_CAPACITY);
    assert_eq!(t.counters().total_events, n as u64);

    let oldest_first: Vec<_> = t.get_recent_events(usize::MAX).into_iter().rev().collect();
    let keys: Vec<String> = oldest_first
        .iter()
        .map(|r| match &r.payload {
            EventPayload::ConfigurationChange(c) => c.key.clone(),
            other => panic!("unexpected payload {other:?}"),
        })
        .collect();
    let expected: Vec<String> = (500..n).map(|i| format!("key-{i}")).collect();
    assert_eq!(keys, expected);
}

#[test]
fn derived_violations_match_denies() {
    let (t, _) = setup(quiet());
    for _ in 0..7 {
        t.record_authorization_decision(deny("indices:data/write", "orders"));
    }
    for _ in 0..11 {
        t.record_authorization_decision(allow("indices:data/read"));
    }
    let violations = t
        .get_recent_events(usize::MAX)
        .iter()
        .filter(|r| r.category() == EventCategory::SecurityViolation)
        .count();
    assert_eq!(violations, 7);
    assert_eq!(t.counters().security_violations, 7);
    assert_eq!(t.counters().total_events, 25);
}

#[test]
fn top_violated_resources_ranking_and_tie_break() {
    let (t, _) = setup(quiet());
    for r in ["A", "B", "C", "A", "B", "A", "B", "C", "A"] {
        t.record_authorization_decision(deny("read", r));
    }
    let report = t.get_analytics_report();
    let ranked: Vec<_> = report
        .top_violated_resources
        .iter()
        .map(|e| (e.key.as_str(), e.count))
        .collect();
    assert_eq!(ranked, vec![("A", 4), ("B", 3), ("C", 2)]);

    let (t, _) = setup(quiet());
    for r in ["B", "A", "A", "B"] {
        t.record_authorization_decision(deny("read", r));
    }
    let report = t.get_analytics_report();
    assert_eq!(report.top_violated_resources[0].key, "B");
    assert_eq!(report.top_violated_resources[1].key, "A");
    assert_eq!(report.top_violated_resources[0].count, 2);
}

#[test]
fn hourly_buckets_cover_now_and_twenty_three_hours_ago() {
    let (t, clock) = setup(quiet());
    let now = clock.now();

    clock.set(now - Duration::hours(23));
    t.record_configuration_change(config_change("old"));
    clock.set(now);
    t.record_configuration_change(config_change("new"));

    let report = t.get_analytics_report();
    let non_zero: Vec<_> = report
        .hourly_trends
        .iter()
        .enumerate()
        .filter(|(_, b)| b.count > 0)
        .map(|(i, b)| (i, b.count, b.label.as_str()))
        .collect();
    assert_eq!(non_zero, vec![(0, 1, "11:00"), (22, 1, "13:00")]);
    assert_eq!(report.hourly_trends[22].start, now - Duration::hours(23));
}

#[test]
fn compliance_threshold_at_five_percent() {
    // 4 denies = 8 records + 92 others = 100 events, 4 violations
    let (t, _) = setup(quiet());
    for _ in 0..4 {
        t.record_authorization_decision(deny("read", "r"));
    }
    for i in 0..92 {
        t.record_configuration_change(config_change(&format!("k{i}")));
    }
    assert_eq!(t.counters().total_events, 100);
    let report = t.get_analytics_report();
    assert!(report.compliance.sox_compliant);
    assert!(report.compliance.audit_trail_complete);

    // 5 denies = 10 records + 90 others = 100 events, 5 violations
    let (t, _) = setup(quiet());
    for _ in 0..5 {
        t.record_authorization_decision(deny("read", "r"));
    }
    for i in 0..90 {
        t.record_configuration_change(config_change(&format!("k{i}")));
    }
    assert_eq!(t.counters().total_events, 100);
    assert!(!t.get_analytics_report().compliance.sox_compliant);
}

#[test]
fn disabled_subsystem_stays_empty() {
    let (t, _) = setup(AuditConfig::disabled());
    for _ in 0..50 {
        t.record_authorization_decision(deny("delete", "r"));
        t.record_policy_sync(PolicySyncEvent {
            status: "FAILED".into(),
            policies_updated: vec![],
            duration_ms: 10,
            source: "store".into(),
            error_message: Some("timeout".into()),
            origin_node: "n".into(),
        });
        t.record_configuration_change(config_change("k"));
        t.record_violation(deny("delete", "r"));
        t.record_system_event(SystemEvent::new(SystemEventKind::SuspiciousActivity, "port scan"));
    }
    let counters = t.counters();
    assert_eq!(counters.total_events, 0);
    assert_eq!(counters.security_violations, 0);
    assert_eq!(counters.policy_evaluations, 0);
    assert!(t.get_recent_events(100).is_empty());

    let report = t.get_analytics_report();
    assert_eq!(report.threat_level(), ThreatBand::Minimal);
    assert!(report.top_denied_actions.is_empty());
}

#[test]
fn analytics_mix_of_categories() {
    let (t, _) = setup(quiet());
    t.record_authorization_decision(deny("indices:admin/delete", "orders"));
    t.record_authorization_decision(deny("indices:admin/delete", "users"));
    t.record_authorization_decision(deny("indices:data/read", "orders"));
    t.record_authorization_decision(allow("indices:data/read"));
    t.record_performance_sample(PerformanceEvent {
        response_time_ms: 10.0,
        memory_usage_mb: 512.0,
        cpu_usage_percent: 35.0,
        active_connections: 12,
        queue_depth: 1,
        throughput_per_second: 250.0,
        origin_node: "node-1".into(),
    });
    t.record_configuration_change(config_change("cache.enabled"));

    let report = t.get_analytics_report();
    // two of three violations are HIGH
    assert!((report.threat_score - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(report.threat_level(), ThreatBand::Medium);
    assert!(!report.requires_immediate_action());

    assert_eq!(report.top_denied_actions[0].key, "indices:admin/delete");
    assert_eq!(report.top_denied_actions[0].count, 2);
    assert_eq!(report.top_violated_resources[0].key, "orders");

    // (4 + 4 + 4 + 2 + 10) / 5 timed records
    assert!((report.performance.average_response_time_ms - 4.8).abs() < 1e-9);
    assert!((report.performance.total_events_per_hour - 9.0 / 24.0).abs() < 1e-9);
    assert!((report.performance.security_violation_rate - 300.0 / 9.0).abs() < 1e-9);

    let metrics = report.metrics.as_ref().unwrap();
    assert_eq!(metrics.count(EventCategory::AuthorizationDecision), 4);
    assert_eq!(metrics.count(EventCategory::SecurityViolation), 3);
    assert_eq!(metrics.decisions.top_principal(), Some(("mallory", 3)));
    assert!(report.summary().starts_with("Threat Level: MEDIUM (Score: 0.67)"));
}

#[test]
fn export_filters_by_range_and_category() {
    let (t, clock) = setup(quiet());
    let start = clock.now();

    t.record_authorization_decision(deny("write", "orders"));
    clock.advance(Duration::minutes(30));
    t.record_configuration_change(config_change("a"));
    clock.advance(Duration::hours(2));
    t.record_configuration_change(config_change("b"));

    let export = t
        .export_events(start, start + Duration::hours(1), None)
        .unwrap();
    assert_eq!(export.audit_events.len(), 3);
    assert_eq!(export.event_type, "ALL");

    let export = t
        .export_events(
            start,
            start + Duration::hours(3),
            Some(EventCategory::ConfigurationChange),
        )
        .unwrap();
    assert_eq!(export.audit_events.len(), 2);
    assert_eq!(export.event_type, "CONFIGURATION_CHANGE");
    assert_eq!(export.audit_events[0]["key"], "a");

    let violation = t
        .export_events(start, start + Duration::hours(3), Some(EventCategory::SecurityViolation))
        .unwrap();
    let v = &violation.audit_events[0];
    assert_eq!(v["violation_type"], "UNAUTHORIZED_ACCESS_ATTEMPT");
    assert_eq!(v["threat_level"], "MEDIUM");
    assert_eq!(v["decision"], "DENY");
    assert_eq!(v["client_address"], "10.0.0.9");
    assert!(v.get("source_event_id").is_some());
}

#[test]
fn export_outside_window_still_reports_totals() {
    let (t, clock) = setup(quiet());
    for _ in 0..3 {
        t.record_authorization_decision(deny("read", "r"));
    }
    let later = clock.now() + Duration::days(1);
    let export = t
        .export_events(later, later + Duration::hours(1), None)
        .unwrap();

    assert!(export.audit_events.is_empty());
    assert_eq!(export.total_events, 6);
    assert_eq!(export.security_violations, 3);
    assert!(export.compliance_status.audit_trail_complete);
    assert!(!export.compliance_status.sox_compliant);

    let json = export.to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["total_events"], 6);
    assert_eq!(value["compliance_status"]["gdpr_compliant"], true);
    assert!(value["audit_events"].as_array().unwrap().is_empty());
}

#[test]
fn export_query_from_strings() {
    let (t, clock) = setup(quiet());
    t.record_policy_sync(PolicySyncEvent {
        status: "SUCCESS".into(),
        policies_updated: vec!["p1".into()],
        duration_ms: 12,
        source: "lock-server".into(),
        error_message: None,
        origin_node: "node-3".into(),
    });
    t.record_configuration_change(config_change("x"));

    let query = ExportQuery::parse(None, None, Some("policy_sync"), clock.now() + Duration::seconds(1))
        .unwrap();
    let export = t.export(&query);
    assert_eq!(export.audit_events.len(), 1);
    assert_eq!(export.audit_events[0]["source"], "lock-server");
    assert_eq!(export.audit_events[0]["origin_node"], "node-3");

    assert!(matches!(
        ExportQuery::parse(Some("2024-06-02T00:00:00Z"), Some("2024-06-01T00:00:00Z"), None, clock.now()),
        Err(AuditError::InvalidTimeRange { .. })
    ));
}

#[test]
fn recent_events_are_newest_first_and_serializable() {
    let (t, clock) = setup(quiet());
    t.record_authorization_decision(allow("read"));
    clock.advance(Duration::seconds(1));
    t.record_system_event(
        SystemEvent::new(SystemEventKind::HighLatencyDetected, "p99 above budget")
            .with_context("p99_ms", 850)
            .with_origin_node("node-1"),
    );

    let recent = t.get_recent_events(10);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].category(), EventCategory::SystemEvent);

    let value = serde_json::to_value(recent[0].as_ref()).unwrap();
    assert_eq!(value["event_type"], "SYSTEM_EVENT");
    assert_eq!(value["severity"], "WARN");
    assert_eq!(value["context"]["p99_ms"], 850);

    let value = serde_json::to_value(recent[1].as_ref()).unwrap();
    assert_eq!(value["event_type"], "AUTHORIZATION_DECISION");
    assert_eq!(value["decision"], "ALLOW");
    assert_eq!(value["response_time_ms"], 2.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn counters_are_independent_of_eviction(
        capacity in 1usize..50,
        decisions in prop::collection::vec(any::<bool>(), 0..200),
    ) {
        let config = AuditConfig {
            max_capacity: capacity,
            detailed_logging: false,
            ..Default::default()
        };
        let t = AuditTelemetry::new(config).unwrap();
        for &is_deny in &decisions {
            let decision = if is_deny { Decision::Deny } else { Decision::Allow };
            t.record_authorization_decision(AuthorizationDecisionEvent::new(decision, "read", "r", "p"));
        }
        let denies = decisions.iter().filter(|d| **d).count() as u64;
        let counters = t.counters();
        prop_assert_eq!(counters.policy_evaluations, decisions.len() as u64);
        prop_assert_eq!(counters.security_violations, denies);
        prop_assert_eq!(counters.total_events, decisions.len() as u64 + denies);
        prop_assert_eq!(t.retained_events() as u64, counters.total_events.min(capacity as u64));
    }
}
