//! Immutable event records.
//!
//! An [`EventRecord`] is created once, at the ingestion boundary, and never
//! mutated afterwards. The category-specific body lives in [`EventPayload`];
//! the shared fields (id, timestamp, origin node) live on the record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{Decision, EventCategory, ThreatLevel};
use crate::system::{Severity, SystemEventKind};

/// Violation type stamped on every derived security violation.
pub const UNAUTHORIZED_ACCESS_ATTEMPT: &str = "UNAUTHORIZED_ACCESS_ATTEMPT";

/// Body of an authorization decision record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDetails {
    pub decision: Decision,
    pub action: String,
    pub resource: String,
    pub principal: String,
    pub policies_evaluated: Vec<String>,
    pub response_time_ms: f64,
    pub reason: String,
    pub token_context: BTreeMap<String, serde_json::Value>,
    pub client_address: String,
    pub client_agent: String,
    pub request_id: String,
    pub session_id: String,
}

/// Body of a security violation record: the denied decision plus the
/// violation classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViolationDetails {
    #[serde(flatten)]
    pub decision: AuthorizationDetails,
    pub violation_type: String,
    pub threat_level: ThreatLevel,
    /// Id of the decision record this violation was derived from, when
    /// it was derived rather than reported directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicySyncDetails {
    pub status: String,
    pub policies_updated: Vec<String>,
    pub duration_ms: u64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationChangeDetails {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceDetails {
    pub response_time_ms: f64,
    pub memory_usage_mb: f64,
    pub cpu_usage_percent: f64,
    pub active_connections: u32,
    pub queue_depth: u32,
    pub throughput_per_second: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemEventDetails {
    pub kind: SystemEventKind,
    pub severity: Severity,
    pub description: String,
    pub context: BTreeMap<String, serde_json::Value>,
}

/// Category-specific body, tagged on the wire by `event_type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    AuthorizationDecision(AuthorizationDetails),
    SecurityViolation(ViolationDetails),
    PolicySync(PolicySyncDetails),
    ConfigurationChange(ConfigurationChangeDetails),
    PerformanceSample(PerformanceDetails),
    SystemEvent(SystemEventDetails),
}

impl EventPayload {
    pub fn category(&self) -> EventCategory {
        match self {
            Self::AuthorizationDecision(_) => EventCategory::AuthorizationDecision,
            Self::SecurityViolation(_) => EventCategory::SecurityViolation,
            Self::PolicySync(_) => EventCategory::PolicySync,
            Self::ConfigurationChange(_) => EventCategory::ConfigurationChange,
            Self::PerformanceSample(_) => EventCategory::PerformanceSample,
            Self::SystemEvent(_) => EventCategory::SystemEvent,
        }
    }
}

/// One ingested security event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "event_id")]
    pub id: Uuid,
    /// Ingestion-time clock reading.
    pub timestamp: DateTime<Utc>,
    pub origin_node: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl EventRecord {
    /// Build a record with a fresh id. `timestamp` must be the ingesting
    /// component's clock reading, never a producer-supplied value.
    pub fn new(payload: EventPayload, origin_node: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            origin_node: origin_node.into(),
            payload,
        }
    }

    pub fn category(&self) -> EventCategory {
        self.payload.category()
    }

    /// Response time carried by this record, if it measures one.
    ///
    /// Only authorization decisions and performance samples are timed.
    /// Derived violations repeat their decision's fields but are not a
    /// second measurement, so they report `None`. A negative or non-finite
    /// reading also reports `None`, so it never enters an average.
    pub fn response_time_ms(&self) -> Option<f64> {
        let ms = match &self.payload {
            EventPayload::AuthorizationDecision(d) => d.response_time_ms,
            EventPayload::PerformanceSample(p) => p.response_time_ms,
            _ => return None,
        };
        (ms.is_finite() && ms >= 0.0).then_some(ms)
    }

    /// Decision body for decision and violation records.
    pub fn authorization(&self) -> Option<&AuthorizationDetails> {
        match &self.payload {
            EventPayload::AuthorizationDecision(d) => Some(d),
            EventPayload::SecurityViolation(v) => Some(&v.decision),
            _ => None,
        }
    }

    pub fn violation(&self) -> Option<&ViolationDetails> {
        match &self.payload {
            EventPayload::SecurityViolation(v) => Some(v),
            _ => None,
        }
    }

    pub fn decision(&self) -> Option<Decision> {
        self.authorization().map(|d| d.decision)
    }

    pub fn action(&self) -> Option<&str> {
        self.authorization().map(|d| d.action.as_str())
    }

    pub fn resource(&self) -> Option<&str> {
        self.authorization().map(|d| d.resource.as_str())
    }

    pub fn principal(&self) -> Option<&str> {
        self.authorization().map(|d| d.principal.as_str())
    }

    pub fn is_violation(&self) -> bool {
        matches!(self.payload, EventPayload::SecurityViolation(_))
    }

    /// Whether this is an authorization decision (not a derived
    /// violation) with outcome DENY.
    pub fn is_denied_decision(&self) -> bool {
        matches!(&self.payload, EventPayload::AuthorizationDecision(d) if d.decision.is_deny())
    }

    pub fn threat_level(&self) -> Option<ThreatLevel> {
        self.violation().map(|v| v.threat_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{AuthorizationDecisionEvent, PolicySyncEvent};

    fn deny_details() -> AuthorizationDetails {
        AuthorizationDecisionEvent::new(Decision::Deny, "indices:data/write", "orders", "mallory")
            .with_response_time_ms(3.0)
            .into_parts()
            .1
    }

    #[test]
    fn payload_categories() {
        let record = EventRecord::new(
            EventPayload::AuthorizationDecision(deny_details()),
            "node-1",
            Utc::now(),
        );
        assert_eq!(record.category(), EventCategory::AuthorizationDecision);
        assert!(record.is_denied_decision());
        assert!(!record.is_violation());
        assert_eq!(record.response_time_ms(), Some(3.0));
    }

    #[test]
    fn unusable_response_times_are_untimed() {
        for ms in [f64::NAN, f64::INFINITY, -1.0] {
            let mut details = deny_details();
            details.response_time_ms = ms;
            let record =
                EventRecord::new(EventPayload::AuthorizationDecision(details), "node-1", Utc::now());
            assert_eq!(record.response_time_ms(), None);
        }
    }

    #[test]
    fn violation_accessors_reach_through() {
        let record = EventRecord::new(
            EventPayload::SecurityViolation(ViolationDetails {
                decision: deny_details(),
                violation_type: UNAUTHORIZED_ACCESS_ATTEMPT.into(),
                threat_level: ThreatLevel::Medium,
                source_event_id: Some(Uuid::new_v4()),
            }),
            "node-1",
            Utc::now(),
        );
        assert!(record.is_violation());
        assert!(!record.is_denied_decision());
        assert_eq!(record.resource(), Some("orders"));
        assert_eq!(record.threat_level(), Some(ThreatLevel::Medium));
        assert_eq!(record.response_time_ms(), None);
    }

    #[test]
    fn record_serializes_flat_with_event_type() {
        let record = EventRecord::new(
            EventPayload::SecurityViolation(ViolationDetails {
                decision: deny_details(),
                violation_type: UNAUTHORIZED_ACCESS_ATTEMPT.into(),
                threat_level: ThreatLevel::Medium,
                source_event_id: Some(Uuid::new_v4()),
            }),
            "node-1",
            Utc::now(),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["event_type"], "SECURITY_VIOLATION");
        assert_eq!(value["principal"], "mallory");
        assert_eq!(value["threat_level"], "MEDIUM");
        assert_eq!(value["origin_node"], "node-1");
        assert!(value.get("event_id").is_some());
    }

    #[test]
    fn policy_sync_record_roundtrip() {
        let (origin, details) = PolicySyncEvent {
            status: "SUCCESS".into(),
            policies_updated: vec!["p1".into(), "p2".into()],
            duration_ms: 42,
            source: "lock-server".into(),
            error_message: None,
            origin_node: "node-2".into(),
        }
        .into_parts();
        let record = EventRecord::new(EventPayload::PolicySync(details), origin, Utc::now());

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("error_message"));
        let restored: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
    }
}
