//! Event inputs handed over by collaborators.
//!
//! These are the structured records the request-interception layer, the
//! policy-sync collaborator, the configuration collaborator and the
//! performance sampler construct. They carry no timestamp: the telemetry
//! core stamps every record at ingestion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::Decision;
use crate::record::{
    AuthorizationDetails, ConfigurationChangeDetails, PerformanceDetails, PolicySyncDetails,
    SystemEventDetails,
};
use crate::system::SystemEventKind;

/// Origin used when a collaborator does not name its node.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// An authorization decision reported by the request-interception layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDecisionEvent {
    pub decision: Decision,
    pub action: String,
    pub resource: String,
    pub principal: String,
    #[serde(default)]
    pub policies_evaluated: Vec<String>,
    #[serde(default)]
    pub response_time_ms: f64,
    #[serde(default)]
    pub reason: String,
    /// Opaque token claims; kept sorted for stable serialization.
    #[serde(default)]
    pub token_context: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub client_address: String,
    #[serde(default)]
    pub client_agent: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default = "unknown_origin")]
    pub origin_node: String,
}

impl AuthorizationDecisionEvent {
    /// Start a decision event with the four identifying fields; the rest
    /// default to empty and can be filled with the `with_*` methods.
    pub fn new(
        decision: Decision,
        action: impl Into<String>,
        resource: impl Into<String>,
        principal: impl Into<String>,
    ) -> Self {
        Self {
            decision,
            action: action.into(),
            resource: resource.into(),
            principal: principal.into(),
            policies_evaluated: Vec::new(),
            response_time_ms: 0.0,
            reason: String::new(),
            token_context: BTreeMap::new(),
            client_address: String::new(),
            client_agent: String::new(),
            request_id: String::new(),
            session_id: String::new(),
            origin_node: unknown_origin(),
        }
    }

    pub fn with_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies_evaluated = policies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_response_time_ms(mut self, ms: f64) -> Self {
        self.response_time_ms = ms;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Add one token claim. Values that fail to serialize are dropped.
    pub fn with_token_claim(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.token_context.insert(key.into(), v);
        }
        self
    }

    pub fn with_client(mut self, address: impl Into<String>, agent: impl Into<String>) -> Self {
        self.client_address = address.into();
        self.client_agent = agent.into();
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = id.into();
        self
    }

    pub fn with_origin_node(mut self, node: impl Into<String>) -> Self {
        self.origin_node = node.into();
        self
    }

    /// Split into the origin node and the record body.
    pub fn into_parts(self) -> (String, AuthorizationDetails) {
        let details = AuthorizationDetails {
            decision: self.decision,
            action: self.action,
            resource: self.resource,
            principal: self.principal,
            policies_evaluated: self.policies_evaluated,
            response_time_ms: self.response_time_ms,
            reason: self.reason,
            token_context: self.token_context,
            client_address: self.client_address,
            client_agent: self.client_agent,
            request_id: self.request_id,
            session_id: self.session_id,
        };
        (self.origin_node, details)
    }
}

/// Outcome of a policy store synchronization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicySyncEvent {
    pub status: String,
    #[serde(default)]
    pub policies_updated: Vec<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default = "unknown_origin")]
    pub origin_node: String,
}

impl PolicySyncEvent {
    pub fn into_parts(self) -> (String, PolicySyncDetails) {
        let details = PolicySyncDetails {
            status: self.status,
            policies_updated: self.policies_updated,
            duration_ms: self.duration_ms,
            source: self.source,
            error_message: self.error_message,
        };
        (self.origin_node, details)
    }
}

/// A configuration key changing value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationChangeEvent {
    pub key: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
    #[serde(default)]
    pub changed_by: Option<String>,
    #[serde(default = "unknown_origin")]
    pub origin_node: String,
}

impl ConfigurationChangeEvent {
    pub fn into_parts(self) -> (String, ConfigurationChangeDetails) {
        let details = ConfigurationChangeDetails {
            key: self.key,
            old_value: self.old_value,
            new_value: self.new_value,
            changed_by: self.changed_by,
        };
        (self.origin_node, details)
    }
}

/// A resource/performance sample from the host process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEvent {
    pub response_time_ms: f64,
    pub memory_usage_mb: f64,
    pub cpu_usage_percent: f64,
    pub active_connections: u32,
    pub queue_depth: u32,
    pub throughput_per_second: f64,
    #[serde(default = "unknown_origin")]
    pub origin_node: String,
}

impl PerformanceEvent {
    pub fn into_parts(self) -> (String, PerformanceDetails) {
        let details = PerformanceDetails {
            response_time_ms: self.response_time_ms,
            memory_usage_mb: self.memory_usage_mb,
            cpu_usage_percent: self.cpu_usage_percent,
            active_connections: self.active_connections,
            queue_depth: self.queue_depth,
            throughput_per_second: self.throughput_per_second,
        };
        (self.origin_node, details)
    }
}

/// A lifecycle or incident signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub kind: SystemEventKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    #[serde(default = "unknown_origin")]
    pub origin_node: String,
}

impl SystemEvent {
    pub fn new(kind: SystemEventKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            context: BTreeMap::new(),
            origin_node: unknown_origin(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn with_origin_node(mut self, node: impl Into<String>) -> Self {
        self.origin_node = node.into();
        self
    }

    pub fn into_parts(self) -> (String, SystemEventDetails) {
        let severity = self.kind.severity();
        let details = SystemEventDetails {
            kind: self.kind,
            severity,
            description: self.description,
            context: self.context,
        };
        (self.origin_node, details)
    }
}

fn unknown_origin() -> String {
    UNKNOWN_ORIGIN.to_string()
}
