//! Closed vocabularies shared by every event record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// The six categories an event record can belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    /// An ALLOW/DENY outcome from the external policy engine.
    AuthorizationDecision,
    /// Derived from a DENY decision; never issued directly by producers.
    SecurityViolation,
    /// Outcome of a policy store synchronization.
    PolicySync,
    /// A configuration key changed value.
    ConfigurationChange,
    /// Periodic resource/performance sample.
    PerformanceSample,
    /// Free-form lifecycle or incident event.
    SystemEvent,
}

impl EventCategory {
    /// Every category, in declaration order.
    pub const ALL: [EventCategory; 6] = [
        Self::AuthorizationDecision,
        Self::SecurityViolation,
        Self::PolicySync,
        Self::ConfigurationChange,
        Self::PerformanceSample,
        Self::SystemEvent,
    ];

    /// Wire name, e.g. `AUTHORIZATION_DECISION`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationDecision => "AUTHORIZATION_DECISION",
            Self::SecurityViolation => "SECURITY_VIOLATION",
            Self::PolicySync => "POLICY_SYNC",
            Self::ConfigurationChange => "CONFIGURATION_CHANGE",
            Self::PerformanceSample => "PERFORMANCE_SAMPLE",
            Self::SystemEvent => "SYSTEM_EVENT",
        }
    }

    /// Dense index into `ALL`, used for fixed-size per-category tables.
    pub fn index(&self) -> usize {
        match self {
            Self::AuthorizationDecision => 0,
            Self::SecurityViolation => 1,
            Self::PolicySync => 2,
            Self::ConfigurationChange => 3,
            Self::PerformanceSample => 4,
            Self::SystemEvent => 5,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = TypesError;

    /// Case-insensitive parse of the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| TypesError::UnknownCategory(s.to_string()))
    }
}

/// Binary outcome of an authorization evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
        }
    }
}

impl From<bool> for Decision {
    /// `true` means the request was allowed.
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALLOW" => Ok(Self::Allow),
            "DENY" => Ok(Self::Deny),
            _ => Err(TypesError::UnknownDecision(s.to_string())),
        }
    }
}

/// Threat level attached to a security violation.
///
/// Ordered `Low < Medium < High`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatLevel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(TypesError::UnknownThreatLevel(s.to_string())),
        }
    }
}
