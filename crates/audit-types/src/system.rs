//! System event vocabulary.
//!
//! System events cover lifecycle transitions of the host component and
//! incident signals raised by collaborators. Each kind carries a fixed
//! severity so dashboards can filter without knowing every kind.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity attached to a system event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Kinds of system event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemEventKind {
    // ── Lifecycle ───────────────────────────────────────────────────
    PluginStarted,
    PluginStopped,
    ConfigurationUpdated,
    ConfigurationError,

    // ── Decision engine connectivity ────────────────────────────────
    ServiceUnavailable,
    ServiceRecovered,
    Timeout,

    // ── Policy management ───────────────────────────────────────────
    PolicyUpdate,
    PolicyDelete,
    PolicyValidationError,

    // ── Security incidents ──────────────────────────────────────────
    SuspiciousActivity,
    RepeatedAccessDenied,
    UnusualPatternDetected,

    // ── Performance ─────────────────────────────────────────────────
    HighLatencyDetected,
    CacheInvalidation,
    MetricsReport,

    /// Extension point for collaborators with their own vocabulary.
    Custom(String),
}

impl SystemEventKind {
    /// Fixed severity of this kind. Custom kinds are informational.
    pub fn severity(&self) -> Severity {
        match self {
            Self::PluginStarted
            | Self::PluginStopped
            | Self::ConfigurationUpdated
            | Self::ServiceRecovered
            | Self::PolicyUpdate
            | Self::MetricsReport
            | Self::Custom(_) => Severity::Info,
            Self::CacheInvalidation => Severity::Debug,
            Self::Timeout
            | Self::PolicyDelete
            | Self::RepeatedAccessDenied
            | Self::UnusualPatternDetected
            | Self::HighLatencyDetected => Severity::Warn,
            Self::ConfigurationError
            | Self::ServiceUnavailable
            | Self::PolicyValidationError
            | Self::SuspiciousActivity => Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warn
    }

    /// Whether this kind signals a security incident rather than an
    /// operational condition.
    pub fn is_security_incident(&self) -> bool {
        matches!(
            self,
            Self::SuspiciousActivity | Self::RepeatedAccessDenied | Self::UnusualPatternDetected
        )
    }
}

impl fmt::Display for SystemEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "custom:{}", name),
            other => {
                // Unit variants serialize to a bare string.
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(json.trim_matches('"'))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_follow_kind() {
        assert_eq!(SystemEventKind::PluginStarted.severity(), Severity::Info);
        assert_eq!(SystemEventKind::CacheInvalidation.severity(), Severity::Debug);
        assert!(SystemEventKind::ServiceUnavailable.is_error());
        assert!(SystemEventKind::HighLatencyDetected.is_warning());
        assert_eq!(
            SystemEventKind::Custom("rollout".into()).severity(),
            Severity::Info
        );
    }

    #[test]
    fn incident_classification() {
        assert!(SystemEventKind::SuspiciousActivity.is_security_incident());
        assert!(!SystemEventKind::Timeout.is_security_incident());
    }

    #[test]
    fn display_uses_wire_names() {
        assert_eq!(SystemEventKind::PluginStarted.to_string(), "PLUGIN_STARTED");
        assert_eq!(
            SystemEventKind::Custom("rollout".into()).to_string(),
            "custom:rollout"
        );
        assert!(Severity::Warn < Severity::Error);
    }
}
