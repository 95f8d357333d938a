//! Compliance posture derived from the cumulative counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::counters::CounterSnapshot;

/// Violation rate (percent) below which SOX is reported compliant.
pub const SOX_VIOLATION_RATE_LIMIT: f64 = 5.0;

/// Placeholder: no GDPR criteria are evaluated. Reported as a constant
/// until real criteria exist.
pub const GDPR_COMPLIANT_PLACEHOLDER: bool = true;

/// Placeholder: no ISO 27001 criteria are evaluated.
pub const ISO27001_COMPLIANT_PLACEHOLDER: bool = true;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplianceStatus {
    pub audit_trail_complete: bool,
    pub sox_compliant: bool,
    pub gdpr_compliant: bool,
    pub iso27001_compliant: bool,
    /// Percentage of all-time events that were security violations.
    pub violation_rate: f64,
    pub last_audit_time: DateTime<Utc>,
}

impl ComplianceStatus {
    pub fn evaluate(counters: &CounterSnapshot, now: DateTime<Utc>) -> Self {
        let violation_rate = counters.violation_rate();
        Self {
            audit_trail_complete: counters.total_events > 0,
            sox_compliant: violation_rate < SOX_VIOLATION_RATE_LIMIT,
            gdpr_compliant: GDPR_COMPLIANT_PLACEHOLDER,
            iso27001_compliant: ISO27001_COMPLIANT_PLACEHOLDER,
            violation_rate,
            last_audit_time: now,
        }
    }
}
