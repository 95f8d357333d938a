//! Threat classification and scoring policy.
//!
//! [`classify_threat`] runs at ingestion for every derived violation;
//! [`threat_score`] runs at report time over the retained window.

use std::fmt;

use authz_audit_types::{EventRecord, ThreatLevel};
use serde::{Deserialize, Serialize};

/// Score at or above which a report asks for immediate action.
pub const IMMEDIATE_ACTION_THRESHOLD: f64 = 0.7;

/// Classify a denied action by case-sensitive substring match.
/// First match wins: `admin`/`delete` → HIGH, `write`/`index` → MEDIUM.
pub fn classify_threat(action: &str) -> ThreatLevel {
    if action.contains("admin") || action.contains("delete") {
        ThreatLevel::High
    } else if action.contains("write") || action.contains("index") {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

/// Fraction of retained violations classified HIGH, in `0.0..=1.0`.
/// Zero when no violations are retained.
pub fn threat_score<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let (mut violations, mut high) = (0u64, 0u64);
    for level in records.into_iter().filter_map(EventRecord::threat_level) {
        violations += 1;
        if level == ThreatLevel::High {
            high += 1;
        }
    }
    if violations == 0 {
        0.0
    } else {
        high as f64 / violations as f64
    }
}

/// Report-level band for a threat score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatBand {
    Minimal,
    Low,
    Medium,
    High,
}

impl ThreatBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else if score >= 0.2 {
            Self::Low
        } else {
            Self::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "MINIMAL",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for ThreatBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_audit_types::{
        AuthorizationDecisionEvent, Decision, EventPayload, ViolationDetails,
        UNAUTHORIZED_ACCESS_ATTEMPT,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn violation(level: ThreatLevel) -> EventRecord {
        let (_, decision) =
            AuthorizationDecisionEvent::new(Decision::Deny, "a", "r", "p").into_parts();
        EventRecord::new(
            EventPayload::SecurityViolation(ViolationDetails {
                decision,
                violation_type: UNAUTHORIZED_ACCESS_ATTEMPT.into(),
                threat_level: level,
                source_event_id: Some(Uuid::new_v4()),
            }),
            "n",
            Utc::now(),
        )
    }

    #[test]
    fn classification_priority() {
        assert_eq!(classify_threat("cluster:admin/settings"), ThreatLevel::High);
        assert_eq!(classify_threat("indices:delete"), ThreatLevel::High);
        // "admin" outranks "write" when both appear
        assert_eq!(classify_threat("admin:write"), ThreatLevel::High);
        assert_eq!(classify_threat("indices:data/write"), ThreatLevel::Medium);
        assert_eq!(classify_threat("indices:create_index"), ThreatLevel::Medium);
        assert_eq!(classify_threat("indices:data/read"), ThreatLevel::Low);
    }

    #[test]
    fn classification_is_case_sensitive() {
        assert_eq!(classify_threat("ADMIN"), ThreatLevel::Low);
        assert_eq!(classify_threat("Delete"), ThreatLevel::Low);
    }

    #[test]
    fn score_is_high_fraction() {
        let records = vec![
            violation(ThreatLevel::High),
            violation(ThreatLevel::High),
            violation(ThreatLevel::Low),
            violation(ThreatLevel::Medium),
        ];
        assert!((threat_score(&records) - 0.5).abs() < 1e-9);
        assert_eq!(threat_score(std::iter::empty()), 0.0);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(ThreatBand::from_score(0.8), ThreatBand::High);
        assert_eq!(ThreatBand::from_score(0.79), ThreatBand::Medium);
        assert_eq!(ThreatBand::from_score(0.5), ThreatBand::Medium);
        assert_eq!(ThreatBand::from_score(0.2), ThreatBand::Low);
        assert_eq!(ThreatBand::from_score(0.19), ThreatBand::Minimal);
        assert_eq!(ThreatBand::from_score(0.0), ThreatBand::Minimal);
    }
}
