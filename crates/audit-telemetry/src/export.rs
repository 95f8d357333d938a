//! Export of retained records for compliance reporting.

use std::sync::Arc;

use authz_audit_types::{EventCategory, EventRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compliance::ComplianceStatus;
use crate::counters::CounterSnapshot;
use crate::error::{AuditError, AuditResult};

/// Event type value meaning "no category filter".
pub const ALL_EVENT_TYPES: &str = "ALL";

/// Validated export filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportQuery {
    /// Inclusive.
    from: DateTime<Utc>,
    /// Exclusive.
    to: DateTime<Utc>,
    category: Option<EventCategory>,
}

impl ExportQuery {
    /// Rejects `to < from`. An equal pair is a valid, empty range.
    pub fn new(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        category: Option<EventCategory>,
    ) -> AuditResult<Self> {
        if to < from {
            return Err(AuditError::InvalidTimeRange { from, to });
        }
        Ok(Self { from, to, category })
    }

    /// Build a query from collaborator-supplied strings.
    ///
    /// Timestamps are RFC 3339. A missing `from` means the Unix epoch, a
    /// missing `to` means `now`. `event_type` is a case-insensitive wire
    /// name; missing or `ALL` means every category.
    pub fn parse(
        from: Option<&str>,
        to: Option<&str>,
        event_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuditResult<Self> {
        let from = match from {
            Some(s) => parse_timestamp("from", s)?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        let to = match to {
            Some(s) => parse_timestamp("to", s)?,
            None => now,
        };
        let category = match event_type.map(str::trim) {
            None => None,
            Some(s) if s.eq_ignore_ascii_case(ALL_EVENT_TYPES) => None,
            Some(s) => Some(
                s.parse::<EventCategory>()
                    .map_err(|_| AuditError::UnknownEventType(s.to_string()))?,
            ),
        };
        Self::new(from, to, category)
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn category(&self) -> Option<EventCategory> {
        self.category
    }

    pub fn matches(&self, record: &EventRecord) -> bool {
        if record.timestamp < self.from || record.timestamp >= self.to {
            return false;
        }
        if let Some(category) = self.category {
            if record.category() != category {
                return false;
            }
        }
        true
    }

    fn event_type_label(&self) -> String {
        self.category
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| ALL_EVENT_TYPES.to_string())
    }
}

fn parse_timestamp(field: &'static str, value: &str) -> AuditResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AuditError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

/// Export document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditExport {
    pub export_timestamp: DateTime<Utc>,
    pub from_time: DateTime<Utc>,
    pub to_time: DateTime<Utc>,
    pub event_type: String,
    /// Matching records in retention order, already in their wire form.
    pub audit_events: Vec<serde_json::Value>,
    pub total_events: u64,
    pub security_violations: u64,
    pub policy_evaluations: u64,
    pub compliance_status: ComplianceStatus,
}

impl AuditExport {
    /// Filter `records` by `query` and assemble the document. Records that
    /// fail to serialize are logged and skipped.
    pub fn build(
        query: &ExportQuery,
        records: &[Arc<EventRecord>],
        totals: CounterSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        let matching = records.iter().map(|r| r.as_ref()).filter(|r| query.matches(r));
        Self {
            export_timestamp: now,
            from_time: query.from,
            to_time: query.to,
            event_type: query.event_type_label(),
            audit_events: serialize_skipping_failures(matching),
            total_events: totals.total_events,
            security_violations: totals.security_violations,
            policy_evaluations: totals.policy_evaluations,
            compliance_status: ComplianceStatus::evaluate(&totals, now),
        }
    }

    pub fn to_json_pretty(&self) -> AuditResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn serialize_skipping_failures<'a, T, I>(items: I) -> Vec<serde_json::Value>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .filter_map(|item| match serde_json::to_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping record that failed to serialize for export");
                None
            }
        })
        .collect()
}
