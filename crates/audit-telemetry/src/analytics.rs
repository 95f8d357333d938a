//! On-demand analytics over the retained window.
//!
//! [`AnalyticsSynthesizer::synthesize`] is a pure function of its inputs:
//! the same log contents, metrics, counters and `now` always yield the
//! same [`AnalyticsReport`]. Nothing is cached.

use std::collections::HashMap;
use std::sync::Arc;

use authz_audit_types::EventRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::compliance::ComplianceStatus;
use crate::counters::CounterSnapshot;
use crate::metrics::MetricsSnapshot;
use crate::threat::{threat_score, ThreatBand, IMMEDIATE_ACTION_THRESHOLD};

/// Length of every ranking in a report.
pub const TOP_N: usize = 10;

/// Number of one-hour trend buckets.
pub const TREND_HOURS: usize = 24;

const HOUR_NANOS: i64 = 3_600_000_000_000;

/// One entry of a top-N ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: u64,
}

/// Count of retained records in one hour-long bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyBucket {
    /// Start hour in UTC, `HH:00`.
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Mean over retained records that carry a response time.
    pub average_response_time_ms: f64,
    /// Cumulative total divided by 24; an approximation, not a windowed rate.
    pub total_events_per_hour: f64,
    /// Percentage of all-time events that were violations.
    pub security_violation_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub totals: CounterSnapshot,
    pub retained_events: usize,
    pub threat_score: f64,
    pub threat_level: ThreatBand,
    pub top_violated_resources: Vec<RankedEntry>,
    pub top_denied_actions: Vec<RankedEntry>,
    /// Index `i` covers `[now - (i+1)h, now - i·h)`; bucket 0 also
    /// includes `now` itself.
    pub hourly_trends: Vec<HourlyBucket>,
    pub performance: PerformanceSummary,
    pub compliance: ComplianceStatus,
    pub metrics: Option<MetricsSnapshot>,
}

impl AnalyticsReport {
    /// Zero-valued report, returned while the subsystem is disabled.
    pub fn empty(now: DateTime<Utc>) -> Self {
        AnalyticsSynthesizer::new().synthesize(&[], None, CounterSnapshot::default(), now)
    }

    pub fn threat_level(&self) -> ThreatBand {
        self.threat_level
    }

    pub fn requires_immediate_action(&self) -> bool {
        self.threat_score >= IMMEDIATE_ACTION_THRESHOLD
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Threat Level: {} (Score: {:.2}), Events: {}, Violations: {} ({:.2}%), Avg Response: {:.2}ms, Retained: {}",
            self.threat_level,
            self.threat_score,
            self.totals.total_events,
            self.totals.security_violations,
            self.performance.security_violation_rate,
            self.performance.average_response_time_ms,
            self.retained_events,
        );
        if self.requires_immediate_action() {
            summary.push_str(" - IMMEDIATE ACTION REQUIRED");
        }
        summary
    }
}

/// Builds reports from the current shared state.
#[derive(Clone, Debug)]
pub struct AnalyticsSynthesizer {
    top_n: usize,
}

impl Default for AnalyticsSynthesizer {
    fn default() -> Self {
        Self { top_n: TOP_N }
    }
}

impl AnalyticsSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `records` must be oldest first; ranking ties resolve by that order.
    pub fn synthesize(
        &self,
        records: &[Arc<EventRecord>],
        metrics: Option<MetricsSnapshot>,
        totals: CounterSnapshot,
        now: DateTime<Utc>,
    ) -> AnalyticsReport {
        let score = threat_score(records.iter().map(|r| r.as_ref()));

        AnalyticsReport {
            generated_at: now,
            totals,
            retained_events: records.len(),
            threat_score: score,
            threat_level: ThreatBand::from_score(score),
            top_violated_resources: self.rank(
                records
                    .iter()
                    .filter(|r| r.is_violation())
                    .filter_map(|r| r.resource()),
            ),
            top_denied_actions: self.rank(
                records
                    .iter()
                    .filter(|r| r.is_denied_decision())
                    .filter_map(|r| r.action()),
            ),
            hourly_trends: hourly_trends(records, now),
            performance: PerformanceSummary {
                average_response_time_ms: mean_response_time(records),
                total_events_per_hour: totals.events_per_hour(),
                security_violation_rate: totals.violation_rate(),
            },
            compliance: ComplianceStatus::evaluate(&totals, now),
            metrics,
        }
    }

    /// Count keys, sort by count descending, keep first-seen order on ties.
    fn rank<'a, I>(&self, keys: I) -> Vec<RankedEntry>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut position: HashMap<&'a str, usize> = HashMap::new();
        let mut entries: Vec<RankedEntry> = Vec::new();
        for key in keys {
            match position.get(key) {
                Some(&i) => entries[i].count += 1,
                None => {
                    position.insert(key, entries.len());
                    entries.push(RankedEntry {
                        key: key.to_string(),
                        count: 1,
                    });
                }
            }
        }
        // sort_by is stable
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries.truncate(self.top_n);
        entries
    }
}

fn mean_response_time(records: &[Arc<EventRecord>]) -> f64 {
    let (sum, n) = records
        .iter()
        .filter_map(|r| r.response_time_ms())
        .fold((0.0, 0u64), |(sum, n), ms| (sum + ms, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Bucket index for a record `age` before `now`, if within the trend span.
fn bucket_index(age: Duration) -> Option<usize> {
    let nanos = age.num_nanoseconds()?;
    if nanos < 0 {
        return None;
    }
    let index = if nanos == 0 {
        0
    } else {
        ((nanos - 1) / HOUR_NANOS) as usize
    };
    (index < TREND_HOURS).then_some(index)
}

fn hourly_trends(records: &[Arc<EventRecord>], now: DateTime<Utc>) -> Vec<HourlyBucket> {
    let mut counts = [0u64; TREND_HOURS];
    for record in records {
        if let Some(i) = bucket_index(now - record.timestamp) {
            counts[i] += 1;
        }
    }
    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let end = now - Duration::hours(i as i64);
            let start = end - Duration::hours(1);
            HourlyBucket {
                label: start.format("%H:00").to_string(),
                start,
                end,
                count,
            }
        })
        .collect()
}
