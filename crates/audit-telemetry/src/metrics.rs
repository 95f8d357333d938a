//! Cumulative per-category metrics.
//!
//! The registry is updated on every appended record and is independent of
//! log retention: eviction never removes a contribution. Only
//! [`MetricsRegistry::reset`] zeroes it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use authz_audit_types::{Decision, EventCategory, EventRecord};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Add `value` to an `f64` stored as bits in an atomic.
fn add_f64(cell: &AtomicU64, value: f64) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f64::from_bits(current) + value).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

#[derive(Debug, Default)]
struct CategoryCell {
    count: AtomicU64,
    timed_count: AtomicU64,
    /// `f64` bits; 0u64 is 0.0.
    response_time_ms: AtomicU64,
}

impl CategoryCell {
    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.timed_count.store(0, Ordering::Relaxed);
        self.response_time_ms.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of one category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub category: EventCategory,
    pub count: u64,
    /// Records of this category that carried a response time.
    pub timed_count: u64,
    pub total_response_time_ms: f64,
}

impl CategoryMetrics {
    /// Mean over the records that carried a response time; 0 if none did.
    pub fn average_response_time_ms(&self) -> f64 {
        if self.timed_count == 0 {
            0.0
        } else {
            self.total_response_time_ms / self.timed_count as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub categories: Vec<CategoryMetrics>,
    pub decisions: DecisionStats,
}

impl MetricsSnapshot {
    pub fn get(&self, category: EventCategory) -> Option<&CategoryMetrics> {
        self.categories.iter().find(|m| m.category == category)
    }

    pub fn count(&self, category: EventCategory) -> u64 {
        self.get(category).map(|m| m.count).unwrap_or(0)
    }
}

/// Allow/deny tallies for authorization decisions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionStats {
    pub allowed: u64,
    pub denied: u64,
    pub by_action: BTreeMap<String, u64>,
    pub by_principal: BTreeMap<String, u64>,
}

impl DecisionStats {
    pub fn total(&self) -> u64 {
        self.allowed + self.denied
    }

    pub fn allow_rate(&self) -> f64 {
        Self::fraction(self.allowed, self.total())
    }

    pub fn deny_rate(&self) -> f64 {
        Self::fraction(self.denied, self.total())
    }

    pub fn top_action(&self) -> Option<(&str, u64)> {
        Self::top(&self.by_action)
    }

    pub fn top_principal(&self) -> Option<(&str, u64)> {
        Self::top(&self.by_principal)
    }

    pub fn is_deny_rate_high(&self, threshold: f64) -> bool {
        self.deny_rate() > threshold
    }

    fn fraction(part: u64, whole: u64) -> f64 {
        if whole == 0 {
            0.0
        } else {
            part as f64 / whole as f64
        }
    }

    // BTreeMap iterates in key order, so keeping the first strictly
    // greater count picks the lexicographically smallest key on ties.
    fn top(counts: &BTreeMap<String, u64>) -> Option<(&str, u64)> {
        let mut best: Option<(&str, u64)> = None;
        for (key, &count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((key.as_str(), count));
            }
        }
        best
    }
}

/// Shared, lock-free-on-the-hot-path metrics registry.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    cells: [CategoryCell; EventCategory::ALL.len()],
    allowed: AtomicU64,
    denied: AtomicU64,
    by_action: DashMap<String, u64>,
    by_principal: DashMap<String, u64>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a category's count and, when present, its response-time
    /// sum. A negative or non-finite time counts the record as untimed.
    pub fn record_for_category(&self, category: EventCategory, response_time_ms: Option<f64>) {
        let cell = &self.cells[category.index()];
        cell.count.fetch_add(1, Ordering::Relaxed);
        if let Some(ms) = response_time_ms.filter(|ms| ms.is_finite() && *ms >= 0.0) {
            cell.timed_count.fetch_add(1, Ordering::Relaxed);
            add_f64(&cell.response_time_ms, ms);
        }
    }

    /// Update everything a record contributes: its category cell and, for
    /// authorization decisions, the decision tallies.
    pub fn observe(&self, record: &EventRecord) {
        self.record_for_category(record.category(), record.response_time_ms());

        if record.category() != EventCategory::AuthorizationDecision {
            return;
        }
        if let Some(details) = record.authorization() {
            match details.decision {
                Decision::Allow => self.allowed.fetch_add(1, Ordering::Relaxed),
                Decision::Deny => self.denied.fetch_add(1, Ordering::Relaxed),
            };
            *self.by_action.entry(details.action.clone()).or_insert(0) += 1;
            *self
                .by_principal
                .entry(details.principal.clone())
                .or_insert(0) += 1;
        }
    }

    pub fn category(&self, category: EventCategory) -> CategoryMetrics {
        let cell = &self.cells[category.index()];
        CategoryMetrics {
            category,
            count: cell.count.load(Ordering::Relaxed),
            timed_count: cell.timed_count.load(Ordering::Relaxed),
            total_response_time_ms: f64::from_bits(cell.response_time_ms.load(Ordering::Relaxed)),
        }
    }

    pub fn decision_stats(&self) -> DecisionStats {
        DecisionStats {
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            by_action: self
                .by_action
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
            by_principal: self
                .by_principal
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            categories: EventCategory::ALL
                .iter()
                .map(|c| self.category(*c))
                .collect(),
            decisions: self.decision_stats(),
        }
    }

    /// Zero everything. Operational / test use only.
    pub fn reset(&self) {
        for cell in &self.cells {
            cell.reset();
        }
        self.allowed.store(0, Ordering::Relaxed);
        self.denied.store(0, Ordering::Relaxed);
        self.by_action.clear();
        self.by_principal.clear();
    }
}
