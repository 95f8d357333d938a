//! All-time event totals.
//!
//! These never move backwards when the log evicts; only an explicit
//! [`CumulativeCounters::reset`] (close or operational reset) zeroes them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct CumulativeCounters {
    total_events: AtomicU64,
    security_violations: AtomicU64,
    policy_evaluations: AtomicU64,
}

impl CumulativeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record appended to the log.
    pub fn record_event(&self) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_violation(&self) {
        self.security_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one authorization decision.
    pub fn record_policy_evaluation(&self) {
        self.policy_evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_events(&self) -> u64 {
        self.total_events.load(Ordering::Relaxed)
    }

    pub fn security_violations(&self) -> u64 {
        self.security_violations.load(Ordering::Relaxed)
    }

    pub fn policy_evaluations(&self) -> u64 {
        self.policy_evaluations.load(Ordering::Relaxed)
    }

    /// Each field is read independently; the three values are not a
    /// jointly atomic cut.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_events: self.total_events(),
            security_violations: self.security_violations(),
            policy_evaluations: self.policy_evaluations(),
        }
    }

    pub fn reset(&self) {
        self.total_events.store(0, Ordering::Relaxed);
        self.security_violations.store(0, Ordering::Relaxed);
        self.policy_evaluations.store(0, Ordering::Relaxed);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub total_events: u64,
    pub security_violations: u64,
    pub policy_evaluations: u64,
}

impl CounterSnapshot {
    /// Violations as a percentage of all events; 0 before any event.
    pub fn violation_rate(&self) -> f64 {
        if self.total_events == 0 {
            0.0
        } else {
            self.security_violations as f64 / self.total_events as f64 * 100.0
        }
    }

    /// Cumulative events divided by 24. A normalization, not a measured
    /// sliding-window rate.
    pub fn events_per_hour(&self) -> f64 {
        self.total_events as f64 / 24.0
    }
}
