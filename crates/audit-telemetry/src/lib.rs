//! # authz-audit-telemetry
//!
//! Security event telemetry core for an access-control component.
//!
//! Producers report authorization decisions, policy syncs, configuration
//! changes, performance samples and system events. The core keeps a
//! bounded window of recent records, all-time counters and per-category
//! metrics, and builds analytics and export documents on demand.
//! Ingestion never fails and never waits on I/O.
//!
//! ## Architecture
//!
//! ```text
//!   producers ──record_*()──┐
//!                           ▼
//!                    ┌──────────────┐
//!                    │AuditTelemetry│
//!                    │  ┌────────┐  │
//!                    │  │EventLog│  │  ← bounded FIFO, evicts oldest
//!                    │  └────────┘  │
//!                    │  ┌────────┐  │
//!                    │  │Metrics │  │  ← per-category, cumulative
//!                    │  └────────┘  │
//!                    │  ┌────────┐  │
//!                    │  │Counters│  │  ← all-time totals
//!                    │  └────────┘  │
//!                    └──┬───────┬───┘
//!          drain_batch()│       │ snapshot()
//!                       ▼       ▼
//!                ┌─────────┐ ┌─────────────────────┐
//!                │ Drainer │ │ AnalyticsSynthesizer│ → AnalyticsReport
//!                │  → Sink │ │ ExportQuery         │ → AuditExport
//!                └─────────┘ └─────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - The log never holds more than its capacity (10,000 by default); a
//!   full log drops exactly its oldest record on append.
//! - Counters and metrics reflect everything ever ingested, regardless of
//!   eviction.
//! - Every DENY decision produces exactly one derived security violation.
//! - A drain-sink failure returns the batch to the log.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use authz_audit_telemetry::{AuditConfig, AuditTelemetry};
//! use authz_audit_types::{AuthorizationDecisionEvent, Decision};
//!
//! # async fn run() -> authz_audit_telemetry::AuditResult<()> {
//! let telemetry = AuditTelemetry::new(AuditConfig::default())?;
//! telemetry.start()?;
//!
//! telemetry.record_authorization_decision(
//!     AuthorizationDecisionEvent::new(Decision::Deny, "indices:admin/delete", "orders", "mallory")
//!         .with_response_time_ms(3.2),
//! );
//!
//! let report = telemetry.get_analytics_report();
//! println!("{}", report.summary());
//!
//! telemetry.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod analytics;
pub mod clock;
pub mod compliance;
pub mod config;
pub mod counters;
pub mod drain;
pub mod error;
pub mod export;
pub mod log;
pub mod logging;
pub mod metrics;
pub mod telemetry;
pub mod threat;

pub use analytics::{
    AnalyticsReport, AnalyticsSynthesizer, HourlyBucket, PerformanceSummary, RankedEntry, TOP_N,
    TREND_HOURS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use compliance::ComplianceStatus;
pub use config::{AuditConfig, DrainConfig, LoggingConfig, RuntimeSettings};
pub use counters::{CounterSnapshot, CumulativeCounters};
pub use drain::{
    CollectingSink, DrainSink, DrainStats, Drainer, DrainerState, RetainingSink,
};
pub use error::{AuditError, AuditResult, SinkError};
pub use export::{AuditExport, ExportQuery};
pub use log::{BoundedEventLog, RingBuffer, MAX_CAPACITY};
pub use logging::init_tracing;
pub use metrics::{CategoryMetrics, DecisionStats, MetricsRegistry, MetricsSnapshot};
pub use telemetry::{AuditTelemetry, AuditTelemetryBuilder, LifecycleState};
pub use threat::{classify_threat, threat_score, ThreatBand};
