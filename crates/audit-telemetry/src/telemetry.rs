//! The telemetry facade.
//!
//! [`AuditTelemetry`] owns one instance of every piece of shared state
//! (log, metrics, counters, drainer). Independent instances never
//! interfere, so tests and multi-tenant hosts can hold several.

use std::sync::Arc;

use authz_audit_types::{
    AuthorizationDecisionEvent, AuthorizationDetails, ConfigurationChangeEvent, EventCategory,
    EventPayload, EventRecord, PerformanceEvent, PolicySyncEvent, Severity, SystemEvent,
    SystemEventKind, ThreatLevel, ViolationDetails, UNAUTHORIZED_ACCESS_ATTEMPT,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analytics::{AnalyticsReport, AnalyticsSynthesizer};
use crate::clock::{Clock, SystemClock};
use crate::config::{AuditConfig, RuntimeSettings};
use crate::counters::{CounterSnapshot, CumulativeCounters};
use crate::drain::{DrainSink, DrainStats, Drainer, DrainerState, RetainingSink};
use crate::error::{AuditError, AuditResult};
use crate::export::{AuditExport, ExportQuery};
use crate::log::BoundedEventLog;
use crate::metrics::{DecisionStats, MetricsRegistry, MetricsSnapshot};
use crate::threat::classify_threat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Initialized,
    Started,
    /// The drainer is being stopped; `start` is rejected until it settles.
    Stopping,
    Stopped,
    /// Closing in progress; ends in `Closed`.
    Closing,
    Closed,
}

/// Builder for [`AuditTelemetry`].
pub struct AuditTelemetryBuilder {
    config: AuditConfig,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn DrainSink>>,
}

impl AuditTelemetryBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the default retaining sink.
    pub fn sink(mut self, sink: Arc<dyn DrainSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> AuditResult<AuditTelemetry> {
        self.config.validate()?;
        let log = Arc::new(BoundedEventLog::new(self.config.max_capacity));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(RetainingSink::new(Arc::clone(&log))));
        let drainer = Drainer::new(Arc::clone(&log), sink, self.config.drain.clone());

        Ok(AuditTelemetry {
            settings: RuntimeSettings::from_config(&self.config),
            config: self.config,
            clock: self.clock,
            log,
            metrics: MetricsRegistry::new(),
            counters: CumulativeCounters::new(),
            synthesizer: AnalyticsSynthesizer::new(),
            drainer,
            lifecycle: RwLock::new(LifecycleState::Initialized),
            transition: AsyncMutex::new(()),
        })
    }
}

/// Security event telemetry core.
///
/// Ingestion methods never fail and never block on I/O; read methods see
/// whatever the log holds at the moment they run.
pub struct AuditTelemetry {
    config: AuditConfig,
    settings: RuntimeSettings,
    clock: Arc<dyn Clock>,
    log: Arc<BoundedEventLog>,
    metrics: MetricsRegistry,
    counters: CumulativeCounters,
    synthesizer: AnalyticsSynthesizer,
    drainer: Drainer,
    lifecycle: RwLock<LifecycleState>,
    /// Serializes `stop` and `close` across their await points.
    transition: AsyncMutex<()>,
}

impl AuditTelemetry {
    pub fn builder(config: AuditConfig) -> AuditTelemetryBuilder {
        AuditTelemetryBuilder {
            config,
            clock: Arc::new(SystemClock),
            sink: None,
        }
    }

    /// Construct with the system clock and the retaining sink.
    pub fn new(config: AuditConfig) -> AuditResult<Self> {
        Self::builder(config).build()
    }

    // ── Ingestion ───────────────────────────────────────────────────────

    /// Record an authorization decision. A DENY also records one derived
    /// security violation.
    pub fn record_authorization_decision(&self, event: AuthorizationDecisionEvent) {
        if !self.settings.enabled() {
            return;
        }
        let (origin, details) = event.into_parts();
        self.counters.record_policy_evaluation();

        let derived = details.decision.is_deny().then(|| details.clone());
        let decision = self.ingest(EventPayload::AuthorizationDecision(details), origin);

        if let Some(details) = derived {
            self.ingest_violation(details, Some(decision.id), decision.origin_node.clone());
        }
    }

    /// Record a security violation reported directly rather than derived
    /// from a decision.
    pub fn record_violation(&self, event: AuthorizationDecisionEvent) {
        if !self.settings.enabled() {
            return;
        }
        let (origin, details) = event.into_parts();
        self.ingest_violation(details, None, origin);
    }

    pub fn record_policy_sync(&self, event: PolicySyncEvent) {
        if !self.settings.enabled() {
            return;
        }
        let (origin, details) = event.into_parts();
        if let Some(message) = &details.error_message {
            warn!(source = %details.source, status = %details.status, error = %message, "Policy sync reported an error");
        }
        self.ingest(EventPayload::PolicySync(details), origin);
    }

    pub fn record_configuration_change(&self, event: ConfigurationChangeEvent) {
        if !self.settings.enabled() {
            return;
        }
        let (origin, details) = event.into_parts();
        self.ingest(EventPayload::ConfigurationChange(details), origin);
    }

    /// Dropped while performance tracking is off.
    pub fn record_performance_sample(&self, event: PerformanceEvent) {
        if !self.settings.enabled() || !self.settings.performance_tracking() {
            return;
        }
        let (origin, details) = event.into_parts();
        self.ingest(EventPayload::PerformanceSample(details), origin);
    }

    pub fn record_system_event(&self, event: SystemEvent) {
        if !self.settings.enabled() {
            return;
        }
        let (origin, details) = event.into_parts();
        match details.severity {
            Severity::Error => {
                error!(kind = %details.kind, origin = %origin, "{}", details.description)
            }
            Severity::Warn => {
                warn!(kind = %details.kind, origin = %origin, "{}", details.description)
            }
            Severity::Info | Severity::Debug => {}
        }
        self.ingest(EventPayload::SystemEvent(details), origin);
    }

    fn ingest_violation(&self, details: AuthorizationDetails, source: Option<Uuid>, origin: String) {
        let threat_level = classify_threat(&details.action);
        if threat_level == ThreatLevel::High {
            warn!(
                principal = %details.principal,
                action = %details.action,
                resource = %details.resource,
                "High-threat security violation"
            );
        }
        self.ingest(
            EventPayload::SecurityViolation(ViolationDetails {
                decision: details,
                violation_type: UNAUTHORIZED_ACCESS_ATTEMPT.to_string(),
                threat_level,
                source_event_id: source,
            }),
            origin,
        );
        self.counters.record_violation();
    }

    /// Append a producer record and count it.
    fn ingest(&self, payload: EventPayload, origin: String) -> Arc<EventRecord> {
        let record = self.append(payload, origin);
        self.metrics.observe(&record);
        self.counters.record_event();
        record
    }

    /// Log a record the subsystem writes about itself. It is retained and
    /// drained like any other record but stays out of counters and metrics.
    fn record_own_event(&self, event: SystemEvent) {
        if !self.settings.enabled() {
            return;
        }
        let (origin, details) = event.into_parts();
        self.append(EventPayload::SystemEvent(details), origin);
    }

    fn append(&self, payload: EventPayload, origin: String) -> Arc<EventRecord> {
        let record = Arc::new(EventRecord::new(payload, origin, self.clock.now()));
        self.log.append(Arc::clone(&record));

        if self.settings.detailed_logging() {
            debug!(
                event_id = %record.id,
                category = %record.category(),
                origin = %record.origin_node,
                "Recorded audit event"
            );
        }
        record
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Up to `limit` retained records, newest first.
    pub fn get_recent_events(&self, limit: usize) -> Vec<Arc<EventRecord>> {
        self.log.recent(limit)
    }

    /// Fresh report over the current window. Zero-valued while disabled.
    pub fn get_analytics_report(&self) -> AnalyticsReport {
        let now = self.clock.now();
        if !self.settings.enabled() {
            return AnalyticsReport::empty(now);
        }
        self.synthesizer.synthesize(
            &self.log.snapshot(),
            Some(self.metrics.snapshot()),
            self.counters.snapshot(),
            now,
        )
    }

    /// Export retained records with `timestamp ∈ [from, to)`, optionally of
    /// one category.
    pub fn export_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        category: Option<EventCategory>,
    ) -> AuditResult<AuditExport> {
        let query = ExportQuery::new(from, to, category)?;
        Ok(self.export(&query))
    }

    pub fn export(&self, query: &ExportQuery) -> AuditExport {
        AuditExport::build(
            query,
            &self.log.snapshot(),
            self.counters.snapshot(),
            self.clock.now(),
        )
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn decision_stats(&self) -> DecisionStats {
        self.metrics.decision_stats()
    }

    pub fn retained_events(&self) -> usize {
        self.log.len()
    }

    pub fn log(&self) -> &Arc<BoundedEventLog> {
        &self.log
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled()
    }

    pub fn is_detailed_logging(&self) -> bool {
        self.settings.detailed_logging()
    }

    pub fn is_performance_tracking(&self) -> bool {
        self.settings.performance_tracking()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.settings.set_enabled(enabled);
        info!(enabled, "Audit ingestion toggled");
    }

    pub fn set_detailed_logging(&self, detailed: bool) {
        self.settings.set_detailed_logging(detailed);
    }

    pub fn set_performance_tracking(&self, tracking: bool) {
        self.settings.set_performance_tracking(tracking);
    }

    /// Apply all three flags and record the change as a system event.
    pub fn update_settings(&self, enabled: bool, detailed_logging: bool, performance_tracking: bool) {
        self.settings.set_enabled(enabled);
        self.settings.set_detailed_logging(detailed_logging);
        self.settings.set_performance_tracking(performance_tracking);
        info!(enabled, detailed_logging, performance_tracking, "Audit settings updated");

        self.record_own_event(
            SystemEvent::new(SystemEventKind::ConfigurationUpdated, "Audit settings updated")
                .with_context("enabled", enabled)
                .with_context("detailed_logging", detailed_logging)
                .with_context("performance_tracking", performance_tracking)
                .with_origin_node(self.config.node_id.clone()),
        );
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    pub fn lifecycle_state(&self) -> LifecycleState {
        *self.lifecycle.read()
    }

    pub fn drainer_state(&self) -> DrainerState {
        self.drainer.state()
    }

    pub fn drain_stats(&self) -> DrainStats {
        self.drainer.stats()
    }

    /// Run one drain cycle now.
    pub async fn drain_now(&self) -> usize {
        self.drainer.drain_now().await
    }

    /// Start the drainer (only when enabled). Must run inside a tokio
    /// runtime. Restarting a stopped instance is allowed; a closed one
    /// is an error, as is starting while a stop or close is in flight.
    pub fn start(&self) -> AuditResult<()> {
        {
            let mut state = self.lifecycle.write();
            match *state {
                LifecycleState::Closed | LifecycleState::Closing => {
                    return Err(AuditError::Lifecycle(
                        "cannot start a closed audit subsystem".into(),
                    ))
                }
                LifecycleState::Stopping => {
                    return Err(AuditError::Lifecycle(
                        "audit subsystem is still stopping".into(),
                    ))
                }
                LifecycleState::Started => return Ok(()),
                LifecycleState::Initialized | LifecycleState::Stopped => {}
            }
            if self.settings.enabled() {
                self.drainer.start()?;
            }
            *state = LifecycleState::Started;
        }

        info!(
            node = %self.config.node_id,
            enabled = self.settings.enabled(),
            capacity = self.log.capacity(),
            "Audit subsystem started"
        );
        self.record_own_event(
            SystemEvent::new(SystemEventKind::PluginStarted, "Audit subsystem started")
                .with_origin_node(self.config.node_id.clone()),
        );
        Ok(())
    }

    /// Cancel the drain timer and wait for any in-flight batch.
    pub async fn stop(&self) {
        let _transition = self.transition.lock().await;
        if self
            .claim(LifecycleState::Stopping, |s| s == LifecycleState::Started)
            .is_none()
        {
            return;
        }
        self.stop_drainer().await;
        *self.lifecycle.write() = LifecycleState::Stopped;
    }

    /// Stop if needed, then clear the log, metrics and counters.
    pub async fn close(&self) {
        let _transition = self.transition.lock().await;
        let Some(previous) = self.claim(LifecycleState::Closing, |s| s != LifecycleState::Closed)
        else {
            return;
        };
        if previous == LifecycleState::Started {
            self.stop_drainer().await;
        }
        self.log.clear();
        self.metrics.reset();
        self.counters.reset();
        *self.lifecycle.write() = LifecycleState::Closed;
        info!(node = %self.config.node_id, "Audit subsystem closed");
    }

    /// Move to `next` if the current state passes `allowed`, returning the
    /// state it replaced. Only called with `transition` held, so the claim
    /// cannot be lost before the matching final state is written.
    fn claim(
        &self,
        next: LifecycleState,
        allowed: impl Fn(LifecycleState) -> bool,
    ) -> Option<LifecycleState> {
        let mut state = self.lifecycle.write();
        let previous = *state;
        if !allowed(previous) {
            return None;
        }
        *state = next;
        Some(previous)
    }

    async fn stop_drainer(&self) {
        self.drainer.stop().await;
        self.record_own_event(
            SystemEvent::new(SystemEventKind::PluginStopped, "Audit subsystem stopped")
                .with_origin_node(self.config.node_id.clone()),
        );
        info!(node = %self.config.node_id, "Audit subsystem stopped");
    }

    /// Zero metrics and counters without touching the log.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
        self.counters.reset();
    }
}
