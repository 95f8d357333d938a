//! Configuration for the telemetry core

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::log::MAX_CAPACITY;

/// Main telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Master switch; when false every ingestion call is a no-op
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Emit one debug line per ingested record
    #[serde(default = "default_true")]
    pub detailed_logging: bool,

    /// When false, performance samples are dropped
    #[serde(default = "default_true")]
    pub performance_tracking: bool,

    /// Retention window size
    #[serde(default = "default_max_capacity")]
    pub max_capacity: usize,

    #[serde(default)]
    pub drain: DrainConfig,

    /// Origin node stamped on events the subsystem records about itself
    #[serde(default = "default_node_id")]
    pub node_id: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed_logging: true,
            performance_tracking: true,
            max_capacity: MAX_CAPACITY,
            drain: DrainConfig::default(),
            node_id: default_node_id(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Background drainer schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_drain_interval")]
    pub interval_ms: u64,

    /// Records removed per cycle
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            interval_ms: default_drain_interval(),
            batch_size: default_batch_size(),
        }
    }
}

impl DrainConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_max_capacity() -> usize {
    MAX_CAPACITY
}

fn default_initial_delay() -> u64 {
    10_000
}

fn default_drain_interval() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    100
}

fn default_node_id() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AuditConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `AUDIT_`-prefixed environment variables (`AUDIT_DRAIN__BATCH_SIZE`).
    pub fn load(path: Option<&str>) -> AuditResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&AuditConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("AUDIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks only; types are already enforced by deserialization.
    pub fn validate(&self) -> AuditResult<()> {
        if self.max_capacity == 0 {
            return Err(AuditError::InvalidConfig(
                "max_capacity must be at least 1".into(),
            ));
        }
        if self.drain.interval_ms == 0 {
            return Err(AuditError::InvalidConfig(
                "drain.interval_ms must be greater than 0".into(),
            ));
        }
        if self.drain.batch_size == 0 {
            return Err(AuditError::InvalidConfig(
                "drain.batch_size must be greater than 0".into(),
            ));
        }
        if self.node_id.trim().is_empty() {
            return Err(AuditError::InvalidConfig("node_id must not be empty".into()));
        }
        Ok(())
    }

    /// Configuration with ingestion switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// The three flags that may change while the subsystem runs.
#[derive(Debug)]
pub struct RuntimeSettings {
    enabled: AtomicBool,
    detailed_logging: AtomicBool,
    performance_tracking: AtomicBool,
}

impl RuntimeSettings {
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            detailed_logging: AtomicBool::new(config.detailed_logging),
            performance_tracking: AtomicBool::new(config.performance_tracking),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn detailed_logging(&self) -> bool {
        self.detailed_logging.load(Ordering::Acquire)
    }

    pub fn performance_tracking(&self) -> bool {
        self.performance_tracking.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, value: bool) {
        self.enabled.store(value, Ordering::Release);
    }

    pub fn set_detailed_logging(&self, value: bool) {
        self.detailed_logging.store(value, Ordering::Release);
    }

    pub fn set_performance_tracking(&self, value: bool) {
        self.performance_tracking.store(value, Ordering::Release);
    }
}
