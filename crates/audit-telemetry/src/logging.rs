//! Subscriber setup for hosts that do not install their own.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{AuditError, AuditResult};

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails instead of
/// panicking when a global subscriber is already set, so embedding hosts
/// that own logging can call this unconditionally.
pub fn init_tracing(config: &LoggingConfig) -> AuditResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| AuditError::Tracing(format!("invalid level `{}`: {e}", config.level)))?,
    };

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        subscriber.with(fmt_layer).try_init()
    } else {
        let fmt_layer = fmt::layer().with_target(true);
        subscriber.with(fmt_layer).try_init()
    };

    result.map_err(|e| AuditError::Tracing(e.to_string()))
}
