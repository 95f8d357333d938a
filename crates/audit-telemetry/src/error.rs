use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the telemetry core.
///
/// Ingestion never returns these; they surface only on read paths
/// (export, analytics), lifecycle calls and configuration loading.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid time range: to ({to}) is before from ({from})")]
    InvalidTimeRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("invalid timestamp for `{field}`: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("configuration source error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

/// Error returned by a drain sink. Kept separate from [`AuditError`] so a
/// sink implementation does not need to know the core's error taxonomy.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Convenience type alias for telemetry results.
pub type AuditResult<T> = Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn error_display_messages() {
        let now = Utc::now();
        let e = AuditError::InvalidTimeRange {
            from: now,
            to: now - Duration::hours(1),
        };
        assert!(e.to_string().contains("before from"));

        let e = AuditError::UnknownEventType("LOGIN".into());
        assert_eq!(e.to_string(), "unknown event type: LOGIN");

        assert_eq!(SinkError::new("disk full").to_string(), "disk full");
    }

    #[test]
    fn serde_error_conversion() {
        let parse_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: AuditError = parse_err.into();
        assert!(matches!(err, AuditError::Serialization(_)));
    }

    #[test]
    fn result_type_works() {
        let ok: AuditResult<u32> = Ok(7);
        assert_eq!(ok.unwrap(), 7);

        let err: AuditResult<u32> = Err(AuditError::Lifecycle("closed".into()));
        assert!(err.is_err());
    }
}
