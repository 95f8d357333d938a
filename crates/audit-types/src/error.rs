use thiserror::Error;

/// Errors raised when converting wire names into model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("unknown event category: {0}")]
    UnknownCategory(String),

    #[error("unknown decision: {0} (expected ALLOW or DENY)")]
    UnknownDecision(String),

    #[error("unknown threat level: {0} (expected LOW, MEDIUM or HIGH)")]
    UnknownThreatLevel(String),
}

/// Convenience type alias for model results.
pub type TypesResult<T> = Result<T, TypesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = TypesError::UnknownCategory("BOGUS".into());
        assert!(e.to_string().contains("BOGUS"));

        let e = TypesError::UnknownDecision("MAYBE".into());
        assert!(e.to_string().contains("ALLOW or DENY"));
    }
}
