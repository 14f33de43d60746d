use thiserror::Error;

use crate::highlight::HighlightStage;

/// Boxed cause carried by wrapped pipeline failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for filter compilation and search execution
#[derive(Error, Debug)]
pub enum FilterQlError {
    #[error("No fulltext fields found for: {entity_type}")]
    NoSearchableFieldsFound { entity_type: String },

    #[error("Condition: {0} not supported for elastic filter queries")]
    UnsupportedCondition(String),

    #[error("Illegal conjunction: {0}")]
    IllegalConjunction(String),

    #[error("Error fetching highlighted results ({stage}): {source}")]
    HighlightExecutionFailed {
        stage: HighlightStage,
        #[source]
        source: BoxError,
    },

    #[error("Cannot convert ids for entity type: {entity_type}")]
    IdConversionUnavailable { entity_type: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for filterql operations
pub type Result<T> = std::result::Result<T, FilterQlError>;

impl FilterQlError {
    /// Wrap any failure raised while the highlight pipeline is in `stage`
    pub fn highlight(stage: HighlightStage, source: impl Into<BoxError>) -> Self {
        FilterQlError::HighlightExecutionFailed {
            stage,
            source: source.into(),
        }
    }

    /// Whether this error aborts the call that raised it
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FilterQlError::IdConversionUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FilterQlError::NoSearchableFieldsFound {
            entity_type: "Invoice".to_string(),
        };
        assert_eq!(err.to_string(), "No fulltext fields found for: Invoice");

        let err = FilterQlError::UnsupportedCondition("like".to_string());
        assert!(err.to_string().contains("like"));
    }

    #[test]
    fn test_highlight_failure_keeps_cause() {
        let err = FilterQlError::highlight(
            HighlightStage::Requesting,
            FilterQlError::Transport("connection refused".to_string()),
        );
        assert!(err.to_string().contains("requesting"));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(FilterQlError::IllegalConjunction("xor".to_string()).is_fatal());
        assert!(!FilterQlError::IdConversionUnavailable {
            entity_type: "Note".to_string()
        }
        .is_fatal());
    }
}
