//! Error types for the DMX engine
use thiserror::Error;

/// DMX engine errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// Fixture, engine or scene parameters that cannot be applied
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Malformed sequence, scene or effect content
    #[error("Validation error: {0}")]
    Validation(String),

    /// Scene or running effect lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serial transport unavailable or write failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControlError {
    /// True for errors that were rejected before any state change
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ControlError::Configuration(_) | ControlError::Validation(_)
        )
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ControlError::NotFound("scene 'intro'".to_string());
        assert_eq!(err.to_string(), "Not found: scene 'intro'");
    }

    #[test]
    fn test_rejection_classification() {
        assert!(ControlError::Validation("x".into()).is_rejection());
        assert!(ControlError::Configuration("x".into()).is_rejection());
        assert!(!ControlError::Transport("x".into()).is_rejection());
    }
}
