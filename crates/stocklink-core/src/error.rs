//! # Domain Error Types

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by pure domain validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A mapping entry is missing one of its ids.
    #[error("Invalid mapping entry at position {index}: {reason}")]
    InvalidMapping { index: usize, reason: String },
}

impl CoreError {
    /// Creates an InvalidMapping error.
    pub fn invalid_mapping(index: usize, reason: impl Into<String>) -> Self {
        CoreError::InvalidMapping {
            index,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_mapping(3, "webflowVariantId is empty");
        assert!(err.to_string().contains("position 3"));
        assert!(err.to_string().contains("webflowVariantId"));
    }
}
