//! Error types for temporal convolution operations

use thiserror::Error;

/// Result type alias for convolution operations
pub type ConvResult<T> = Result<T, ConvError>;

/// Errors that can occur during convolution operations
#[derive(Debug, Error)]
pub enum ConvError {
    /// Caller-supplied tensor or layer configuration violates a precondition
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Gradient tensor shape disagrees with the forward pass geometry
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvError::InvalidArgument("input sequence smaller than kernel size".into());
        assert_eq!(
            err.to_string(),
            "invalid argument: input sequence smaller than kernel size"
        );
    }

    #[test]
    fn test_error_variants() {
        let arg_err = ConvError::InvalidArgument("test".into());
        let shape_err = ConvError::ShapeMismatch("test".into());

        assert!(matches!(arg_err, ConvError::InvalidArgument(_)));
        assert!(matches!(shape_err, ConvError::ShapeMismatch(_)));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = ConvError::ShapeMismatch("grad_output has 4 frames, expected 3".into());
        assert_eq!(
            err.to_string(),
            "shape mismatch: grad_output has 4 frames, expected 3"
        );
    }
}
