use thiserror::Error;

/// Custom error type for the tensorgraph engine.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum TensorGraphError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
        operation: String,
    },

    #[error("Input node {node} has no binding for this evaluation")]
    UnboundInput { node: usize },

    #[error("Operation '{operation}' is not supported on the {backend} backend")]
    UnsupportedOnBackend { backend: String, operation: String },

    #[error("Invalid identifier: {id} is outside the constructed range 0..{len}")]
    InvalidIdentifier { id: usize, len: usize },

    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: (usize, usize),
        shape: (usize, usize),
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError {
        data_len: usize,
        shape: (usize, usize),
    },

    #[error("Invalid parameter for {operation}: {reason}")]
    InvalidParameter { operation: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TensorGraphError {
    pub(crate) fn shape_mismatch(
        expected: (usize, usize),
        actual: (usize, usize),
        operation: &str,
    ) -> Self {
        TensorGraphError::ShapeMismatch {
            expected,
            actual,
            operation: operation.to_string(),
        }
    }

    pub(crate) fn invalid_parameter(operation: &str, reason: impl Into<String>) -> Self {
        TensorGraphError::InvalidParameter {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for TensorGraphError {
    fn from(err: serde_json::Error) -> Self {
        TensorGraphError::Serialization(err.to_string())
    }
}
