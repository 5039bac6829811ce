use tensorgraph_core::TensorGraphError;
use thiserror::Error;

/// Name reported in `UnsupportedOnBackend` errors.
pub const BACKEND_NAME: &str = "parallel";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Operation '{0}' has no parallel kernel")]
    UnsupportedOperation(String),
    #[error("Reverse-mode differentiation is not available on the parallel backend")]
    ReverseModeUnsupported,
    #[error("Failed to build the worker thread pool: {source}")]
    ThreadPool {
        #[from]
        source: rayon::ThreadPoolBuildError,
    },
    #[error("Invalid backend configuration: {0}")]
    InvalidConfig(String),
    #[error("Buffer for node {node} holds {actual} elements, expected {expected}")]
    BufferLength {
        node: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Node {0} was read after its buffer was released")]
    BufferReleased(usize),
    #[error("Graph error: {source}")]
    Graph {
        #[from]
        source: TensorGraphError,
    },
}

impl From<BackendError> for TensorGraphError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::UnsupportedOperation(operation) => TensorGraphError::UnsupportedOnBackend {
                backend: BACKEND_NAME.to_string(),
                operation,
            },
            BackendError::ReverseModeUnsupported => TensorGraphError::UnsupportedOnBackend {
                backend: BACKEND_NAME.to_string(),
                operation: "gradient".to_string(),
            },
            BackendError::Graph { source } => source,
            other => TensorGraphError::InvalidParameter {
                operation: BACKEND_NAME.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
