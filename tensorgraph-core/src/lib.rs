// Core modules of the crate
pub mod autograd;
pub mod backend;
pub mod ops;
pub mod optim;
pub mod parameter;
pub mod serialization;
pub mod tensor;
pub mod utils;

pub mod error;
pub use error::TensorGraphError;

// Re-export the main types so they are reachable as `tensorgraph_core::Graph` etc.
pub use autograd::{Bindings, Evaluation, Gradients, Graph, NodeId};
pub use backend::{CpuBackend, ExecutionBackend};
pub use ops::Op;
pub use parameter::{ParamId, ParamStore};
pub use serialization::Snapshot;
pub use tensor::Tensor;
// Re-export traits required by public functions
pub use num_traits;
