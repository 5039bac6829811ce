use crate::autograd::{Bindings, Gradients, Graph, NodeId};
use crate::error::TensorGraphError;
use crate::parameter::ParamStore;
use crate::tensor::Tensor;

/// An engine able to run a [`Graph`].
///
/// Backends that cannot differentiate return
/// [`TensorGraphError::UnsupportedOnBackend`] from `gradient` rather than a
/// wrong answer.
pub trait ExecutionBackend {
    fn name(&self) -> &str;

    fn evaluate(
        &self,
        graph: &Graph,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
    ) -> Result<Tensor, TensorGraphError>;

    fn gradient(
        &self,
        graph: &Graph,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
    ) -> Result<Gradients, TensorGraphError>;
}

/// The reference backend: evaluates in `f64` on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl ExecutionBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn evaluate(
        &self,
        graph: &Graph,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
    ) -> Result<Tensor, TensorGraphError> {
        graph.evaluate(params, bindings, target)
    }

    fn gradient(
        &self,
        graph: &Graph,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
    ) -> Result<Gradients, TensorGraphError> {
        graph.gradient(params, bindings, target)
    }
}
