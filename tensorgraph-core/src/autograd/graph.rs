use crate::error::TensorGraphError;
use crate::ops::Op;
use crate::parameter::{ParamId, ParamStore};
use crate::tensor::Tensor;
use log::trace;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GRAPH_UID: AtomicU64 = AtomicU64::new(1);

/// Handle to a node, issued only by the [`Graph`] that owns the node.
///
/// The handle remembers its graph, so passing it to another graph fails with
/// `InvalidIdentifier` instead of silently reading an unrelated node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    graph: u64,
}

impl NodeId {
    /// Position of the node in construction order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn graph_uid(&self) -> u64 {
        self.graph
    }
}

/// One operation in the graph.
///
/// `inputs` hold the indices of earlier nodes only; `shape` is fixed when the
/// node is built.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: usize,
    op: Op,
    inputs: Vec<usize>,
    rows: usize,
    columns: usize,
}

impl Node {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }
}

/// An append-only list of nodes in topological order.
///
/// Every node's identifier is its position in the list and every input has a
/// strictly smaller identifier, so evaluation is a single ascending scan and
/// differentiation a single descending scan. The graph holds no per-call
/// state: evaluation caches are returned to the caller, which makes a built
/// graph safe to share between threads.
#[derive(Debug)]
pub struct Graph {
    uid: u64,
    nodes: Vec<Node>,
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            uid: NEXT_GRAPH_UID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        }
    }

    /// Number of constructed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn uid(&self) -> u64 {
        self.uid
    }

    /// Maps a handle to a node index, rejecting handles from other graphs.
    pub(crate) fn resolve(&self, id: NodeId) -> Result<usize, TensorGraphError> {
        if id.graph != self.uid || id.index >= self.nodes.len() {
            return Err(TensorGraphError::InvalidIdentifier {
                id: id.index,
                len: self.nodes.len(),
            });
        }
        Ok(id.index)
    }

    /// Re-issues the handle of the node at `index`.
    pub fn handle(&self, index: usize) -> Result<NodeId, TensorGraphError> {
        if index >= self.nodes.len() {
            return Err(TensorGraphError::InvalidIdentifier {
                id: index,
                len: self.nodes.len(),
            });
        }
        Ok(self.id_at(index))
    }

    pub(crate) fn id_at(&self, index: usize) -> NodeId {
        NodeId {
            index,
            graph: self.uid,
        }
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TensorGraphError> {
        let index = self.resolve(id)?;
        Ok(&self.nodes[index])
    }

    pub fn shape(&self, id: NodeId) -> Result<(usize, usize), TensorGraphError> {
        Ok(self.node(id)?.shape())
    }

    /// The parameter read by a Variable node, `None` for every other kind.
    pub fn param_of(&self, id: NodeId) -> Result<Option<ParamId>, TensorGraphError> {
        match self.node(id)?.op {
            Op::Variable { param } => Ok(Some(param)),
            _ => Ok(None),
        }
    }

    fn push(&mut self, op: Op, inputs: Vec<usize>, shape: (usize, usize)) -> NodeId {
        let id = self.nodes.len();
        trace!(
            "graph {}: node {} = {}{:?} -> {:?}",
            self.uid,
            id,
            op.name(),
            inputs,
            shape
        );
        self.nodes.push(Node {
            id,
            op,
            inputs,
            rows: shape.0,
            columns: shape.1,
        });
        self.id_at(id)
    }

    // --- Leaves ---

    /// An input bound per evaluation through [`Bindings`](crate::autograd::Bindings).
    pub fn input(&mut self, rows: usize, columns: usize) -> NodeId {
        self.push(Op::Input, Vec::new(), (rows, columns))
    }

    /// A node reading `param` from the store; its shape is the parameter's shape.
    pub fn variable(
        &mut self,
        params: &ParamStore,
        param: ParamId,
    ) -> Result<NodeId, TensorGraphError> {
        let shape = params.get(param)?.shape();
        Ok(self.push(Op::Variable { param }, Vec::new(), shape))
    }

    /// Inserts `initial` into the store and returns a Variable node reading it.
    pub fn parameter(&mut self, params: &mut ParamStore, initial: Tensor) -> NodeId {
        let shape = initial.shape();
        let param = params.insert(initial);
        self.push(Op::Variable { param }, Vec::new(), shape)
    }

    pub fn constant(&mut self, value: f64, rows: usize, columns: usize) -> NodeId {
        self.push(Op::Constant { value }, Vec::new(), (rows, columns))
    }

    /// Validates and appends a non-leaf node.
    ///
    /// Leaves go through [`Graph::input`], [`Graph::variable`] and
    /// [`Graph::constant`] since their shape is not derived from inputs.
    pub fn add_node(&mut self, op: Op, inputs: &[NodeId]) -> Result<NodeId, TensorGraphError> {
        let indices = inputs
            .iter()
            .map(|&id| self.resolve(id))
            .collect::<Result<Vec<_>, _>>()?;
        let shapes: Vec<(usize, usize)> = indices.iter().map(|&i| self.nodes[i].shape()).collect();
        let shape = op.infer_shape(&shapes)?;
        Ok(self.push(op, indices, shape))
    }

    // --- Element-wise binary ---

    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Add, &[a, b])
    }

    pub fn sub(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Subtract, &[a, b])
    }

    pub fn mul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Multiply, &[a, b])
    }

    pub fn div(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Divide, &[a, b])
    }

    // --- Linear algebra ---

    pub fn matmul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::MatMul, &[a, b])
    }

    pub fn transpose(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Transpose, &[x])
    }

    // --- Element-wise unary ---

    pub fn exp(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Exp, &[x])
    }

    pub fn log(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Log, &[x])
    }

    pub fn invert(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Invert, &[x])
    }

    pub fn negate(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Negate, &[x])
    }

    pub fn abs(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Abs, &[x])
    }

    pub fn pow(&mut self, x: NodeId, exponent: f64) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Power { exponent }, &[x])
    }

    pub fn scale(&mut self, x: NodeId, factor: f64) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Scale { factor }, &[x])
    }

    pub fn tanh(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Tanh, &[x])
    }

    pub fn sigmoid(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Sigmoid, &[x])
    }

    pub fn relu(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Relu, &[x])
    }

    // --- Layout ---

    pub fn reshape(
        &mut self,
        x: NodeId,
        rows: usize,
        columns: usize,
    ) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Reshape { rows, columns }, &[x])
    }

    /// Tiles `x` `row_repeat` times down and `column_repeat` times across.
    pub fn broadcast(
        &mut self,
        x: NodeId,
        row_repeat: usize,
        column_repeat: usize,
    ) -> Result<NodeId, TensorGraphError> {
        self.add_node(
            Op::Broadcast {
                row_repeat,
                column_repeat,
            },
            &[x],
        )
    }

    pub fn slice(
        &mut self,
        x: NodeId,
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    ) -> Result<NodeId, TensorGraphError> {
        self.add_node(
            Op::Slice {
                row,
                column,
                rows,
                columns,
            },
            &[x],
        )
    }

    /// Column-wise concatenation `[a | b]`.
    pub fn concat(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Concat, &[a, b])
    }

    // --- Convolution ---

    pub fn convolution(
        &mut self,
        input: NodeId,
        kernels: &[NodeId],
        stride_rows: usize,
        stride_columns: usize,
    ) -> Result<NodeId, TensorGraphError> {
        let mut inputs = Vec::with_capacity(kernels.len() + 1);
        inputs.push(input);
        inputs.extend_from_slice(kernels);
        self.add_node(
            Op::Convolution {
                stride_rows,
                stride_columns,
            },
            &inputs,
        )
    }

    pub fn deconvolution(
        &mut self,
        input: NodeId,
        kernels: &[NodeId],
        stride_rows: usize,
        stride_columns: usize,
    ) -> Result<NodeId, TensorGraphError> {
        let mut inputs = Vec::with_capacity(kernels.len() + 1);
        inputs.push(input);
        inputs.extend_from_slice(kernels);
        self.add_node(
            Op::Deconvolution {
                stride_rows,
                stride_columns,
            },
            &inputs,
        )
    }

    // --- Reductions ---

    pub fn row_sum(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::RowSum, &[x])
    }

    pub fn row_mean(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::RowMean, &[x])
    }

    pub fn collapse_sum(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::CollapseSum, &[x])
    }

    // --- Stochastic ---

    pub fn dropout(&mut self, x: NodeId, rate: f64) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Dropout { rate }, &[x])
    }

    pub fn gaussian_noise(&mut self, x: NodeId, std_dev: f64) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::GaussianNoise { std_dev }, &[x])
    }

    /// Bernoulli states with `P(1) = x`.
    pub fn sample(&mut self, x: NodeId) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::Sample, &[x])
    }

    // --- Loss-fused ---

    pub fn softmax_loss(
        &mut self,
        logits: NodeId,
        target: NodeId,
    ) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::SoftmaxLoss, &[logits, target])
    }

    pub fn sigmoid_loss(
        &mut self,
        logits: NodeId,
        target: NodeId,
    ) -> Result<NodeId, TensorGraphError> {
        self.add_node(Op::SigmoidLoss, &[logits, target])
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
