//! Compilation of a graph prefix into a straight-line list of kernel launches.

use crate::alloc::{CachingAllocator, DeviceBuffer};
use crate::error::BackendError;
use crate::kernel::{Kernel, Operand, WorkSize};
use log::{debug, trace};
use rayon::ThreadPool;
use tensorgraph_core::{Bindings, Graph, NodeId, Op, ParamId, ParamStore, Tensor, TensorGraphError};

/// Where a step's buffer contents come from.
#[derive(Clone, Debug, PartialEq)]
enum Source {
    Input(NodeId),
    Variable(ParamId),
    Kernel,
}

/// One node of a [`DeviceProgram`].
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    node: usize,
    source: Source,
    kernel: Kernel,
    /// Step indices (not node ids) of the inputs.
    inputs: Vec<usize>,
    shape: (usize, usize),
    work: WorkSize,
}

impl Step {
    /// Graph id of the node this step computes.
    pub fn node(&self) -> usize {
        self.node
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn work_size(&self) -> WorkSize {
        self.work
    }
}

/// The ancestors of one target node, in id order, each bound to a kernel.
///
/// Nodes that do not feed the target are left out. A step's buffer goes back
/// to the allocator right after its last reader has run.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceProgram {
    target: NodeId,
    steps: Vec<Step>,
    last_use: Vec<usize>,
}

impl DeviceProgram {
    pub fn compile(graph: &Graph, target: NodeId) -> Result<Self, BackendError> {
        let target_index = graph.node(target)?.id();
        let nodes = &graph.nodes()[..=target_index];

        let mut live = vec![false; nodes.len()];
        live[target_index] = true;
        for node in nodes.iter().rev() {
            if live[node.id()] {
                for &input in node.inputs() {
                    live[input] = true;
                }
            }
        }

        let mut slot = vec![usize::MAX; nodes.len()];
        let mut steps = Vec::new();
        for node in nodes.iter().filter(|n| live[n.id()]) {
            let input_shapes: Vec<(usize, usize)> =
                node.inputs().iter().map(|&i| nodes[i].shape()).collect();
            let kernel = Kernel::bind(node.op(), &input_shapes)?;
            let source = match node.op() {
                Op::Input => Source::Input(graph.handle(node.id())?),
                Op::Variable { param } => Source::Variable(*param),
                _ => Source::Kernel,
            };
            let work = kernel.work_size(node.shape());
            slot[node.id()] = steps.len();
            steps.push(Step {
                node: node.id(),
                source,
                kernel,
                inputs: node.inputs().iter().map(|&i| slot[i]).collect(),
                shape: node.shape(),
                work,
            });
        }

        let mut last_use: Vec<usize> = (0..steps.len()).collect();
        for (s, step) in steps.iter().enumerate() {
            for &input in &step.inputs {
                last_use[input] = s;
            }
        }

        debug!(
            "compiled {} of {} node(s) for target {}",
            steps.len(),
            nodes.len(),
            target_index
        );
        Ok(DeviceProgram {
            target,
            steps,
            last_use,
        })
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step on `pool` and downloads the target value.
    pub fn run(
        &self,
        params: &ParamStore,
        bindings: &Bindings,
        allocator: &CachingAllocator,
        pool: &ThreadPool,
        min_chunk: usize,
    ) -> Result<Tensor, BackendError> {
        let mut buffers: Vec<Option<DeviceBuffer>> = Vec::with_capacity(self.steps.len());

        for (s, step) in self.steps.iter().enumerate() {
            let (rows, columns) = step.shape;
            let mut output = allocator.alloc(rows * columns);
            match &step.source {
                Source::Input(id) => {
                    let bound = bindings
                        .get(*id)
                        .ok_or(TensorGraphError::UnboundInput { node: step.node })?;
                    expect_shape(step.shape, bound.shape(), "input binding")?;
                    output.upload(bound.data());
                }
                Source::Variable(param) => {
                    let stored = params.get(*param)?;
                    expect_shape(step.shape, stored.shape(), "variable")?;
                    output.upload(stored.data());
                }
                Source::Kernel => {
                    let operands = self.operands(step, &buffers)?;
                    pool.install(|| {
                        step.kernel
                            .launch(&operands, output.as_mut_slice(), step.shape, min_chunk)
                    });
                }
            }
            trace!("step {} (node {}) {:?}", s, step.node, step.work);
            buffers.push(Some(output));

            for &input in &step.inputs {
                if self.last_use[input] == s {
                    if let Some(buffer) = buffers[input].take() {
                        allocator.free(buffer);
                    }
                }
            }
        }

        let last = self.steps.len() - 1;
        let result = buffers[last]
            .take()
            .ok_or(BackendError::BufferReleased(self.steps[last].node))?;
        let (rows, columns) = self.steps[last].shape;
        let value = Tensor::new(result.download(), rows, columns)?;
        allocator.free(result);
        for buffer in buffers.into_iter().flatten() {
            allocator.free(buffer);
        }
        Ok(value)
    }

    fn operands<'a>(
        &self,
        step: &Step,
        buffers: &'a [Option<DeviceBuffer>],
    ) -> Result<Vec<Operand<'a>>, BackendError> {
        step.inputs
            .iter()
            .map(|&input| {
                let source = &self.steps[input];
                let buffer = buffers[input]
                    .as_ref()
                    .ok_or(BackendError::BufferReleased(source.node))?;
                let expected = source.shape.0 * source.shape.1;
                if buffer.len() != expected {
                    return Err(BackendError::BufferLength {
                        node: source.node,
                        expected,
                        actual: buffer.len(),
                    });
                }
                Ok(Operand {
                    data: buffer.as_slice(),
                    shape: source.shape,
                })
            })
            .collect()
    }
}

fn expect_shape(
    expected: (usize, usize),
    actual: (usize, usize),
    operation: &str,
) -> Result<(), BackendError> {
    if expected != actual {
        return Err(TensorGraphError::ShapeMismatch {
            expected,
            actual,
            operation: operation.to_string(),
        }
        .into());
    }
    Ok(())
}
