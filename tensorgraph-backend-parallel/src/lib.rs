//! Forward-only parallel backend for tensorgraph.
//!
//! A graph prefix is compiled into a [`DeviceProgram`]: one `f32` buffer per
//! node, taken from a [`CachingAllocator`], and one kernel launch per node on
//! a rayon thread pool. Reverse mode is not available here and
//! [`ExecutionBackend::gradient`] reports `UnsupportedOnBackend`.

pub mod alloc;
pub mod context;
pub mod error;
pub mod kernel;
pub mod program;

pub use alloc::{AllocatorStats, CachingAllocator, DeviceBuffer};
pub use context::{initialize_with_logging, BackendConfig};
pub use error::BackendError;
pub use kernel::{Kernel, WorkSize};
pub use program::DeviceProgram;

use error::BACKEND_NAME;
use log::{debug, info, warn};
use rayon::ThreadPool;
use tensorgraph_core::{
    Bindings, ExecutionBackend, Gradients, Graph, NodeId, ParamStore, Tensor, TensorGraphError,
};

#[derive(Debug)]
pub struct ParallelBackend {
    config: BackendConfig,
    pool: ThreadPool,
    allocator: CachingAllocator,
}

impl ParallelBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        initialize_with_logging();
        let pool = context::build_thread_pool(&config)?;
        info!(
            "parallel backend ready with {} worker thread(s)",
            pool.current_num_threads()
        );
        Ok(ParallelBackend {
            config,
            pool,
            allocator: CachingAllocator::new(),
        })
    }

    /// Builds a backend configured from `TENSORGRAPH_NUM_THREADS`.
    pub fn from_env() -> Result<Self, BackendError> {
        Self::new(BackendConfig::from_env())
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn allocator(&self) -> &CachingAllocator {
        &self.allocator
    }

    pub fn compile(&self, graph: &Graph, target: NodeId) -> Result<DeviceProgram, BackendError> {
        DeviceProgram::compile(graph, target)
    }

    /// Runs a compiled program. The program can be reused across calls with
    /// fresh bindings or updated parameters.
    pub fn run(
        &self,
        program: &DeviceProgram,
        params: &ParamStore,
        bindings: &Bindings,
    ) -> Result<Tensor, BackendError> {
        let value = program.run(
            params,
            bindings,
            &self.allocator,
            &self.pool,
            self.config.chunk_size(),
        )?;
        debug!(
            "ran {} step(s) for node {}; allocator {:?}",
            program.len(),
            program.target().index(),
            self.allocator.stats()
        );
        Ok(value)
    }
}

impl ExecutionBackend for ParallelBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn evaluate(
        &self,
        graph: &Graph,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
    ) -> Result<Tensor, TensorGraphError> {
        let program = self.compile(graph, target)?;
        Ok(self.run(&program, params, bindings)?)
    }

    fn gradient(
        &self,
        _graph: &Graph,
        _params: &ParamStore,
        _bindings: &Bindings,
        target: NodeId,
    ) -> Result<Gradients, TensorGraphError> {
        warn!(
            "gradient requested for node {} on the parallel backend",
            target.index()
        );
        Err(BackendError::ReverseModeUnsupported.into())
    }
}

#[cfg(test)]
mod tests;
