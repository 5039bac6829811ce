use super::super::alloc::CachingAllocator;
use super::super::context::{build_thread_pool, BackendConfig};
use super::super::error::BackendError;
use super::super::kernel::{Kernel, WorkSize};
use super::super::program::DeviceProgram;
use tensorgraph_core::{Bindings, Graph, ParamStore, Tensor, TensorGraphError};

fn pool() -> rayon::ThreadPool {
    build_thread_pool(&BackendConfig::default().with_num_threads(2)).unwrap()
}

#[test]
fn test_compile_keeps_only_ancestors() {
    let mut params = ParamStore::new();
    let mut graph = Graph::new();
    let x = graph.input(2, 3);
    let w = graph.parameter(&mut params, Tensor::ones(3, 1));
    let unused = graph.exp(x).unwrap();
    let y = graph.matmul(x, w).unwrap();
    let _after = graph.tanh(y).unwrap();

    let program = DeviceProgram::compile(&graph, y).unwrap();
    let nodes: Vec<usize> = program.steps().iter().map(|s| s.node()).collect();
    assert_eq!(nodes, vec![x.index(), w.index(), y.index()]);
    assert!(!nodes.contains(&unused.index()));
    assert_eq!(program.target(), y);
    assert_eq!(program.steps()[0].kernel(), &Kernel::Upload);
    assert_eq!(
        program.steps()[2].work_size(),
        WorkSize::TwoD {
            width: 1,
            height: 2
        }
    );
}

#[test]
fn test_compile_rejects_stochastic_ancestor() {
    let mut graph = Graph::new();
    let x = graph.input(2, 2);
    let dropped = graph.dropout(x, 0.5).unwrap();
    let y = graph.relu(dropped).unwrap();
    assert!(matches!(
        DeviceProgram::compile(&graph, y),
        Err(BackendError::UnsupportedOperation(_))
    ));
    // A target that does not depend on the dropout still compiles.
    let z = graph.relu(x).unwrap();
    assert!(DeviceProgram::compile(&graph, z).is_ok());
}

#[test]
fn test_compile_rejects_foreign_handle() {
    let mut graph = Graph::new();
    graph.input(1, 1);
    let mut other = Graph::new();
    let foreign = other.input(1, 1);
    let _ = other.input(1, 1);
    let foreign_second = other.exp(foreign).unwrap();
    assert!(matches!(
        DeviceProgram::compile(&graph, foreign_second),
        Err(BackendError::Graph { .. })
    ));
}

#[test]
fn test_run_and_reuse_buffers() {
    let mut params = ParamStore::new();
    let mut graph = Graph::new();
    let x = graph.input(1, 2);
    let w = graph.parameter(&mut params, Tensor::from_rows(&[[1.0], [2.0]]).unwrap());
    let b = graph.constant(0.5, 1, 1);
    let xw = graph.matmul(x, w).unwrap();
    let y = graph.add(xw, b).unwrap();

    let program = DeviceProgram::compile(&graph, y).unwrap();
    let allocator = CachingAllocator::new();
    let pool = pool();
    let bindings = Bindings::new().bind(x, Tensor::row_vector(&[3.0, 4.0]));

    let first = program.run(&params, &bindings, &allocator, &pool, 1).unwrap();
    assert_eq!(first, Tensor::full(1, 1, 11.5));
    let misses = allocator.stats().misses;

    let second = program.run(&params, &bindings, &allocator, &pool, 1).unwrap();
    assert_eq!(second, first);
    assert_eq!(allocator.stats().misses, misses);
    assert!(allocator.stats().hits > 0);
}

#[test]
fn test_run_reports_unbound_input() {
    let mut graph = Graph::new();
    let x = graph.input(2, 2);
    let y = graph.exp(x).unwrap();
    let program = DeviceProgram::compile(&graph, y).unwrap();
    let err = program
        .run(
            &ParamStore::new(),
            &Bindings::new(),
            &CachingAllocator::new(),
            &pool(),
            1,
        )
        .unwrap_err();
    assert_eq!(
        TensorGraphError::from(err),
        TensorGraphError::UnboundInput { node: x.index() }
    );
}

#[test]
fn test_run_reports_binding_shape_mismatch() {
    let mut graph = Graph::new();
    let x = graph.input(2, 2);
    let program = DeviceProgram::compile(&graph, x).unwrap();
    let bindings = Bindings::new().bind(x, Tensor::zeros(1, 4));
    let err = program
        .run(&ParamStore::new(), &bindings, &CachingAllocator::new(), &pool(), 1)
        .unwrap_err();
    assert!(matches!(
        TensorGraphError::from(err),
        TensorGraphError::ShapeMismatch {
            expected: (2, 2),
            actual: (1, 4),
            ..
        }
    ));
}
