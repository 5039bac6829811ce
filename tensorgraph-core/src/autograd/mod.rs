//! # Graph construction, evaluation and differentiation (`autograd`)
//!
//! - [`graph`]: the append-only [`Graph`], its [`Node`]s and [`NodeId`] handles,
//!   and one builder method per operation.
//! - [`evaluation`]: [`Bindings`], the forward scan producing an
//!   [`Evaluation`], and the reverse scan producing [`Gradients`].
//! - [`grad_check`]: central finite-difference verification of the reverse scan.

pub mod evaluation;
pub mod grad_check;
pub mod graph;

pub use evaluation::{Bindings, Evaluation, Gradients};
pub use grad_check::{check_gradients, GradCheckConfig, GradCheckError};
pub use graph::{Graph, Node, NodeId};
