//! JSON snapshots of a graph and its parameters.
//!
//! A [`Snapshot`] stores every node as its op (which carries the node's
//! non-structural parameters), its input ids and its shape, next to the
//! parameter tensors. Restoring replays construction through the graph
//! builder, so the restored graph passes the same validation as a hand-built
//! one and ends up with identical ids and shapes.

use crate::autograd::Graph;
use crate::error::TensorGraphError;
use crate::ops::Op;
use crate::parameter::ParamStore;
use log::debug;
use serde::{Deserialize, Serialize};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: usize,
    pub op: Op,
    pub inputs: Vec<usize>,
    pub shape: (usize, usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub nodes: Vec<NodeRecord>,
    pub params: ParamStore,
}

fn replay_error(id: usize, reason: impl std::fmt::Display) -> TensorGraphError {
    TensorGraphError::Serialization(format!("node {}: {}", id, reason))
}

impl Snapshot {
    pub fn capture(graph: &Graph, params: &ParamStore) -> Snapshot {
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| NodeRecord {
                id: node.id(),
                op: node.op().clone(),
                inputs: node.inputs().to_vec(),
                shape: node.shape(),
            })
            .collect();
        Snapshot {
            version: SNAPSHOT_VERSION,
            nodes,
            params: params.clone(),
        }
    }

    pub fn to_text(&self) -> Result<String, TensorGraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_text(text: &str) -> Result<Snapshot, TensorGraphError> {
        let snapshot: Snapshot = serde_json::from_str(text)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(TensorGraphError::Serialization(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Rebuilds the graph and parameter store.
    ///
    /// Fails with `Serialization` if a record is out of order, references a
    /// later node, fails validation, or replays to a different shape.
    pub fn restore(&self) -> Result<(Graph, ParamStore), TensorGraphError> {
        let params = self.params.clone();
        let mut graph = Graph::new();
        for record in &self.nodes {
            if record.id != graph.len() {
                return Err(replay_error(
                    record.id,
                    format!("expected id {}", graph.len()),
                ));
            }
            let (rows, columns) = record.shape;
            let id = match &record.op {
                Op::Input => graph.input(rows, columns),
                Op::Constant { value } => graph.constant(*value, rows, columns),
                Op::Variable { param } => graph
                    .variable(&params, *param)
                    .map_err(|e| replay_error(record.id, e))?,
                op => {
                    let inputs = record
                        .inputs
                        .iter()
                        .map(|&input| graph.handle(input))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| replay_error(record.id, e))?;
                    graph
                        .add_node(op.clone(), &inputs)
                        .map_err(|e| replay_error(record.id, e))?
                }
            };
            let node = graph.node(id)?;
            if node.shape() != record.shape || node.inputs() != record.inputs.as_slice() {
                return Err(replay_error(
                    record.id,
                    format!(
                        "recorded shape {:?} and inputs {:?}, replayed {:?} and {:?}",
                        record.shape,
                        record.inputs,
                        node.shape(),
                        node.inputs()
                    ),
                ));
            }
        }
        debug!(
            "restored {} nodes and {} parameters",
            graph.len(),
            params.len()
        );
        Ok((graph, params))
    }
}

/// Encodes `graph` and `params` as JSON text.
pub fn to_text(graph: &Graph, params: &ParamStore) -> Result<String, TensorGraphError> {
    Snapshot::capture(graph, params).to_text()
}

/// Decodes JSON text produced by [`to_text`] and replays it.
pub fn from_text(text: &str) -> Result<(Graph, ParamStore), TensorGraphError> {
    Snapshot::from_text(text)?.restore()
}
