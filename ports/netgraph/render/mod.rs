/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Graph sinks: one-way projections of the topology model.
//!
//! A sink only ever receives copies. It lays out and draws whatever it is
//! given, and is never read back by the reconciler.

use crate::graph::{EdgeKey, EdgeRecord, EdgeUpdate, NodeRecord};
use crate::reconcile::GraphBatch;
use crate::snapshot::NodeId;

pub mod projection;
pub mod worker;

/// Rendering surface accepting add/update operations.
///
/// Adding an id the sink already holds, or updating one it does not, is a
/// contract violation and must be reported as an error.
pub trait GraphSink {
    fn add_nodes(&mut self, nodes: &[NodeRecord]) -> Result<(), SinkError>;

    fn add_edges(&mut self, edges: &[EdgeRecord]) -> Result<(), SinkError>;

    fn update_edges(&mut self, updates: &[EdgeUpdate]) -> Result<(), SinkError>;
}

/// Push one batch into a sink: nodes first, so every new edge finds both
/// endpoints, then new edges, then patches.
pub fn apply_batch<S: GraphSink + ?Sized>(sink: &mut S, batch: &GraphBatch) -> Result<(), SinkError> {
    if !batch.added_nodes.is_empty() {
        sink.add_nodes(&batch.added_nodes)?;
    }
    if !batch.added_edges.is_empty() {
        sink.add_edges(&batch.added_edges)?;
    }
    if !batch.updated_edges.is_empty() {
        sink.update_edges(&batch.updated_edges)?;
    }
    Ok(())
}

/// Errors reported by a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    DuplicateNode(NodeId),
    DuplicateEdge(EdgeKey),
    UnknownEdge(EdgeKey),
    UnknownEndpoint { edge: EdgeKey, node: NodeId },
    Disconnected,
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::DuplicateNode(id) => write!(f, "Node {id} was already added"),
            SinkError::DuplicateEdge(key) => write!(f, "Edge {key} was already added"),
            SinkError::UnknownEdge(key) => write!(f, "Edge {key} was never added"),
            SinkError::UnknownEndpoint { edge, node } => {
                write!(f, "Edge {edge} references unknown node {node}")
            },
            SinkError::Disconnected => write!(f, "Sink worker is no longer running"),
        }
    }
}

impl std::error::Error for SinkError {}
