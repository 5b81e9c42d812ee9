/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Persistent topology model.
//!
//! Core structures:
//! - `GraphState`: node and edge records backed by petgraph::StableGraph
//! - `NodeRecord`: one network endpoint with a fixed layout position
//! - `EdgeRecord`: one canonical, deduplicated link between two endpoints
//!
//! Nothing is ever removed: records only appear, and edges only change their
//! label and color.

use euclid::default::Point2D;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::IntoEdgeReferences;
use petgraph::Directed;
use std::collections::HashMap;

use crate::snapshot::NodeId;

pub mod identity;

pub use identity::{CanonicalEdge, EdgeColor, EdgeKey, EdgeVisual};

/// Visual weight given to every node
pub const NODE_SIZE: f32 = 15.0;

/// A network endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,

    /// Display label (host:port)
    pub address: String,

    /// Position in graph space, assigned once at first sight
    pub position: Point2D<f32>,

    pub size: f32,

    /// Created because an edge referenced it, before it reported itself
    pub is_placeholder: bool,
}

/// A canonical directed edge. `key`, `from` and `to` never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub key: EdgeKey,
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
    pub color: EdgeColor,
}

impl EdgeRecord {
    fn from_canonical(edge: CanonicalEdge) -> Self {
        Self {
            key: edge.key,
            from: edge.from,
            to: edge.to,
            label: edge.visual.label,
            color: edge.visual.color,
        }
    }

    pub fn visual(&self) -> EdgeVisual {
        EdgeVisual {
            label: self.label.clone(),
            color: self.color,
        }
    }
}

/// Patch for the mutable visual fields of an existing edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeUpdate {
    pub key: EdgeKey,
    pub label: String,
    pub color: EdgeColor,
}

/// Outcome of upserting one canonical edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeUpsert {
    Created(EdgeRecord),
    Updated(EdgeUpdate),
    Unchanged,
}

/// Node and edge records for the whole observed topology
#[derive(Clone, Default)]
pub struct GraphState {
    inner: StableGraph<NodeRecord, EdgeRecord, Directed>,

    id_to_node: HashMap<NodeId, NodeIndex>,

    key_to_edge: HashMap<EdgeKey, EdgeIndex>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node record unless one with the same id already exists.
    /// Returns whether the record was inserted.
    pub fn insert_node(&mut self, record: NodeRecord) -> bool {
        if self.id_to_node.contains_key(&record.id) {
            return false;
        }
        let id = record.id;
        let idx = self.inner.add_node(record);
        self.id_to_node.insert(id, idx);
        true
    }

    /// Create or patch the edge for `edge.key`.
    ///
    /// Returns `None` if either endpoint is missing; callers must insert
    /// both nodes first.
    pub fn upsert_edge(&mut self, edge: CanonicalEdge) -> Option<EdgeUpsert> {
        if let Some(&idx) = self.key_to_edge.get(&edge.key) {
            let record = self.inner.edge_weight_mut(idx)?;
            if record.visual() == edge.visual {
                return Some(EdgeUpsert::Unchanged);
            }
            record.label = edge.visual.label;
            record.color = edge.visual.color;
            return Some(EdgeUpsert::Updated(EdgeUpdate {
                key: record.key.clone(),
                label: record.label.clone(),
                color: record.color,
            }));
        }

        let from = *self.id_to_node.get(&edge.from)?;
        let to = *self.id_to_node.get(&edge.to)?;
        let record = EdgeRecord::from_canonical(edge);
        let idx = self.inner.add_edge(from, to, record.clone());
        self.key_to_edge.insert(record.key.clone(), idx);
        Some(EdgeUpsert::Created(record))
    }

    /// Move a node. This is the only mutation a node accepts after creation.
    pub fn relayout_node(&mut self, id: NodeId, position: Point2D<f32>) -> bool {
        let Some(&idx) = self.id_to_node.get(&id) else {
            return false;
        };
        match self.inner.node_weight_mut(idx) {
            Some(node) => {
                node.position = position;
                true
            },
            None => false,
        }
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.id_to_node.contains_key(&id)
    }

    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.key_to_edge.contains_key(key)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&NodeRecord> {
        let &idx = self.id_to_node.get(&id)?;
        self.inner.node_weight(idx)
    }

    pub fn get_edge(&self, key: &EdgeKey) -> Option<&EdgeRecord> {
        let &idx = self.key_to_edge.get(key)?;
        self.inner.edge_weight(idx)
    }

    /// Iterate over all node records
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.inner
            .node_indices()
            .map(move |idx| &self.inner[idx])
    }

    /// Iterate over all edge records
    pub fn edges(&self) -> impl Iterator<Item = &EdgeRecord> + '_ {
        self.inner.edge_references().map(|e| e.weight())
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }
}
