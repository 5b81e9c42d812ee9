/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A petgraph projection of the topology, as a drawing surface would hold it.
//!
//! The projection keeps its own StableGraph and index maps, built purely from
//! add/update operations. It enforces the sink contract strictly, which makes
//! it the reference sink for the binary and for tests.

use super::{GraphSink, SinkError};
use crate::graph::{EdgeKey, EdgeRecord, EdgeUpdate, NodeRecord};
use crate::snapshot::NodeId;
use crate::util::short_address;
use euclid::default::Point2D;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::Directed;
use std::collections::HashMap;

/// Longest node label drawn on the canvas
const MAX_LABEL_CHARS: usize = 24;

/// Node as drawn
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedNode {
    pub id: NodeId,
    pub label: String,
    pub position: Point2D<f32>,
    pub radius: f32,
}

/// Edge as drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedEdge {
    pub key: EdgeKey,
    pub label: String,
    pub rgb: (u8, u8, u8),
}

#[derive(Default)]
pub struct PetgraphProjection {
    pub graph: StableGraph<ProjectedNode, ProjectedEdge, Directed>,
    id_to_index: HashMap<NodeId, NodeIndex>,
    key_to_index: HashMap<EdgeKey, EdgeIndex>,
}

impl PetgraphProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&ProjectedNode> {
        let &idx = self.id_to_index.get(&id)?;
        self.graph.node_weight(idx)
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&ProjectedEdge> {
        let &idx = self.key_to_index.get(key)?;
        self.graph.edge_weight(idx)
    }

    /// Endpoints of a drawn edge as `(from, to)` node ids
    pub fn endpoints(&self, key: &EdgeKey) -> Option<(NodeId, NodeId)> {
        let &idx = self.key_to_index.get(key)?;
        let (from, to) = self.graph.edge_endpoints(idx)?;
        Some((self.graph[from].id, self.graph[to].id))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl GraphSink for PetgraphProjection {
    fn add_nodes(&mut self, nodes: &[NodeRecord]) -> Result<(), SinkError> {
        if let Some(dup) = nodes.iter().find(|n| self.id_to_index.contains_key(&n.id)) {
            return Err(SinkError::DuplicateNode(dup.id));
        }
        for node in nodes {
            let idx = self.graph.add_node(ProjectedNode {
                id: node.id,
                label: short_address(&node.address, MAX_LABEL_CHARS),
                position: node.position,
                radius: node.size,
            });
            self.id_to_index.insert(node.id, idx);
        }
        Ok(())
    }

    fn add_edges(&mut self, edges: &[EdgeRecord]) -> Result<(), SinkError> {
        for edge in edges {
            if self.key_to_index.contains_key(&edge.key) {
                return Err(SinkError::DuplicateEdge(edge.key.clone()));
            }
            let endpoint = |id: NodeId| {
                self.id_to_index
                    .get(&id)
                    .copied()
                    .ok_or_else(|| SinkError::UnknownEndpoint {
                        edge: edge.key.clone(),
                        node: id,
                    })
            };
            let from = endpoint(edge.from)?;
            let to = endpoint(edge.to)?;
            let idx = self.graph.add_edge(
                from,
                to,
                ProjectedEdge {
                    key: edge.key.clone(),
                    label: edge.label.clone(),
                    rgb: edge.color.rgb(),
                },
            );
            self.key_to_index.insert(edge.key.clone(), idx);
        }
        Ok(())
    }

    fn update_edges(&mut self, updates: &[EdgeUpdate]) -> Result<(), SinkError> {
        for update in updates {
            let drawn = self
                .key_to_index
                .get(&update.key)
                .and_then(|&idx| self.graph.edge_weight_mut(idx))
                .ok_or_else(|| SinkError::UnknownEdge(update.key.clone()))?;
            drawn.label = update.label.clone();
            drawn.rgb = update.color.rgb();
        }
        Ok(())
    }
}
