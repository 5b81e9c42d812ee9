/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Incremental reconciliation of topology snapshots.
//!
//! The `Reconciler` owns the `GraphState` and is its only writer. Each call to
//! `upsert_snapshot` merges one full snapshot into the state and returns the
//! minimal `GraphBatch` a sink needs to mirror the result. Replaying the same
//! snapshot yields an empty batch and leaves the state untouched.

use euclid::default::Point2D;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::graph::{GraphState, NODE_SIZE, NodeRecord, identity};
use crate::snapshot::{NodeId, Snapshot};

mod batch;

pub use batch::GraphBatch;
use batch::BatchBuilder;

/// Square region new nodes are scattered into, on both axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutBounds {
    pub min: f32,
    pub max: f32,
}

impl Default for LayoutBounds {
    fn default() -> Self {
        Self {
            min: 300.0,
            max: 700.0,
        }
    }
}

/// Single writer of the topology model
pub struct Reconciler {
    state: GraphState,
    layout: LayoutBounds,
    rng: StdRng,
}

impl Reconciler {
    pub fn new(layout: LayoutBounds) -> Self {
        Self::with_rng(layout, StdRng::from_entropy())
    }

    /// Deterministic node placement, for reproducible layouts
    pub fn with_seed(layout: LayoutBounds, seed: u64) -> Self {
        Self::with_rng(layout, StdRng::seed_from_u64(seed))
    }

    fn with_rng(layout: LayoutBounds, rng: StdRng) -> Self {
        Self {
            state: GraphState::new(),
            layout,
            rng,
        }
    }

    /// Read-only view of the current model
    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Insert a node on first sight. Returns the new record, or `None` if the
    /// id is already known (existing nodes are never modified).
    pub fn upsert_node(&mut self, id: NodeId, address: &str) -> Option<NodeRecord> {
        self.insert_node(id, address, false)
    }

    fn insert_node(&mut self, id: NodeId, address: &str, is_placeholder: bool) -> Option<NodeRecord> {
        if self.state.contains_node(id) {
            return None;
        }
        let record = NodeRecord {
            id,
            address: address.to_string(),
            position: self.random_position(),
            size: NODE_SIZE,
            is_placeholder,
        };
        self.state.insert_node(record.clone());
        Some(record)
    }

    fn random_position(&mut self) -> Point2D<f32> {
        let LayoutBounds { min, max } = self.layout;
        Point2D::new(self.rng.gen_range(min..=max), self.rng.gen_range(min..=max))
    }

    /// Merge one snapshot into the model.
    ///
    /// A link reported twice under the same key keeps its last observation.
    /// A link whose peer is its own owner is skipped; the rest of the
    /// snapshot is still merged.
    pub fn upsert_snapshot(&mut self, snapshot: &Snapshot) -> GraphBatch {
        let mut builder = BatchBuilder::default();
        for node in &snapshot.nodes {
            if let Some(record) = self.upsert_node(node.id, &node.addr) {
                builder.node_added(record);
            }

            for conn in &node.conns {
                let Some(edge) = identity::resolve(node.id, conn) else {
                    continue;
                };
                if edge.from == edge.to {
                    warn!("Skipping self-link {} reported by node {}", edge.key, node.id);
                    continue;
                }

                // Peers that never report themselves still need a node before
                // an edge can point at them.
                if let Some(placeholder) = self.insert_node(edge.from, &conn.addr, true) {
                    debug!("Created placeholder node {} for edge {}", edge.from, edge.key);
                    builder.node_added(placeholder);
                }

                if let Some(upsert) = self.state.upsert_edge(edge) {
                    builder.edge_upserted(upsert);
                }
            }
        }

        builder.finish()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(LayoutBounds::default())
    }
}
