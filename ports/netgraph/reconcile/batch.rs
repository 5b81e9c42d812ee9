/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-cycle operation batches for the graph sink.

use indexmap::IndexMap;

use crate::graph::{EdgeKey, EdgeRecord, EdgeUpdate, EdgeUpsert, NodeRecord};
use crate::snapshot::NodeId;

/// Everything a sink needs to catch up with one reconciliation cycle.
///
/// The three lists never share an id: a node or edge created this cycle only
/// ever appears in an `added_*` list, and `updated_edges` only names edges the
/// sink was given in an earlier cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphBatch {
    pub added_nodes: Vec<NodeRecord>,
    pub added_edges: Vec<EdgeRecord>,
    pub updated_edges: Vec<EdgeUpdate>,
}

impl GraphBatch {
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty() && self.added_edges.is_empty() && self.updated_edges.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.added_nodes.len() + self.added_edges.len() + self.updated_edges.len()
    }
}

/// Collects mutations in first-seen order, folding repeats of the same id
#[derive(Default)]
pub(crate) struct BatchBuilder {
    added_nodes: IndexMap<NodeId, NodeRecord>,
    added_edges: IndexMap<EdgeKey, EdgeRecord>,
    updated_edges: IndexMap<EdgeKey, EdgeUpdate>,
}

impl BatchBuilder {
    pub(crate) fn node_added(&mut self, record: NodeRecord) {
        self.added_nodes.entry(record.id).or_insert(record);
    }

    pub(crate) fn edge_upserted(&mut self, upsert: EdgeUpsert) {
        match upsert {
            EdgeUpsert::Created(record) => {
                self.added_edges.insert(record.key.clone(), record);
            },
            EdgeUpsert::Updated(update) => {
                // Edge created earlier in this same cycle: the sink has not
                // seen it yet, so patch the pending add instead.
                if let Some(pending) = self.added_edges.get_mut(&update.key) {
                    pending.label = update.label;
                    pending.color = update.color;
                } else {
                    self.updated_edges.insert(update.key.clone(), update);
                }
            },
            EdgeUpsert::Unchanged => {},
        }
    }

    pub(crate) fn finish(self) -> GraphBatch {
        GraphBatch {
            added_nodes: self.added_nodes.into_values().collect(),
            added_edges: self.added_edges.into_values().collect(),
            updated_edges: self.updated_edges.into_values().collect(),
        }
    }
}
