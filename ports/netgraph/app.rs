/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Viewer state around the topology graph: which node is selected and what
//! its detail lookup returned.

use crate::graph::GraphState;
use crate::snapshot::{ConnectionDirection, NodeId, NodeSnapshot};

/// Main application view state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Whole topology
    Graph,

    /// Detail panel for one node
    Detail(NodeId),
}

/// Main application state
pub struct TopologyApp {
    pub view: View,

    /// Result of the last detail lookup for the selected node
    detail: Option<NodeSnapshot>,
}

impl Default for TopologyApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyApp {
    pub fn new() -> Self {
        Self {
            view: View::Graph,
            detail: None,
        }
    }

    /// Select a node and open its detail panel.
    ///
    /// Returns false if the node is not in the graph. Any detail shown for a
    /// previous selection is dropped until `apply_detail` delivers the new one.
    pub fn select_node(&mut self, graph: &GraphState, id: NodeId) -> bool {
        if !graph.contains_node(id) {
            return false;
        }
        if self.view != View::Detail(id) {
            self.detail = None;
        }
        self.view = View::Detail(id);
        true
    }

    /// Back to the graph view
    pub fn clear_selection(&mut self) {
        self.view = View::Graph;
        self.detail = None;
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        match self.view {
            View::Detail(id) => Some(id),
            View::Graph => None,
        }
    }

    pub fn detail(&self) -> Option<&NodeSnapshot> {
        self.detail.as_ref()
    }

    /// Store the outcome of a detail lookup.
    ///
    /// A lookup that failed clears the panel but keeps the selection. A
    /// response for a node that is no longer selected is ignored.
    pub fn apply_detail(&mut self, detail: Option<NodeSnapshot>) -> bool {
        let Some(selected) = self.selected_node() else {
            return false;
        };
        match detail {
            Some(node) if node.id != selected => false,
            detail => {
                self.detail = detail;
                true
            },
        }
    }

    /// Text of the detail panel, one entry per line
    pub fn detail_lines(&self) -> Vec<String> {
        let Some(node) = &self.detail else {
            return Vec::new();
        };

        let mut lines = vec![format!("Node: {}", node.id), format!("Addr: {}", node.addr)];
        for conn in &node.conns {
            let marker = match conn.direction {
                ConnectionDirection::Outgoing => '\u{25C0}',
                ConnectionDirection::Incoming => '\u{25B6}',
            };
            lines.push(format!("{marker} Node: {}", conn.node_id));
            lines.push(format!("  addr: {}", conn.addr));
            lines.push(format!("  ping: {}ms", conn.metric.latency));
            lines.push(format!("  spd: {}kbps", conn.metric.bandwidth));
            lines.push(format!("  loss: {}%", conn.metric.loss_percent));
        }
        lines
    }
}
