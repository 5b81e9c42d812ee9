/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canonical edge identity.
//!
//! Every physical link is reported twice, once by each endpoint, with opposite
//! directions. Only the INCOMING report is canonical: the edge points from the
//! peer to the reporting node and is keyed `"{owner}-{peer}-{conn}"`.

use std::fmt;

use crate::snapshot::{
    ConnectionDirection, ConnectionId, ConnectionSnapshot, ConnectionStatus, NodeId,
};

/// Direction-independent identity of one physical link
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(String);

impl EdgeKey {
    pub fn new(owner: NodeId, peer: NodeId, connection: ConnectionId) -> Self {
        Self(format!("{owner}-{peer}-{connection}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Edge color, derived from link status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeColor {
    Green,
    Red,
}

impl EdgeColor {
    pub fn for_status(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connected => EdgeColor::Green,
            ConnectionStatus::Disconnected => EdgeColor::Red,
        }
    }

    /// CSS color name
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeColor::Green => "green",
            EdgeColor::Red => "red",
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            EdgeColor::Green => (0, 128, 0),
            EdgeColor::Red => (255, 0, 0),
        }
    }
}

/// The visual attributes an edge may change after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeVisual {
    pub label: String,
    pub color: EdgeColor,
}

impl EdgeVisual {
    /// Derive label and color from one observation. A link that is not
    /// connected shows no metric at all.
    pub fn from_connection(conn: &ConnectionSnapshot) -> Self {
        let label = match conn.status {
            ConnectionStatus::Connected => format!(
                "protocol: {}, ping: {}ms, spd: {}kbps, loss: {}%",
                conn.protocol,
                conn.metric.latency,
                conn.metric.bandwidth,
                conn.metric.loss_percent
            ),
            ConnectionStatus::Disconnected => String::new(),
        };
        Self {
            label,
            color: EdgeColor::for_status(conn.status),
        }
    }
}

/// A resolved canonical edge, ready to be upserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEdge {
    pub key: EdgeKey,
    pub from: NodeId,
    pub to: NodeId,
    pub visual: EdgeVisual,
}

/// Resolve one `(owner, connection)` pair. Returns `None` for the OUTGOING
/// mirror report.
pub fn resolve(owner: NodeId, conn: &ConnectionSnapshot) -> Option<CanonicalEdge> {
    if conn.direction != ConnectionDirection::Incoming {
        return None;
    }
    Some(CanonicalEdge {
        key: EdgeKey::new(owner, conn.node_id, conn.id),
        from: conn.node_id,
        to: owner,
        visual: EdgeVisual::from_connection(conn),
    })
}
