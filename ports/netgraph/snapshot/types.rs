/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Wire types for topology snapshots.
//!
//! Field names follow the backend's JSON (`addr`, `conns`, `node_id`,
//! `loss_percent`), so these structs deserialize a `/api/nodes` body as-is.

use serde::{Deserialize, Serialize};

/// Node identifier assigned by the source system
pub type NodeId = u32;

/// Connection identifier, unique only within its owning node's list
pub type ConnectionId = u64;

/// One full poll response (body of `GET /api/nodes`)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<NodeSnapshot>,
}

/// One node as reported by the backend, with its observed connections
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ping_ts: Option<u64>,
    pub conns: Vec<ConnectionSnapshot>,
}

/// One side of a physical link, as seen by the owning node
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConnectionSnapshot {
    pub id: ConnectionId,
    /// Node on the other end of the link
    pub node_id: NodeId,
    pub protocol: u8,
    /// Address of the peer
    pub addr: String,
    pub status: ConnectionStatus,
    pub direction: ConnectionDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<u64>,
    pub metric: ConnectionMetric,
}

/// Link state reported by the owning node
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Which side initiated the link. Encoded as `0` / `1` on the wire.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum ConnectionDirection {
    Outgoing,
    Incoming,
}

impl TryFrom<u8> for ConnectionDirection {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ConnectionDirection::Outgoing),
            1 => Ok(ConnectionDirection::Incoming),
            other => Err(format!("invalid connection direction {other}")),
        }
    }
}

impl From<ConnectionDirection> for u8 {
    fn from(direction: ConnectionDirection) -> Self {
        match direction {
            ConnectionDirection::Outgoing => 0,
            ConnectionDirection::Incoming => 1,
        }
    }
}

/// Point-in-time link measurement
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionMetric {
    /// Milliseconds
    pub latency: u32,
    /// Kilobits per second
    pub bandwidth: u32,
    pub loss_percent: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_JSON: &str = r#"{
        "id": 1,
        "addr": "10.0.0.1:9000",
        "last_ping_ts": 1700000000,
        "conns": [{
            "id": 9,
            "node_id": 2,
            "protocol": 3,
            "addr": "10.0.0.2:9000",
            "status": "CONNECTED",
            "direction": 1,
            "last_updated_at": 1700000001,
            "metric": { "latency": 10, "bandwidth": 2048, "loss_percent": 0 }
        }]
    }"#;

    #[test]
    fn test_decode_node_snapshot() {
        let node: NodeSnapshot = serde_json::from_str(NODE_JSON).unwrap();
        assert_eq!(node.id, 1);
        assert_eq!(node.addr, "10.0.0.1:9000");
        assert_eq!(node.last_ping_ts, Some(1700000000));

        let conn = &node.conns[0];
        assert_eq!(conn.node_id, 2);
        assert_eq!(conn.status, ConnectionStatus::Connected);
        assert_eq!(conn.direction, ConnectionDirection::Incoming);
        assert_eq!(conn.metric.latency, 10);
        assert_eq!(conn.metric.bandwidth, 2048);
    }

    #[test]
    fn test_optional_timestamps_may_be_absent() {
        let json = r#"{"id": 4, "addr": "a", "conns": []}"#;
        let node: NodeSnapshot = serde_json::from_str(json).unwrap();
        assert!(node.last_ping_ts.is_none());
        assert!(node.conns.is_empty());
    }

    #[test]
    fn test_direction_wire_encoding() {
        let outgoing: ConnectionDirection = serde_json::from_str("0").unwrap();
        assert_eq!(outgoing, ConnectionDirection::Outgoing);
        assert_eq!(serde_json::to_string(&ConnectionDirection::Incoming).unwrap(), "1");
        assert!(serde_json::from_str::<ConnectionDirection>("2").is_err());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(serde_json::from_str::<ConnectionStatus>("\"FLAPPING\"").is_err());
        assert_eq!(
            serde_json::from_str::<ConnectionStatus>("\"DISCONNECTED\"").unwrap(),
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn test_missing_metric_is_rejected() {
        let json = r#"{"id": 1, "node_id": 2, "protocol": 0, "addr": "x",
                       "status": "CONNECTED", "direction": 1}"#;
        assert!(serde_json::from_str::<ConnectionSnapshot>(json).is_err());
    }
}
