/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Snapshot decoding.
//!
//! A body either decodes as a whole or not at all. Nothing here touches graph
//! state, so an undecodable body can never leave a half-applied cycle behind.

pub mod types;

pub use types::{
    ConnectionDirection, ConnectionId, ConnectionMetric, ConnectionSnapshot, ConnectionStatus,
    NodeId, NodeSnapshot, Snapshot,
};

/// Decode a `/api/nodes` response body
pub fn decode_snapshot(body: &[u8]) -> Result<Snapshot, SnapshotError> {
    serde_json::from_slice(body).map_err(|e| SnapshotError::Decode(e.to_string()))
}

/// Decode a single-node detail body (`/api/nodes/{id}`)
pub fn decode_node(body: &[u8]) -> Result<NodeSnapshot, SnapshotError> {
    serde_json::from_slice(body).map_err(|e| SnapshotError::Decode(e.to_string()))
}

impl Snapshot {
    /// Total number of connection records across all nodes
    pub fn connection_count(&self) -> usize {
        self.nodes.iter().map(|n| n.conns.len()).sum()
    }
}

/// Reasons a response body is not a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    Decode(String),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Decode(e) => write!(f, "Malformed snapshot: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_decode_snapshot_body() {
        let body = br#"{"nodes": [{"id": 1, "addr": "a:1", "conns": []},
                                  {"id": 2, "addr": "b:2", "conns": []}]}"#;
        let snap = decode_snapshot(body).unwrap();
        assert_eq!(snap.nodes.len(), 2);
        assert_eq!(snap.connection_count(), 0);
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let body = br#"{"nodes": [{"id": 1, "conns": []}]}"#;
        assert!(matches!(decode_snapshot(body), Err(SnapshotError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(decode_snapshot(b"<html>"), Err(SnapshotError::Decode(_))));
        assert!(matches!(decode_node(b""), Err(SnapshotError::Decode(_))));
    }

    #[test]
    fn test_connection_count_includes_mirrors() {
        let snap = snapshot(vec![
            node(1, vec![incoming(9, 2, 10), incoming(9, 2, 30)]),
            node(2, vec![outgoing(9, 1, 10)]),
            node(4, vec![incoming(1, 4, 10)]),
        ]);
        assert_eq!(snap.connection_count(), 4);
    }
}
