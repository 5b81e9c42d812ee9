/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Sink worker thread.
//!
//! The poll loop must never block on drawing. `SinkWorker` is the loop-side
//! handle: it implements `GraphSink` by sending owned copies over a channel to
//! a background thread that applies them to a `PetgraphProjection`.

use super::projection::PetgraphProjection;
use super::{GraphSink, SinkError};
use crate::graph::{EdgeRecord, EdgeUpdate, NodeRecord};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error};
use std::thread::{self, JoinHandle};

/// Command to send to the sink worker
pub enum SinkCommand {
    AddNodes(Vec<NodeRecord>),

    AddEdges(Vec<EdgeRecord>),

    UpdateEdges(Vec<EdgeUpdate>),

    /// Stop the worker and hand back the projection
    Shutdown,
}

/// What a stopped worker leaves behind
pub struct SinkShutdown {
    /// `None` if the worker thread never started or panicked
    pub projection: Option<PetgraphProjection>,

    /// Rejections nobody collected while the worker ran
    pub rejected: Vec<SinkError>,
}

/// Handle to a projection living on its own thread
pub struct SinkWorker {
    command_tx: Sender<SinkCommand>,
    rejection_rx: Receiver<SinkError>,
    handle: Option<JoinHandle<PetgraphProjection>>,
}

impl SinkWorker {
    /// Start a worker with an empty projection
    pub fn spawn() -> Self {
        Self::spawn_with(PetgraphProjection::new())
    }

    pub fn spawn_with(projection: PetgraphProjection) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (rejection_tx, rejection_rx) = crossbeam_channel::unbounded();

        let handle = thread::Builder::new()
            .name("netgraph-sink".to_string())
            .spawn(move || run_sink_worker(projection, command_rx, rejection_tx))
            .ok();
        if handle.is_none() {
            error!("Failed to spawn sink worker thread");
        }

        Self {
            command_tx,
            rejection_rx,
            handle,
        }
    }

    /// Stop the worker, wait for it to drain its queue, and collect what it
    /// leaves behind
    pub fn shutdown(mut self) -> SinkShutdown {
        let _ = self.command_tx.send(SinkCommand::Shutdown);
        let projection = self.handle.take().and_then(|handle| handle.join().ok());
        SinkShutdown {
            projection,
            rejected: self.rejection_rx.try_iter().collect(),
        }
    }

    fn send(&self, command: SinkCommand) -> Result<(), SinkError> {
        self.command_tx
            .send(command)
            .map_err(|_| SinkError::Disconnected)
    }
}

impl GraphSink for SinkWorker {
    fn add_nodes(&mut self, nodes: &[NodeRecord]) -> Result<(), SinkError> {
        self.send(SinkCommand::AddNodes(nodes.to_vec()))
    }

    fn add_edges(&mut self, edges: &[EdgeRecord]) -> Result<(), SinkError> {
        self.send(SinkCommand::AddEdges(edges.to_vec()))
    }

    fn update_edges(&mut self, updates: &[EdgeUpdate]) -> Result<(), SinkError> {
        self.send(SinkCommand::UpdateEdges(updates.to_vec()))
    }
}

impl Drop for SinkWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.command_tx.send(SinkCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

/// Apply commands until shutdown or until every sender is gone.
/// Only rejections are reported back.
fn run_sink_worker(
    mut projection: PetgraphProjection,
    command_rx: Receiver<SinkCommand>,
    rejection_tx: Sender<SinkError>,
) -> PetgraphProjection {
    for command in command_rx.iter() {
        let result = match command {
            SinkCommand::AddNodes(nodes) => projection.add_nodes(&nodes),
            SinkCommand::AddEdges(edges) => projection.add_edges(&edges),
            SinkCommand::UpdateEdges(updates) => projection.update_edges(&updates),
            SinkCommand::Shutdown => break,
        };

        match result {
            Ok(()) => debug!(
                "Sink holds {} nodes, {} edges",
                projection.node_count(),
                projection.edge_count()
            ),
            Err(e) => {
                error!("Sink rejected operation: {e}");
                let _ = rejection_tx.send(e);
            },
        }
    }
    projection
}
