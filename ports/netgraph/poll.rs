/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The poll loop: fetch, reconcile, push to the sink, wait, repeat.
//!
//! Cycles run strictly one after another. The fetch is the only suspension
//! point, so a snapshot is fully reconciled and its batch handed to the sink
//! before the next fetch starts.

use crate::fetch::{FetchError, SnapshotFetcher};
use crate::graph::GraphState;
use crate::reconcile::{GraphBatch, Reconciler};
use crate::render::{apply_batch, GraphSink, SinkError};
use crate::snapshot::Snapshot;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Counts from one completed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub added_nodes: usize,
    pub added_edges: usize,
    pub updated_edges: usize,
    pub total_nodes: usize,
    pub total_edges: usize,
}

impl CycleReport {
    fn new(batch: &GraphBatch, state: &GraphState) -> Self {
        Self {
            added_nodes: batch.added_nodes.len(),
            added_edges: batch.added_edges.len(),
            updated_edges: batch.updated_edges.len(),
            total_nodes: state.node_count(),
            total_edges: state.edge_count(),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.added_nodes == 0 && self.added_edges == 0 && self.updated_edges == 0
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "+{} nodes, +{} edges, ~{} edges ({} nodes, {} edges total)",
            self.added_nodes,
            self.added_edges,
            self.updated_edges,
            self.total_nodes,
            self.total_edges
        )
    }
}

/// Why a cycle did not complete
#[derive(Debug)]
pub enum CycleError {
    /// Nothing usable was fetched; state is unchanged
    Fetch(FetchError),
    /// State was reconciled but the sink refused the batch
    Sink(SinkError),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleError::Fetch(e) => write!(f, "Fetch failed: {e}"),
            CycleError::Sink(e) => write!(f, "Sink rejected batch: {e}"),
        }
    }
}

impl std::error::Error for CycleError {}

pub struct PollLoop<F, S> {
    fetcher: Arc<F>,
    sink: S,
    reconciler: Reconciler,
    interval: Duration,
}

impl<F: SnapshotFetcher, S: GraphSink> PollLoop<F, S> {
    pub fn new(fetcher: Arc<F>, sink: S, reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            fetcher,
            sink,
            reconciler,
            interval,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run a single fetch-reconcile-emit cycle
    pub async fn poll_once(&mut self) -> Result<CycleReport, CycleError> {
        let fetched = self.fetcher.fetch_snapshot().await;
        self.complete_cycle(fetched)
    }

    /// Poll until `cancel` fires, then hand the loop back.
    ///
    /// The first cycle starts immediately. A fetch still in flight when the
    /// token fires is left to finish on its own and its result is dropped.
    pub async fn run(mut self, cancel: CancellationToken) -> Self {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Polling every {}ms", self.interval.as_millis());

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {},
            }

            let fetcher = Arc::clone(&self.fetcher);
            let fetch = tokio::spawn(async move { fetcher.fetch_snapshot().await });

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Cancelled with a fetch in flight, discarding its result");
                    break;
                },
                joined = fetch => joined.unwrap_or_else(|e| {
                    Err(FetchError::Transport(format!("fetch task failed: {e}")))
                }),
            };

            let result = self.complete_cycle(fetched);
            log_cycle(&result);
        }

        info!("Poll loop stopped");
        self
    }

    fn complete_cycle(
        &mut self,
        fetched: Result<Snapshot, FetchError>,
    ) -> Result<CycleReport, CycleError> {
        let snapshot = fetched.map_err(CycleError::Fetch)?;
        let batch = self.reconciler.upsert_snapshot(&snapshot);
        debug!(
            "Reconciled {} nodes, {} connections into {} operations",
            snapshot.nodes.len(),
            snapshot.connection_count(),
            batch.operation_count()
        );
        apply_batch(&mut self.sink, &batch).map_err(CycleError::Sink)?;
        Ok(CycleReport::new(&batch, self.reconciler.state()))
    }
}

fn log_cycle(result: &Result<CycleReport, CycleError>) {
    match result {
        Ok(report) if report.is_quiet() => debug!("No topology changes: {report}"),
        Ok(report) => info!("Topology updated: {report}"),
        Err(e @ CycleError::Sink(_)) => error!("{e}"),
        Err(e) => warn!("Skipping cycle: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKey;
    use crate::reconcile::LayoutBounds;
    use crate::render::projection::PetgraphProjection;
    use crate::snapshot::fixtures::*;
    use crate::snapshot::{NodeId, NodeSnapshot, SnapshotError};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plays back a queue of results, then fails with a transport error
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<Snapshot, FetchError>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<Snapshot, FetchError>>) -> Self {
            Self::with_delay(script, Duration::ZERO)
        }

        fn with_delay(script: Vec<Result<Snapshot, FetchError>>, delay: Duration) -> Self {
            Self {
                script: Mutex::new(script.into()),
                delay,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SnapshotFetcher for ScriptedFetcher {
        async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(FetchError::Transport("script exhausted".to_string())))
        }

        async fn fetch_node_detail(&self, _id: NodeId) -> Option<NodeSnapshot> {
            None
        }
    }

    fn poll_loop(
        fetcher: ScriptedFetcher,
    ) -> (Arc<ScriptedFetcher>, PollLoop<ScriptedFetcher, PetgraphProjection>) {
        let fetcher = Arc::new(fetcher);
        let poll = PollLoop::new(
            Arc::clone(&fetcher),
            PetgraphProjection::new(),
            Reconciler::with_seed(LayoutBounds::default(), 5),
            Duration::from_millis(5000),
        );
        (fetcher, poll)
    }

    #[tokio::test]
    async fn test_poll_once_reports_counts() {
        let (_, mut poll) = poll_loop(ScriptedFetcher::new(vec![
            Ok(snapshot(vec![
                node(1, vec![incoming(9, 2, 10)]),
                node(2, vec![outgoing(9, 1, 10)]),
            ])),
            Ok(snapshot(vec![node(1, vec![incoming(9, 2, 40)])])),
        ]));

        let first = poll.poll_once().await.unwrap();
        assert_eq!(
            first,
            CycleReport {
                added_nodes: 2,
                added_edges: 1,
                updated_edges: 0,
                total_nodes: 2,
                total_edges: 1,
            }
        );

        let second = poll.poll_once().await.unwrap();
        assert_eq!(second.updated_edges, 1);
        assert!(!second.is_quiet());
        assert!(poll.sink().edge(&EdgeKey::new(1, 2, 9)).unwrap().label.contains("ping: 40ms"));
    }

    #[tokio::test]
    async fn test_failed_cycles_leave_state_untouched() {
        let (_, mut poll) = poll_loop(ScriptedFetcher::new(vec![
            Ok(snapshot(vec![node(1, vec![incoming(9, 2, 10)])])),
            Err(FetchError::Transport("connection reset".to_string())),
            Err(FetchError::Decode(SnapshotError::Decode("expected value".to_string()))),
        ]));

        poll.poll_once().await.unwrap();
        assert!(matches!(poll.poll_once().await, Err(CycleError::Fetch(_))));
        assert!(matches!(
            poll.poll_once().await,
            Err(CycleError::Fetch(FetchError::Decode(_)))
        ));

        assert_eq!(poll.reconciler().state().node_count(), 2);
        assert_eq!(poll.sink().node_count(), 2);
    }

    #[tokio::test]
    async fn test_odd_owner_does_not_stall_other_nodes() {
        let (_, mut poll) = poll_loop(ScriptedFetcher::new(vec![
            Ok(snapshot(vec![node(1, vec![incoming(9, 2, 10)])])),
            Ok(snapshot(vec![
                node(1, vec![incoming(9, 2, 75)]),
                node(3, vec![incoming(1, 1, 5), incoming(1, 1, 6)]),
                node(6, vec![incoming(4, 6, 5)]),
            ])),
        ]));

        poll.poll_once().await.unwrap();
        let report = poll.poll_once().await.unwrap();

        assert_eq!(report.updated_edges, 1);
        assert_eq!(report.added_edges, 1);
        assert_eq!(report.total_nodes, 4);
        let drawn = poll.sink().edge(&EdgeKey::new(1, 2, 9)).unwrap();
        assert!(drawn.label.contains("ping: 75ms"));
        assert!(poll.sink().edge(&EdgeKey::new(3, 1, 1)).unwrap().label.contains("ping: 6ms"));
        assert!(poll.sink().edge(&EdgeKey::new(6, 6, 4)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failures_until_cancelled() {
        let (fetcher, poll) = poll_loop(ScriptedFetcher::new(vec![
            Err(FetchError::Timeout(Duration::from_millis(3000))),
            Ok(snapshot(vec![node(1, vec![incoming(9, 2, 10)])])),
            Ok(snapshot(vec![node(1, vec![incoming(9, 2, 10)])])),
        ]));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll.run(cancel.clone()));

        // Ticks at 0s, 5s and 10s; cancel before the 15s tick.
        tokio::time::sleep(Duration::from_millis(12_000)).await;
        cancel.cancel();
        let poll = task.await.unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(poll.reconciler().state().node_count(), 2);
        assert_eq!(poll.sink().edge_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_in_flight_fetch() {
        let (fetcher, poll) = poll_loop(ScriptedFetcher::with_delay(
            vec![Ok(snapshot(vec![node(1, vec![incoming(9, 2, 10)])]))],
            Duration::from_millis(1000),
        ));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
        let poll = task.await.unwrap();

        // The detached fetch may still finish, but nothing reaches the graph.
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(poll.reconciler().state().node_count(), 0);
        assert_eq!(poll.sink().node_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_delays_next_cycle() {
        let (fetcher, poll) = poll_loop(ScriptedFetcher::with_delay(
            vec![
                Ok(snapshot(vec![node(1, vec![])])),
                Ok(snapshot(vec![node(2, vec![])])),
            ],
            Duration::from_millis(7000),
        ));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll.run(cancel.clone()));

        // First fetch completes at 7s; the 5s tick was missed, so the second
        // fetch starts right away and is still running at 9s.
        tokio::time::sleep(Duration::from_millis(9000)).await;
        cancel.cancel();
        let poll = task.await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert!(poll.reconciler().state().contains_node(1));
        assert!(!poll.reconciler().state().contains_node(2));
    }

    #[test]
    fn test_cycle_report_display() {
        let report = CycleReport {
            added_nodes: 1,
            added_edges: 2,
            updated_edges: 3,
            total_nodes: 4,
            total_edges: 5,
        };
        assert_eq!(
            report.to_string(),
            "+1 nodes, +2 edges, ~3 edges (4 nodes, 5 edges total)"
        );
    }
}
