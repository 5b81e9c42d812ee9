/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bpaf::Bpaf;
use log::{error, info, warn};
use netgraph::app::TopologyApp;
use netgraph::config::{ConfigOverrides, ViewerConfig};
use netgraph::fetch::{HttpFetcher, SnapshotFetcher};
use netgraph::poll::PollLoop;
use netgraph::reconcile::Reconciler;
use netgraph::render::worker::SinkWorker;
use netgraph::snapshot::NodeId;
use tokio_util::sync::CancellationToken;

/// Live network topology viewer
#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
struct Opts {
    /// Base URL of the topology API
    #[bpaf(long, argument("URL"))]
    endpoint: Option<String>,

    /// Milliseconds between snapshot fetches
    #[bpaf(long("interval-ms"), argument("MS"))]
    interval_ms: Option<u64>,

    /// Read settings from this file instead of the config directory
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,

    /// Print one node's detail and exit
    #[bpaf(long, argument("NODE_ID"))]
    inspect: Option<NodeId>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = opts().run();
    let overrides = ConfigOverrides {
        api_endpoint: opts.endpoint.clone(),
        poll_interval_ms: opts.interval_ms,
    };
    let config = match ViewerConfig::resolve(opts.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        },
    };

    let fetcher = match HttpFetcher::new(&config) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        },
    };

    match opts.inspect {
        Some(id) => inspect(&config, &fetcher, id).await,
        None => {
            run(&config, fetcher).await;
            ExitCode::SUCCESS
        },
    }
}

async fn run(config: &ViewerConfig, fetcher: Arc<HttpFetcher>) {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, stopping");
                on_interrupt.cancel();
            },
            Err(e) => warn!("Cannot listen for Ctrl-C: {e}"),
        }
    });

    info!("Watching {}", config.nodes_url());
    let poll = PollLoop::new(
        fetcher,
        SinkWorker::spawn(),
        Reconciler::new(config.layout),
        config.poll_interval(),
    )
    .run(cancel)
    .await;

    let stopped = poll.into_sink().shutdown();
    if !stopped.rejected.is_empty() {
        warn!(
            "Sink rejected {} operations during this session",
            stopped.rejected.len()
        );
    }
    if let Some(projection) = stopped.projection {
        info!(
            "Final topology: {} nodes, {} edges",
            projection.node_count(),
            projection.edge_count()
        );
    }
}

async fn inspect(config: &ViewerConfig, fetcher: &HttpFetcher, id: NodeId) -> ExitCode {
    let mut reconciler = Reconciler::new(config.layout);
    let snapshot = match fetcher.fetch_snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        },
    };
    reconciler.upsert_snapshot(&snapshot);

    let mut app = TopologyApp::new();
    if !app.select_node(reconciler.state(), id) {
        error!("Node {id} is not in the topology");
        return ExitCode::FAILURE;
    }
    app.apply_detail(fetcher.fetch_node_detail(id).await);

    let lines = app.detail_lines();
    if lines.is_empty() {
        error!("No detail available for node {id}");
        return ExitCode::FAILURE;
    }
    for line in lines {
        println!("{line}");
    }
    ExitCode::SUCCESS
}
