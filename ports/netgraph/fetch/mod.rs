/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Snapshot sources.
//!
//! `SnapshotFetcher` is the seam the poll loop depends on. `HttpFetcher` is
//! the production implementation, talking plain HTTP/1.1 to the topology API.

use crate::config::ViewerConfig;
use crate::snapshot::{decode_node, decode_snapshot, NodeId, NodeSnapshot, Snapshot, SnapshotError};
use http::{Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

/// Source of topology snapshots
pub trait SnapshotFetcher: Send + Sync + 'static {
    /// Fetch the current node list
    fn fetch_snapshot(&self) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;

    /// Fetch one node's detail. Any failure reads as "no detail".
    fn fetch_node_detail(&self, id: NodeId) -> impl Future<Output = Option<NodeSnapshot>> + Send;
}

/// Fetches snapshots over HTTP
pub struct HttpFetcher {
    client: Client<HttpConnector, Empty<Bytes>>,
    nodes_uri: Uri,
    config: ViewerConfig,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &ViewerConfig) -> Result<Self, FetchError> {
        let nodes_uri = parse_uri(&config.nodes_url())?;
        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self {
            client,
            nodes_uri,
            config: config.clone(),
            timeout: config.request_timeout(),
        })
    }

    /// GET a URI and return the body of a 2xx response
    async fn get(&self, uri: Uri) -> Result<Bytes, FetchError> {
        let request = Request::get(uri.clone())
            .header(http::header::ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| FetchError::InvalidUri(e.to_string()))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status));
            }
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            Ok(body.to_bytes())
        };

        let body = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;
        debug!("GET {uri} returned {} bytes", body.len());
        Ok(body)
    }
}

impl SnapshotFetcher for HttpFetcher {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let body = self.get(self.nodes_uri.clone()).await?;
        Ok(decode_snapshot(&body)?)
    }

    async fn fetch_node_detail(&self, id: NodeId) -> Option<NodeSnapshot> {
        let url = self.config.node_detail_url(id);
        let result = match parse_uri(&url) {
            Ok(uri) => self.get(uri).await.and_then(|body| Ok(decode_node(&body)?)),
            Err(e) => Err(e),
        };
        match result {
            Ok(node) => Some(node),
            Err(e) => {
                warn!("No detail for node {id}: {e}");
                None
            },
        }
    }
}

fn parse_uri(url: &str) -> Result<Uri, FetchError> {
    url.parse::<Uri>()
        .map_err(|e| FetchError::InvalidUri(format!("{url}: {e}")))
}

/// Errors from fetching a snapshot
#[derive(Debug)]
pub enum FetchError {
    InvalidUri(String),
    Transport(String),
    Status(StatusCode),
    Timeout(Duration),
    Decode(SnapshotError),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::InvalidUri(e) => write!(f, "Invalid URI: {e}"),
            FetchError::Transport(e) => write!(f, "Transport error: {e}"),
            FetchError::Status(status) => write!(f, "Unexpected status: {status}"),
            FetchError::Timeout(after) => write!(f, "Timed out after {}ms", after.as_millis()),
            FetchError::Decode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<SnapshotError> for FetchError {
    fn from(e: SnapshotError) -> Self {
        FetchError::Decode(e)
    }
}
