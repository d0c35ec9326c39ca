use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rpcbench_common::JSONRPC_VERSION;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// JSON-RPC "internal error" code used for simulated failures.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// JSON-RPC "invalid request" code, returned for a wrong `jsonrpc` version.
pub const INVALID_REQUEST_CODE: i64 = -32600;

/// How the node answers each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Always 200 with a result.
    Ok,
    /// 200 for even arrivals (0, 2, 4, ...), 500 for odd ones.
    Alternate,
    /// Always 500.
    Error,
    /// Never answer.
    Hang,
}

/// Mock node configuration
#[derive(Debug, Clone)]
pub struct MockNodeConfig {
    pub address: SocketAddr,
    /// Delay before every answer.
    pub latency: Duration,
    pub mode: ResponseMode,
}

/// Request counters shared by every handler invocation.
#[derive(Debug, Default)]
pub struct NodeStats {
    received: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

impl NodeStats {
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls handled at the same time so far.
    pub fn max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Count a new call and return its 0-based arrival number.
    fn enter(self: &Arc<Self>) -> (u64, InFlightGuard) {
        let arrival = self.received.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        (arrival, InFlightGuard(Arc::clone(self)))
    }
}

/// Decrements the in-flight gauge when the handler finishes or is dropped.
struct InFlightGuard(Arc<NodeStats>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub latency: Duration,
    pub mode: ResponseMode,
    pub stats: Arc<NodeStats>,
}

impl AppState {
    pub fn new(latency: Duration, mode: ResponseMode) -> Self {
        Self {
            latency,
            mode,
            stats: Arc::new(NodeStats::default()),
        }
    }
}

/// Incoming JSON-RPC call. Any `params` are ignored.
#[derive(Debug, Deserialize)]
pub struct RpcCall {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub id: Value,
}

/// Mock JSON-RPC node
pub struct MockNode {
    config: MockNodeConfig,
    state: AppState,
}

impl MockNode {
    /// Create a new node with the given configuration
    pub fn new(config: MockNodeConfig) -> Self {
        let state = AppState::new(config.latency, config.mode);
        Self { config, state }
    }

    /// Counters for this node; stays valid after `run` consumes the node.
    pub fn stats(&self) -> Arc<NodeStats> {
        Arc::clone(&self.state.stats)
    }

    /// Create the application router with the given state
    pub fn create_router(state: AppState) -> Router {
        Router::new().route("/", post(handle_rpc)).with_state(state)
    }

    /// Run the node, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(
        self,
        ready_tx: tokio::sync::oneshot::Sender<SocketAddr>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = Self::create_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;
        ready_tx.send(local_addr).ok();
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Handler for POST /; answers according to the configured [`ResponseMode`].
///
/// Calls with a `jsonrpc` version other than "2.0" get a 400 and are not
/// counted in [`NodeStats`].
pub async fn handle_rpc(State(state): State<AppState>, Json(call): Json<RpcCall>) -> Response {
    if call.jsonrpc != JSONRPC_VERSION {
        let body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": call.id,
            "error": { "code": INVALID_REQUEST_CODE, "message": "Invalid Request" },
        });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let (arrival, _guard) = state.stats.enter();
    debug!(arrival, method = %call.method, "rpc call");

    if state.mode == ResponseMode::Hang {
        future::pending::<()>().await;
    }
    if !state.latency.is_zero() {
        tokio::time::sleep(state.latency).await;
    }

    let fail = match state.mode {
        ResponseMode::Ok | ResponseMode::Hang => false,
        ResponseMode::Alternate => arrival % 2 == 1,
        ResponseMode::Error => true,
    };

    if fail {
        let body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": call.id,
            "error": { "code": INTERNAL_ERROR_CODE, "message": "Internal error" },
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    } else {
        let body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": call.id,
            "result": format!("{:#x}", arrival + 1),
        });
        (StatusCode::OK, Json(body)).into_response()
    }
}
