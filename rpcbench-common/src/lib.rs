use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8545";
pub const DEFAULT_TOTAL_REQUESTS: u64 = 500;
pub const DEFAULT_CONCURRENCY: usize = 50;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Lightweight read method; `net_version` is another good choice.
pub const DEFAULT_METHOD: &str = "eth_blockNumber";
pub const DEFAULT_REQUEST_ID: u64 = 1;

pub const JSONRPC_VERSION: &str = "2.0";

/// Error types for rpcbench runs.
///
/// Only run-level failures are represented here. Per-request failures are
/// data and end up in [`Outcome::Failed`].
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcBenchError {
    #[error("Concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),

    #[error("Export failed: {0}")]
    Export(String),
}

/// Result type for rpcbench operations
pub type Result<T> = std::result::Result<T, RpcBenchError>;

/// JSON-RPC 2.0 request envelope as it goes on the wire.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    /// Always serialized as `[]`.
    pub params: [(); 0],
    pub id: u64,
}

/// Everything needed to issue one benchmark request. Built once per run and
/// shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub endpoint: String,
    pub method: String,
    pub id: u64,
    pub timeout: Duration,
}

impl RequestSpec {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            id: DEFAULT_REQUEST_ID,
            timeout,
        }
    }

    pub fn envelope(&self) -> RpcRequest<'_> {
        RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method: &self.method,
            params: [],
            id: self.id,
        }
    }
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Timeout,
    Connect,
    Other,
}

impl FailureKind {
    pub fn as_name(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connect => "connect",
            FailureKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The call completed and the node answered with this HTTP status.
    Response { status: u16 },
    /// The call never produced a response.
    Failed { kind: FailureKind, error: String },
}

/// One measured request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Dispatch ordinal, starting at 0.
    pub index: u64,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl Sample {
    pub fn status(&self) -> Option<u16> {
        match self.outcome {
            Outcome::Response { status } => Some(status),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Response { .. } => None,
            Outcome::Failed { error, .. } => Some(error),
        }
    }

    /// `true` when the node answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self.status(), Some(s) if (200..300).contains(&s))
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}
