use rpcbench_common::{FailureKind, Outcome, RequestSpec, Result, RpcBenchError, Sample};
use std::error::Error as _;
use std::time::{Duration, Instant};
use tracing::debug;

pub use reqwest::Url;

/// rpcbench client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Idle connections kept per host; sized to the run's concurrency so every
    /// worker can reuse a warm connection.
    pub pool_max_idle_per_host: usize,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: rpcbench_common::DEFAULT_CONCURRENCY,
            tcp_keepalive: Some(Duration::from_secs(15)),
        }
    }
}

/// Executes single JSON-RPC calls and turns each into a [`Sample`].
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_keepalive(config.tcp_keepalive)
            .build()
            .map_err(|e| RpcBenchError::ClientBuild(describe(&e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// POST the JSON-RPC envelope for `spec` once and measure it.
    ///
    /// Never fails: transport errors are recorded in the returned sample. The
    /// response body is drained so `elapsed` covers the full round trip.
    pub async fn execute(&self, spec: &RequestSpec, index: u64) -> Sample {
        let request = self
            .http_client
            .post(&spec.endpoint)
            .timeout(spec.timeout)
            .json(&spec.envelope());

        let start = Instant::now();
        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.bytes().await {
                    Ok(_) => Outcome::Response { status },
                    Err(e) => failed(&e),
                }
            }
            Err(e) => failed(&e),
        };
        let elapsed = start.elapsed();

        if let Outcome::Failed { kind, error } = &outcome {
            debug!(index, kind = kind.as_name(), error = %error, "request failed");
        }

        Sample {
            index,
            elapsed,
            outcome,
        }
    }
}

fn failed(err: &reqwest::Error) -> Outcome {
    Outcome::Failed {
        kind: classify(err),
        error: describe(err),
    }
}

/// Map a reqwest error onto the coarse failure classes used in reports.
pub fn classify(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() {
        FailureKind::Connect
    } else {
        FailureKind::Other
    }
}

/// Render `err` with its whole source chain; reqwest's own `Display` omits the
/// underlying cause (e.g. "Connection refused").
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }
    message
}
