use rpcbench_client::Url;
use rpcbench_common::{
    RequestSpec, Result, RpcBenchError, DEFAULT_CONCURRENCY, DEFAULT_ENDPOINT, DEFAULT_METHOD,
    DEFAULT_REQUEST_ID, DEFAULT_TIMEOUT, DEFAULT_TOTAL_REQUESTS,
};
use std::time::Duration;

/// Parameters of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub endpoint: String,
    pub total_requests: u64,
    pub concurrency: usize,
    pub timeout: Duration,
    pub method: String,
    pub request_id: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            total_requests: DEFAULT_TOTAL_REQUESTS,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            method: DEFAULT_METHOD.to_string(),
            request_id: DEFAULT_REQUEST_ID,
        }
    }
}

impl BenchConfig {
    /// Reject parameters that would make the run meaningless before any
    /// request is dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(RpcBenchError::InvalidConcurrency);
        }
        if self.timeout.is_zero() {
            return Err(RpcBenchError::InvalidTimeout(format!(
                "{}",
                self.timeout.as_secs_f64()
            )));
        }
        validate_endpoint(&self.endpoint)
    }

    pub fn request_spec(&self) -> RequestSpec {
        RequestSpec {
            endpoint: self.endpoint.clone(),
            method: self.method.clone(),
            id: self.request_id,
            timeout: self.timeout,
        }
    }
}

/// Convert a timeout given in (fractional) seconds.
pub fn timeout_from_secs(secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(RpcBenchError::InvalidTimeout(secs.to_string()));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| RpcBenchError::InvalidTimeout(secs.to_string()))
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    let invalid = || RpcBenchError::InvalidEndpoint(endpoint.to_string());
    let url = Url::parse(endpoint).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}
