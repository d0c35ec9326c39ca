use rpcbench_client::{Client, ClientConfig};
use rpcbench_common::{RequestSpec, Result, RpcBenchError, Sample};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::BenchConfig;
use crate::stats::{SampleSet, StatsReport};

/// Something that can perform one measured request.
///
/// [`Client`] is the production implementation; tests plug in doubles.
pub trait Execute: Send + Sync + 'static {
    fn execute(&self, spec: &RequestSpec, index: u64) -> impl Future<Output = Sample> + Send;
}

impl Execute for Client {
    fn execute(&self, spec: &RequestSpec, index: u64) -> impl Future<Output = Sample> + Send {
        Client::execute(self, spec, index)
    }
}

/// Outcome of one run: the raw samples plus their summary.
#[derive(Debug, Clone)]
pub struct Run {
    pub samples: SampleSet,
    pub report: StatsReport,
}

/// Fans a fixed number of requests out over a bounded worker pool and
/// reduces the samples into a [`StatsReport`].
pub struct Coordinator<E> {
    executor: Arc<E>,
    cancel: CancellationToken,
}

impl<E: Execute> Coordinator<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop claiming new requests once `token` is cancelled. Requests already
    /// in flight still complete and are reported.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Issue `total` requests with at most `concurrency` in flight.
    ///
    /// Individual request failures are part of the report. Only a pool that
    /// cannot do its work (zero workers, a panicked worker) fails the run.
    pub async fn run(&self, spec: RequestSpec, total: u64, concurrency: usize) -> Result<Run> {
        if concurrency == 0 {
            return Err(RpcBenchError::InvalidConcurrency);
        }

        let workers = usize::try_from(total).map_or(concurrency, |t| t.min(concurrency));
        let spec = Arc::new(spec);
        let next_index = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::channel::<Sample>(workers.max(1));

        debug!(total, workers, "dispatching");
        let start = Instant::now();
        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(worker(
                Arc::clone(&self.executor),
                Arc::clone(&spec),
                Arc::clone(&next_index),
                total,
                tx.clone(),
                self.cancel.clone(),
            ));
        }
        // Only workers hold senders now, so `recv` ends once they all exit.
        drop(tx);

        let progress_every = (total / 10).max(1);
        let mut samples = Vec::with_capacity(workers);
        let mut last_completion = start;
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
            last_completion = Instant::now();
            let completed = samples.len() as u64;
            if completed % progress_every == 0 {
                info!(completed, total, "requests completed");
            }
        }

        while let Some(joined) = pool.join_next().await {
            joined.map_err(|e| RpcBenchError::WorkerFailed(e.to_string()))?;
        }

        debug!("reducing");
        let samples = SampleSet(samples);
        let interrupted = (samples.len() as u64) < total;
        let total_elapsed: Duration = last_completion - start;
        let report = StatsReport::from_samples(&samples, total, total_elapsed, interrupted);
        Ok(Run { samples, report })
    }
}

async fn worker<E: Execute>(
    executor: Arc<E>,
    spec: Arc<RequestSpec>,
    next_index: Arc<AtomicU64>,
    total: u64,
    tx: mpsc::Sender<Sample>,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        let index = next_index.fetch_add(1, Ordering::Relaxed);
        if index >= total {
            break;
        }
        let sample = executor.execute(&spec, index).await;
        if tx.send(sample).await.is_err() {
            break;
        }
    }
}

/// Validate `config`, build a client sized for it and measure.
pub async fn measure(config: &BenchConfig, cancel: CancellationToken) -> Result<Run> {
    config.validate()?;
    let client = Client::new(ClientConfig {
        pool_max_idle_per_host: config.concurrency,
        ..ClientConfig::default()
    })?;

    info!(
        endpoint = %config.endpoint,
        requests = config.total_requests,
        concurrency = config.concurrency,
        timeout_s = config.timeout.as_secs_f64(),
        method = %config.method,
        "starting measurement"
    );

    let run = Coordinator::new(client)
        .with_cancellation(cancel)
        .run(config.request_spec(), config.total_requests, config.concurrency)
        .await?;

    info!(
        successful = run.report.successful_requests,
        failed = run.report.failed_requests,
        elapsed_s = run.report.total_elapsed_s,
        interrupted = run.report.interrupted,
        "measurement finished"
    );
    Ok(run)
}
