use rpcbench_common::{FailureKind, Outcome, Sample};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Every sample of a run, in the order the workers finished them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet(pub Vec<Sample>);

impl SampleSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Samples re-ordered by dispatch index.
    pub fn by_index(&self) -> Vec<&Sample> {
        let mut sorted: Vec<&Sample> = self.0.iter().collect();
        sorted.sort_by_key(|s| s.index);
        sorted
    }
}

/// Latency distribution over successful requests, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub mean_s: f64,
    pub median_s: f64,
    pub min_s: f64,
    pub max_s: f64,
    pub p50_s: f64,
    pub p95_s: f64,
    pub p99_s: f64,
}

impl LatencyStats {
    /// Summarize `durations`; `None` when there is nothing to summarize.
    pub fn from_durations(mut durations: Vec<f64>) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }
        durations.sort_by(|a, b| a.total_cmp(b));
        let sorted = durations.as_slice();
        let n = sorted.len();
        Some(Self {
            mean_s: sorted.iter().sum::<f64>() / n as f64,
            median_s: median(sorted)?,
            min_s: sorted[0],
            max_s: sorted[n - 1],
            p50_s: percentile(sorted, 50.0)?,
            p95_s: percentile(sorted, 95.0)?,
            p99_s: percentile(sorted, 99.0)?,
        })
    }
}

/// Why the unsuccessful requests failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FailureBreakdown {
    /// Requests that never got a response, by failure class.
    pub transport: BTreeMap<FailureKind, u64>,
    /// Requests answered with a non-2xx status, by status code.
    pub http_status: BTreeMap<u16, u64>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    /// Requests actually measured.
    pub total_requests: u64,
    /// Requests the run was configured for. Differs from `total_requests`
    /// only when the run was interrupted.
    pub requested_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub total_elapsed_s: f64,
    pub reqs_per_sec: f64,
    /// `None` when no request succeeded.
    pub latency: Option<LatencyStats>,
    pub failures: FailureBreakdown,
    pub interrupted: bool,
}

impl StatsReport {
    pub fn from_samples(
        samples: &SampleSet,
        requested_requests: u64,
        total_elapsed: Duration,
        interrupted: bool,
    ) -> Self {
        let total_requests = samples.len() as u64;
        let mut failures = FailureBreakdown::default();
        let mut successful_times = Vec::with_capacity(samples.len());

        for sample in &samples.0 {
            if sample.is_success() {
                successful_times.push(sample.elapsed_secs());
                continue;
            }
            match &sample.outcome {
                Outcome::Response { status } => {
                    *failures.http_status.entry(*status).or_insert(0) += 1;
                }
                Outcome::Failed { kind, .. } => {
                    *failures.transport.entry(*kind).or_insert(0) += 1;
                }
            }
        }

        let successful_requests = successful_times.len() as u64;
        let total_elapsed_s = total_elapsed.as_secs_f64();

        Self {
            total_requests,
            requested_requests,
            successful_requests,
            failed_requests: total_requests - successful_requests,
            success_rate: ratio(successful_requests as f64, total_requests as f64),
            total_elapsed_s,
            reqs_per_sec: ratio(total_requests as f64, total_elapsed_s),
            latency: LatencyStats::from_durations(successful_times),
            failures,
            interrupted,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Nearest-rank percentile of an ascending slice: the element at
/// `floor(n * p / 100)`, clamped to the last index. No interpolation.
/// Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let idx = (sorted.len() as f64 * p / 100.0).floor().max(0.0) as usize;
    Some(sorted[idx.min(last)])
}

/// Middle element of an ascending slice, or the mean of the two middle
/// elements when the length is even.
pub fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}
