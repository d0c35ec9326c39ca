use rpcbench::config::BenchConfig;
use rpcbench::coordinator::{self, Coordinator};
use rpcbench::export;
use rpcbench_client::{Client, ClientConfig};
use rpcbench_common::{FailureKind, RequestSpec, RpcBenchError};
use rpcbench_mock_node::{MockNode, MockNodeConfig, NodeStats, ResponseMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const NODE_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Start a mock node on a free port; returns its URL and counters.
async fn start_node(latency: Duration, mode: ResponseMode) -> (String, Arc<NodeStats>) {
    let (ready_tx, ready_rx) = oneshot::channel();

    let node = MockNode::new(MockNodeConfig {
        address: "127.0.0.1:0".parse().unwrap(),
        latency,
        mode,
    });
    let stats = node.stats();

    tokio::spawn(async move {
        node.run(ready_tx).await.expect("mock node failed");
    });

    let addr = timeout(NODE_READY_TIMEOUT, ready_rx)
        .await
        .expect("mock node did not start within 60 seconds")
        .expect("mock node ready signal dropped");

    (format!("http://{}", addr), stats)
}

fn config(url: &str, total_requests: u64, concurrency: usize, timeout: Duration) -> BenchConfig {
    BenchConfig {
        endpoint: url.to_string(),
        total_requests,
        concurrency,
        timeout,
        ..BenchConfig::default()
    }
}

#[tokio::test]
async fn test_fast_node_all_requests_succeed() {
    let (url, stats) = start_node(Duration::from_millis(10), ResponseMode::Ok).await;

    let run = coordinator::measure(
        &config(&url, 50, 10, Duration::from_secs(5)),
        CancellationToken::new(),
    )
    .await
    .expect("run failed");
    let report = run.report;

    assert_eq!(report.total_requests, 50);
    assert_eq!(report.successful_requests, 50);
    assert_eq!(report.failed_requests, 0);
    assert_eq!(report.success_rate, 1.0);
    assert_eq!(stats.received(), 50);

    // Every figure sits at the node's 10ms latency plus local overhead.
    let latency = report.latency.expect("latency should be present");
    for v in [
        latency.mean_s,
        latency.median_s,
        latency.min_s,
        latency.max_s,
        latency.p50_s,
        latency.p95_s,
        latency.p99_s,
    ] {
        assert!(v >= 0.01, "latency {v} below the node's delay");
        assert!(v < 1.0, "latency {v} unreasonably high");
    }
    assert!(latency.min_s <= latency.p50_s && latency.p50_s <= latency.p95_s);
    assert!(latency.p95_s <= latency.p99_s && latency.p99_s <= latency.max_s);

    // Throughput is on the order of concurrency / mean latency (1000 req/s
    // here); allow an order of magnitude for slow CI machines.
    let expected = 10.0 / latency.mean_s;
    assert!(
        report.reqs_per_sec > expected / 10.0,
        "throughput {} too low",
        report.reqs_per_sec
    );
    assert!(
        report.reqs_per_sec <= expected * 1.5,
        "throughput {} too high",
        report.reqs_per_sec
    );
}

#[tokio::test]
async fn test_hanging_node_all_requests_time_out() {
    let (url, _stats) = start_node(Duration::ZERO, ResponseMode::Hang).await;

    let run = coordinator::measure(
        &config(&url, 20, 10, Duration::from_millis(50)),
        CancellationToken::new(),
    )
    .await
    .expect("run failed");
    let report = run.report;

    assert_eq!(report.successful_requests, 0);
    assert_eq!(report.failed_requests, 20);
    assert_eq!(report.success_rate, 0.0);
    assert!(report.latency.is_none(), "latency must be absent, not zero");
    assert_eq!(report.failures.transport.get(&FailureKind::Timeout), Some(&20));

    for sample in &run.samples.0 {
        assert!(sample.elapsed >= Duration::from_millis(50));
        assert!(sample.status().is_none());
        assert!(sample.error().is_some());
    }
}

#[tokio::test]
async fn test_alternating_node_half_succeed() {
    let (url, _stats) = start_node(Duration::ZERO, ResponseMode::Alternate).await;

    let run = coordinator::measure(
        &config(&url, 10, 3, Duration::from_secs(5)),
        CancellationToken::new(),
    )
    .await
    .expect("run failed");
    let report = run.report;

    assert_eq!(report.successful_requests, 5);
    assert_eq!(report.failed_requests, 5);
    assert_eq!(report.success_rate, 0.5);
    assert_eq!(report.failures.http_status.get(&500), Some(&5));
    assert!(report.latency.is_some());
}

#[tokio::test]
async fn test_node_never_sees_more_than_concurrency() {
    let (url, stats) = start_node(Duration::from_millis(5), ResponseMode::Ok).await;

    let run = coordinator::measure(
        &config(&url, 100, 5, Duration::from_secs(5)),
        CancellationToken::new(),
    )
    .await
    .expect("run failed");

    assert_eq!(run.report.successful_requests, 100);
    assert!(
        stats.max_in_flight() <= 5,
        "node saw {} concurrent calls",
        stats.max_in_flight()
    );
    assert!(stats.max_in_flight() >= 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_data_not_error() {
    // Reserve a port, then release it so nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{port}");

    let run = coordinator::measure(
        &config(&url, 8, 4, Duration::from_secs(2)),
        CancellationToken::new(),
    )
    .await
    .expect("connection failures must not fail the run");

    assert_eq!(run.report.successful_requests, 0);
    assert_eq!(run.report.failed_requests, 8);
    assert!(run.report.latency.is_none());
    assert_eq!(run.report.failures.transport.get(&FailureKind::Connect), Some(&8));
}

#[tokio::test]
async fn test_invalid_config_fails_before_dispatch() {
    let (url, stats) = start_node(Duration::ZERO, ResponseMode::Ok).await;

    let result = coordinator::measure(
        &config(&url, 10, 0, Duration::from_secs(1)),
        CancellationToken::new(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(stats.received(), 0);
}

#[tokio::test]
async fn test_malformed_endpoint_fails_before_dispatch() {
    let (url, stats) = start_node(Duration::ZERO, ResponseMode::Ok).await;
    let port = url.rsplit(':').next().unwrap().to_string();

    for bad in [format!("http://:{port}"), format!("http://[::1:{port}")] {
        let result = coordinator::measure(
            &config(&bad, 5, 2, Duration::from_secs(1)),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(result.unwrap_err(), RpcBenchError::InvalidEndpoint(bad));
    }
    assert_eq!(stats.received(), 0);
}

#[tokio::test]
async fn test_zero_requests_against_live_node() {
    let (url, stats) = start_node(Duration::ZERO, ResponseMode::Ok).await;

    let run = coordinator::measure(
        &config(&url, 0, 4, Duration::from_secs(1)),
        CancellationToken::new(),
    )
    .await
    .expect("run failed");

    assert_eq!(run.report.total_requests, 0);
    assert_eq!(run.report.reqs_per_sec, 0.0);
    assert_eq!(run.report.success_rate, 0.0);
    assert!(run.report.latency.is_none());
    assert_eq!(stats.received(), 0);
}

#[tokio::test]
async fn test_shared_client_across_runs() {
    let (url, stats) = start_node(Duration::ZERO, ResponseMode::Ok).await;
    let client = Client::new(ClientConfig::default()).unwrap();
    let coordinator = Coordinator::new(client);
    let spec = RequestSpec::new(url, "net_version", Duration::from_secs(5));

    let first = coordinator.run(spec.clone(), 12, 4).await.unwrap();
    let second = coordinator.run(spec, 8, 4).await.unwrap();

    assert_eq!(first.report.successful_requests, 12);
    assert_eq!(second.report.successful_requests, 8);
    assert_eq!(stats.received(), 20);
}

#[tokio::test]
async fn test_csv_export_of_live_run() {
    let (url, _stats) = start_node(Duration::ZERO, ResponseMode::Alternate).await;
    let run = coordinator::measure(
        &config(&url, 6, 2, Duration::from_secs(5)),
        CancellationToken::new(),
    )
    .await
    .expect("run failed");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("samples.csv");
    export::export_csv(&path, &run.samples).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let rows: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(rows.len(), 6);
    for (i, row) in rows.iter().enumerate() {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields[0], (i + 1).to_string());
        assert!(fields[2] == "200" || fields[2] == "500", "unexpected status in {row}");
        assert_eq!(fields[3], "");
    }
}
