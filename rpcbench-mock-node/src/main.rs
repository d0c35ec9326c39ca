use clap::{Parser, ValueEnum};
use rpcbench_mock_node::{MockNode, MockNodeConfig, ResponseMode};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, ValueEnum)]
enum Mode {
    Ok,
    Alternate,
    Error,
    Hang,
}

#[derive(Parser, Debug)]
#[command(
    name = "rpcbench-mock-node",
    about = "Stand-in JSON-RPC node for trying out rpcbench"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8545")]
    addr: SocketAddr,

    /// Delay before every answer (milliseconds).
    #[arg(long, default_value_t = 10)]
    latency_ms: u64,

    /// How to answer calls.
    #[arg(long, value_enum, default_value = "ok")]
    mode: Mode,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mode = match args.mode {
        Mode::Ok => ResponseMode::Ok,
        Mode::Alternate => ResponseMode::Alternate,
        Mode::Error => ResponseMode::Error,
        Mode::Hang => ResponseMode::Hang,
    };

    let config = MockNodeConfig {
        address: args.addr,
        latency: Duration::from_millis(args.latency_ms),
        mode,
    };

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    // Log "Listening on <addr>" once the node signals it is bound.
    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            tracing::info!(%addr, ?mode, "Listening");
        }
    });

    MockNode::new(config).run(ready_tx).await?;
    Ok(())
}
