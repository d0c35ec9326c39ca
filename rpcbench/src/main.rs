use clap::{ArgAction, Parser};
use rpcbench::config::{timeout_from_secs, BenchConfig};
use rpcbench::coordinator;
use rpcbench::export;
use rpcbench::report;
use rpcbench_common::{
    DEFAULT_CONCURRENCY, DEFAULT_ENDPOINT, DEFAULT_METHOD, DEFAULT_REQUEST_ID, DEFAULT_TIMEOUT,
    DEFAULT_TOTAL_REQUESTS,
};
use std::path::PathBuf;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpcbench", about = "Measure JSON-RPC latency and throughput of a node")]
struct Args {
    /// JSON-RPC endpoint URL
    #[arg(long, env = "RPCBENCH_URL", default_value = DEFAULT_ENDPOINT)]
    url: String,

    /// Total number of requests to issue
    #[arg(long, env = "RPCBENCH_REQUESTS", default_value_t = DEFAULT_TOTAL_REQUESTS)]
    requests: u64,

    /// Maximum number of requests in flight
    #[arg(long, env = "RPCBENCH_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-request timeout (seconds)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs_f64())]
    timeout: f64,

    /// RPC method to call, e.g. eth_blockNumber or net_version
    #[arg(long, env = "RPCBENCH_METHOD", default_value = DEFAULT_METHOD)]
    method: String,

    /// Write every individual sample to this CSV file
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let timeout = timeout_from_secs(args.timeout).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(3);
    });
    let config = BenchConfig {
        endpoint: args.url.clone(),
        total_requests: args.requests,
        concurrency: args.concurrency,
        timeout,
        method: args.method.clone(),
        request_id: DEFAULT_REQUEST_ID,
    };
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        process::exit(3);
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    println!("{}", report::render_header(&config));

    let run = coordinator::measure(&config, cancel).await.unwrap_or_else(|e| {
        eprintln!("Run failed: {e}");
        process::exit(3);
    });

    if let Some(path) = &args.csv {
        if let Err(e) = export::export_csv(path, &run.samples) {
            eprintln!("{e}");
            process::exit(2);
        }
        println!("CSV saved to: {}", path.display());
    }

    if args.json {
        match report::render_json(&run.report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize report: {e}");
                process::exit(2);
            }
        }
    } else {
        println!();
        print!("{}", report::render_text(&run.report));
    }

    let exit_code = if run.report.total_requests > 0 && run.report.successful_requests == 0 {
        1
    } else {
        0
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// First Ctrl+C drains in-flight requests and reports; the second exits.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("Waiting for in-flight requests (Ctrl+C again to abort)...");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("User requested abort (Ctrl+C twice)");
            process::exit(130);
        }
    });
}
