use std::fmt::Write as _;

use crate::config::BenchConfig;
use crate::stats::StatsReport;

/// One-line description of the run, printed before any request goes out.
pub fn render_header(config: &BenchConfig) -> String {
    format!(
        "Measuring: url={} requests={} concurrency={} timeout={}s method={}",
        config.endpoint,
        config.total_requests,
        config.concurrency,
        config.timeout.as_secs_f64(),
        config.method,
    )
}

/// Human-readable results table.
pub fn render_text(report: &StatsReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_text(&mut out, report);
    out
}

fn write_text(out: &mut String, report: &StatsReport) -> std::fmt::Result {
    writeln!(out, "===== RESULTS =====")?;
    if report.interrupted {
        writeln!(
            out,
            "Interrupted:             {} of {} requests measured",
            report.total_requests, report.requested_requests
        )?;
    }
    writeln!(out, "Total requests:          {}", report.total_requests)?;
    writeln!(out, "Successful requests:     {}", report.successful_requests)?;
    writeln!(out, "Failed requests:         {}", report.failed_requests)?;
    writeln!(out, "Success rate:            {:.2}%", report.success_rate * 100.0)?;
    writeln!(out, "Total time (s):          {:.3}", report.total_elapsed_s)?;
    writeln!(out, "Throughput (req/s):      {:.2}", report.reqs_per_sec)?;

    match &report.latency {
        Some(l) => {
            writeln!(out, "Mean (s):                {:.4}", l.mean_s)?;
            writeln!(out, "Median (s):              {:.4}", l.median_s)?;
            writeln!(out, "p50 (s):                 {:.4}", l.p50_s)?;
            writeln!(out, "p95 (s):                 {:.4}", l.p95_s)?;
            writeln!(out, "p99 (s):                 {:.4}", l.p99_s)?;
            writeln!(out, "Min (s):                 {:.4}", l.min_s)?;
            writeln!(out, "Max (s):                 {:.4}", l.max_s)?;
        }
        None => {
            writeln!(out, "No successful requests; latency statistics unavailable.")?;
        }
    }

    let failures = &report.failures;
    if !failures.transport.is_empty() || !failures.http_status.is_empty() {
        writeln!(out, "Failures:")?;
        for (kind, count) in &failures.transport {
            writeln!(out, "  {:<22} {}", kind.as_name(), count)?;
        }
        for (status, count) in &failures.http_status {
            writeln!(out, "  {:<22} {}", format!("HTTP {status}"), count)?;
        }
    }
    Ok(())
}

/// The report as pretty-printed JSON; absent latency figures become `null`.
pub fn render_json(report: &StatsReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
