use rpcbench_common::{Result, RpcBenchError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::stats::SampleSet;

pub const CSV_HEADER: &str = "index,elapsed_s,status_code,error";

/// Write one CSV row per sample, sorted by dispatch index (1-based in the
/// file). Status is empty for transport failures, error is empty otherwise.
pub fn write_csv<W: Write>(mut out: W, samples: &SampleSet) -> std::io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for sample in samples.by_index() {
        let status = sample.status().map(|s| s.to_string()).unwrap_or_default();
        let error = escape_field(sample.error().unwrap_or_default());
        writeln!(
            out,
            "{},{:.6},{},{}",
            sample.index + 1,
            sample.elapsed_secs(),
            status,
            error
        )?;
    }
    out.flush()
}

/// Write the CSV to `path`, replacing any existing file.
pub fn export_csv(path: &Path, samples: &SampleSet) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| RpcBenchError::Export(format!("{}: {e}", path.display())))?;
    write_csv(BufWriter::new(file), samples)
        .map_err(|e| RpcBenchError::Export(format!("{}: {e}", path.display())))
}

/// Quote a field per RFC 4180 when it contains a delimiter, quote or newline.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
