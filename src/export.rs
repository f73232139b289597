use std::fs;
use std::path::Path;

use tracing::{info, instrument};

use crate::errors::AllocatorError;
use crate::model::TradeLine;

/// Write the broker-upload file: one `account,ticker,shares` line per
/// executable trade. Rows with a blank ticker or no whole shares are not
/// executable and are dropped here, downstream of the engine.
#[instrument(skip(path, lines), fields(path = %path.as_ref().display()))]
pub fn write_broker_upload(
    path: impl AsRef<Path>,
    account_id: &str,
    lines: &[TradeLine],
) -> Result<usize, AllocatorError> {
    let path = path.as_ref();
    let mut out = String::from("account,ticker,shares\n");
    let mut written = 0usize;

    for line in lines {
        if line.ticker.is_empty() || line.shares <= 0 {
            continue;
        }
        out.push_str(&format!("{},{},{}\n", account_id, line.ticker, line.shares));
        written += 1;
    }

    fs::write(path, out).map_err(|source| AllocatorError::DataFile {
        path: path.display().to_string(),
        source,
    })?;
    info!(trade_count = written, "Broker upload written");
    Ok(written)
}
