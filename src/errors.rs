use thiserror::Error;

/// Error taxonomy for the allocation engine and its collaborators.
///
/// The engine itself never fails: weight edits, toggles, and percent edits
/// degrade malformed input to 0 and always leave a consistent state. Errors
/// here come from the edges — the quote service, the import files, and the
/// broker-upload writer — or from addressing a record that does not exist.
#[derive(Debug, Error)]
pub enum AllocatorError {
    #[error("ticker '{0}' not found by the quote service")]
    TickerNotFound(String),

    #[error("quote lookup for '{0}' timed out")]
    PriceLookupTimeout(String),

    #[error("unknown industry '{0}'")]
    UnknownIndustry(String),

    #[error("unknown ticker row {0}")]
    UnknownTickerRow(u64),

    #[error("failed to read {path}")]
    DataFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    DataFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("quote service request failed")]
    Http(#[from] reqwest::Error),
}
