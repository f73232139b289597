use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::errors::AllocatorError;

/// One imported portfolio position assigning a ticker to an industry with a
/// percent-of-industry split. Price and display name are optional; absent
/// prices resolve later through the quote service.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioRow {
    pub ticker: String,
    pub industry: String,
    pub pct_of_industry: f64,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub security_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortfolioFile {
    positions: Vec<PortfolioRow>,
}

/// Load a portfolio file for bulk ticker seeding.
#[instrument(fields(path = %path.as_ref().display()))]
pub fn load_portfolio(
    path: impl AsRef<Path> + std::fmt::Debug,
) -> Result<Vec<PortfolioRow>, AllocatorError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| AllocatorError::DataFile {
        path: path.display().to_string(),
        source,
    })?;
    let file: PortfolioFile =
        serde_json::from_str(&content).map_err(|source| AllocatorError::DataFormat {
            path: path.display().to_string(),
            source,
        })?;

    for row in &file.positions {
        debug!(
            ticker = %row.ticker,
            industry = %row.industry,
            pct_of_industry = row.pct_of_industry,
            "Loaded portfolio row"
        );
    }
    info!(row_count = file.positions.len(), "Portfolio positions loaded");
    Ok(file.positions)
}
