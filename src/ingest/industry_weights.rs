use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::errors::AllocatorError;

/// One imported industry-weight row. Both weights arrive as percentages
/// (e.g. "28.5" for 28.5%) and are divided by 100 when entering the model.
#[derive(Debug, Clone, Deserialize)]
pub struct IndustryWeightRow {
    pub industry: String,
    pub benchmark_weight: f64,
    pub model_weight: f64,
}

#[derive(Debug, Deserialize)]
struct IndustryWeightFile {
    industries: Vec<IndustryWeightRow>,
}

/// Load an industry-weights file. Loading the result into the engine replaces
/// the entire industry set and clears all ticker rows.
#[instrument(fields(path = %path.as_ref().display()))]
pub fn load_industry_weights(
    path: impl AsRef<Path> + std::fmt::Debug,
) -> Result<Vec<IndustryWeightRow>, AllocatorError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| AllocatorError::DataFile {
        path: path.display().to_string(),
        source,
    })?;
    let file: IndustryWeightFile =
        serde_json::from_str(&content).map_err(|source| AllocatorError::DataFormat {
            path: path.display().to_string(),
            source,
        })?;

    for row in &file.industries {
        debug!(
            industry = %row.industry,
            benchmark_weight = row.benchmark_weight,
            model_weight = row.model_weight,
            "Loaded industry weight row"
        );
    }
    info!(row_count = file.industries.len(), "Industry weights loaded");
    Ok(file.industries)
}
