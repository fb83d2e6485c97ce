//! CSV ingestion: upload checks, loading, validation and cleaning.
//!
//! Produces the read-only `Dataset` the analysis core works on.

use crate::config::Settings;
use crate::dataset::Dataset;
use crate::error::{AnalystError, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv"];
/// Minimum data rows a file must hold
pub const MIN_ROWS: usize = 2;
/// A text column becomes numeric when more than this share of rows parse
const NUMERIC_SHARE: f64 = 0.5;

/// Check extension and size before reading anything.
pub fn validate_upload(path: &Path, size_bytes: u64, max_file_size_mb: u64) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AnalystError::Ingestion(format!(
            "Unsupported file type. Supported types: {}",
            SUPPORTED_EXTENSIONS
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    if size_bytes > max_file_size_mb * 1024 * 1024 {
        return Err(AnalystError::Ingestion(format!(
            "File too large. Maximum size: {}MB",
            max_file_size_mb
        )));
    }

    Ok(())
}

/// Read, validate and clean a CSV file.
pub fn load_csv(path: impl AsRef<Path>, settings: &Settings) -> Result<Dataset> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)?.len();
    validate_upload(path, size, settings.max_file_size_mb)?;

    info!("Loading CSV {}", path.display());
    let frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_try_parse_dates(true)
        .with_infer_schema_length(Some(1000))
        .finish()
        .map_err(|e| AnalystError::Ingestion(format!("Failed to read CSV: {}", e)))?
        .collect()
        .map_err(|e| AnalystError::Ingestion(format!("Failed to read CSV: {}", e)))?;

    validate_frame(&frame, settings.max_columns)?;
    let frame = clean_frame(frame)?;
    info!("Loaded {} rows x {} columns", frame.height(), frame.width());

    Dataset::new(frame)
}

pub fn validate_frame(frame: &DataFrame, max_columns: usize) -> Result<()> {
    if frame.width() == 0 {
        return Err(AnalystError::Ingestion("The uploaded file has no columns".to_string()));
    }
    if frame.height() == 0 {
        return Err(AnalystError::Ingestion("The uploaded file is empty".to_string()));
    }
    if frame.height() < MIN_ROWS {
        return Err(AnalystError::Ingestion(format!(
            "The file must contain at least {} rows of data",
            MIN_ROWS
        )));
    }
    if frame.width() > max_columns {
        return Err(AnalystError::Ingestion(format!(
            "The file has too many columns (maximum {} supported)",
            max_columns
        )));
    }
    Ok(())
}

/// Drop all-null rows and columns, trim text cells, and convert mostly
/// numeric text columns to Float64.
pub fn clean_frame(frame: DataFrame) -> Result<DataFrame> {
    let kept: Vec<Series> = frame
        .get_columns()
        .iter()
        .filter(|s| s.null_count() < s.len())
        .cloned()
        .collect();
    let dropped_columns = frame.width() - kept.len();
    if kept.is_empty() {
        return Err(AnalystError::Ingestion("Every column is empty".to_string()));
    }
    let frame = DataFrame::new(kept)?;

    let mut mask = BooleanChunked::full("mask", false, frame.height());
    for series in frame.get_columns() {
        mask = &mask | &series.is_not_null();
    }
    let before = frame.height();
    let frame = frame.filter(&mask)?;
    debug!(
        "Dropped {} empty columns and {} empty rows",
        dropped_columns,
        before - frame.height()
    );

    let height = frame.height();
    let columns = frame
        .get_columns()
        .iter()
        .map(|s| normalize_text_column(s, height))
        .collect::<Result<Vec<_>>>()?;

    Ok(DataFrame::new(columns)?)
}

fn normalize_text_column(series: &Series, height: usize) -> Result<Series> {
    if !matches!(series.dtype(), DataType::String) {
        return Ok(series.clone());
    }

    let trimmed: StringChunked = series.str()?.into_iter().map(|v| v.map(str::trim)).collect();

    let parsed: Float64Chunked = trimmed
        .into_iter()
        .map(|v| v.filter(|s| !s.is_empty()).and_then(|s| s.parse::<f64>().ok()))
        .collect();
    let numeric_count = parsed.len() - parsed.null_count();

    let mut out = if height > 0 && numeric_count as f64 / height as f64 > NUMERIC_SHARE {
        debug!("Converting column '{}' to numeric", series.name());
        parsed.into_series()
    } else {
        trimmed.into_series()
    };
    out.rename(series.name());
    Ok(out)
}
