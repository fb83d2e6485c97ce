//! Dataset - read-only tabular value consumed by every analysis component
//!
//! Wraps a polars `DataFrame` that has already been loaded and cleaned. The
//! analysis core never mutates a dataset in place; sampling and chunking build
//! new derived datasets from row indices or slices.

use crate::error::{AnalystError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic classification of a column, derived from its storage type only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Numeric,
    Categorical,
    Datetime,
    Unknown,
}

impl SemanticType {
    /// Classify a polars storage type. No value parsing happens here.
    pub fn of(dtype: &DataType) -> Self {
        if dtype.is_numeric() {
            SemanticType::Numeric
        } else if matches!(dtype, DataType::String) {
            SemanticType::Categorical
        } else if dtype.is_temporal() {
            SemanticType::Datetime
        } else {
            SemanticType::Unknown
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SemanticType::Numeric => "numeric",
            SemanticType::Categorical => "categorical",
            SemanticType::Datetime => "datetime",
            SemanticType::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    /// Wrap a cleaned frame. Rejects frames with no rows or no columns.
    /// NaN cells of float columns are stored as nulls so every component
    /// counts them as missing.
    pub fn new(frame: DataFrame) -> Result<Self> {
        if frame.width() == 0 {
            return Err(AnalystError::InvalidInput("dataset has no columns".to_string()));
        }
        if frame.height() == 0 {
            return Err(AnalystError::InvalidInput("dataset has no rows".to_string()));
        }
        Ok(Self {
            frame: nan_to_null(frame)?,
        })
    }

    /// Derived datasets (samples, chunks) are built from a non-empty source
    /// and a non-empty selection, so they skip validation.
    pub(crate) fn derived(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn columns(&self) -> &[Series] {
        self.frame.get_columns()
    }

    pub fn column(&self, name: &str) -> Result<&Series> {
        Ok(self.frame.column(name)?)
    }

    pub fn semantic_type(&self, name: &str) -> Option<SemanticType> {
        self.frame
            .column(name)
            .ok()
            .map(|s| SemanticType::of(s.dtype()))
    }

    /// Columns of the given semantic type, in column order
    pub fn columns_of(&self, kind: SemanticType) -> Vec<&Series> {
        self.columns()
            .iter()
            .filter(|s| SemanticType::of(s.dtype()) == kind)
            .collect()
    }

    pub fn null_counts(&self) -> Vec<(String, usize)> {
        self.columns()
            .iter()
            .map(|s| (s.name().to_string(), s.null_count()))
            .collect()
    }

    /// Estimated in-memory size in megabytes
    pub fn estimated_size_mb(&self) -> f64 {
        self.frame.estimated_size() as f64 / (1024.0 * 1024.0)
    }

    /// Build a derived dataset from source row positions, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Result<Dataset> {
        let indices: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
        let idx = IdxCa::from_vec("idx", indices);
        let frame = self.frame.take(&idx)?;
        Ok(Dataset::derived(frame))
    }

    /// Contiguous row range; `len` is clamped to the rows available.
    pub fn slice(&self, offset: usize, len: usize) -> Dataset {
        Dataset::derived(self.frame.slice(offset as i64, len))
    }
}

fn nan_to_null(frame: DataFrame) -> Result<DataFrame> {
    let floats: Vec<Expr> = frame
        .get_columns()
        .iter()
        .filter(|s| s.dtype().is_float())
        .map(|s| col(s.name()).fill_nan(lit(NULL)))
        .collect();
    if floats.is_empty() {
        return Ok(frame);
    }
    Ok(frame.lazy().with_columns(floats).collect()?)
}

/// Render every cell of a column as text (`None` for nulls).
pub fn render_cells(series: &Series) -> Result<Vec<Option<String>>> {
    let as_text = series.cast(&DataType::String)?;
    let ca = as_text.str()?;
    Ok(ca.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}

/// Numeric view of a column (`None` for nulls and NaN).
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let as_float = series.cast(&DataType::Float64)?;
    let ca = as_float.f64()?;
    Ok(ca
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}
