//! Schema/Type Profiler - one `ColumnProfile` per dataset column

use crate::dataset::{Dataset, SemanticType};
use crate::error::Result;
use crate::stats::round_to;
use crate::summary::{categorical_stats, numeric_stats, NumericStats, ValueCount, TOP_K};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Storage type as reported by polars (e.g. `i64`, `str`)
    pub dtype: String,
    /// Distinct non-null values
    pub unique_count: usize,
    pub null_count: usize,
    /// Always within [0, 100]
    pub null_percentage: f64,
    pub numeric: Option<NumericStats>,
    pub top_values: Option<Vec<ValueCount>>,
}

/// Profile every column in dataset order. Read-only.
pub fn profile(dataset: &Dataset) -> Result<Vec<ColumnProfile>> {
    let rows = dataset.height();

    dataset
        .columns()
        .iter()
        .map(|series| {
            let semantic_type = SemanticType::of(series.dtype());
            let null_count = series.null_count();
            let unique_count = series.drop_nulls().n_unique()?;

            let (numeric, top_values) = match semantic_type {
                SemanticType::Numeric => (Some(numeric_stats(series)?), None),
                SemanticType::Categorical => {
                    (None, Some(categorical_stats(series, TOP_K)?.top_values))
                }
                _ => (None, None),
            };

            Ok(ColumnProfile {
                name: series.name().to_string(),
                semantic_type,
                dtype: series.dtype().to_string(),
                unique_count,
                null_count,
                null_percentage: percentage(null_count, rows),
                numeric,
                top_values,
            })
        })
        .collect()
}

/// `part / total * 100`, rounded to two decimals and kept within [0, 100]
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(part as f64 / total as f64 * 100.0, 2).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_profiles_cover_every_column() {
        let df = df!(
            "id" => [1i64, 2, 3, 4],
            "region" => [Some("n"), Some("s"), None, Some("n")],
            "empty" => [None::<f64>, None, None, None]
        )
        .unwrap();
        let ds = Dataset::new(df).unwrap();
        let profiles = profile(&ds).unwrap();

        let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "region", "empty"]);

        let region = &profiles[1];
        assert_eq!(region.semantic_type, SemanticType::Categorical);
        assert_eq!(region.unique_count, 2);
        assert_eq!(region.null_count, 1);
        assert_eq!(region.null_percentage, 25.0);
        assert_eq!(region.top_values.as_ref().unwrap()[0].value, "n");

        // all-null columns keep their storage classification
        let empty = &profiles[2];
        assert_eq!(empty.semantic_type, SemanticType::Numeric);
        assert_eq!(empty.unique_count, 0);
        assert_eq!(empty.null_percentage, 100.0);
        assert!(empty.numeric.as_ref().unwrap().mean.is_none());
    }

    #[test]
    fn test_percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(0, 10), 0.0);
        assert_eq!(percentage(10, 10), 100.0);
    }
}
