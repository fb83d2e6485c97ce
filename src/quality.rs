//! Quality Assessor - missing values and exact duplicate rows

use crate::dataset::Dataset;
use crate::error::Result;
use crate::profiler::percentage;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValues {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnType {
    pub column: String,
    pub dtype: String,
    pub unique_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    /// Only columns with at least one missing value
    pub missing: Vec<MissingValues>,
    /// Rows identical to an earlier row across all columns
    pub duplicate_rows: usize,
    pub duplicate_percentage: f64,
    pub column_types: Vec<ColumnType>,
}

pub fn assess_quality(dataset: &Dataset) -> Result<QualityReport> {
    let total_rows = dataset.height();

    let missing = dataset
        .null_counts()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(column, count)| MissingValues {
            column,
            count,
            percentage: percentage(count, total_rows),
        })
        .collect();

    let duplicate_rows = count_duplicate_rows(dataset)?;

    let column_types = dataset
        .columns()
        .iter()
        .map(|s| {
            Ok(ColumnType {
                column: s.name().to_string(),
                dtype: s.dtype().to_string(),
                unique_count: s.drop_nulls().n_unique()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QualityReport {
        total_rows,
        missing,
        duplicate_rows,
        duplicate_percentage: percentage(duplicate_rows, total_rows),
        column_types,
    })
}

/// Rows that repeat an earlier row exactly across all columns. Independent of
/// row order.
pub fn count_duplicate_rows(dataset: &Dataset) -> Result<usize> {
    let distinct = dataset
        .frame()
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?
        .height();
    Ok(dataset.height() - distinct)
}

impl QualityReport {
    /// The `=== DATA QUALITY ASSESSMENT ===` context section
    pub fn render(&self) -> String {
        let mut info = String::from("=== DATA QUALITY ASSESSMENT ===\n");

        if self.missing.is_empty() {
            info.push_str("• No missing values detected\n");
        } else {
            info.push_str("Missing values:\n");
            for m in &self.missing {
                info.push_str(&format!("  • {}: {} ({:.2}%)\n", m.column, m.count, m.percentage));
            }
        }

        if self.duplicate_rows > 0 {
            info.push_str(&format!(
                "• Duplicate rows: {} ({:.2}%)\n",
                self.duplicate_rows, self.duplicate_percentage
            ));
        } else {
            info.push_str("• No duplicate rows detected\n");
        }

        info.push_str("\nData types:\n");
        for t in &self.column_types {
            info.push_str(&format!(
                "  • {}: {} ({} unique values)\n",
                t.column,
                t.dtype,
                crate::context::thousands(t.unique_count)
            ));
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df!(
            "a" => [Some(1i64), Some(2), Some(1), None, Some(1)],
            "b" => [Some("x"), Some("y"), Some("x"), Some("z"), Some("x")]
        )
        .unwrap()
    }

    #[test]
    fn test_missing_only_lists_affected_columns() {
        let report = assess_quality(&Dataset::new(sample_frame()).unwrap()).unwrap();
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].column, "a");
        assert_eq!(report.missing[0].count, 1);
        assert_eq!(report.missing[0].percentage, 20.0);
        for m in &report.missing {
            assert!(m.percentage > 0.0 && m.percentage <= 100.0);
        }
    }

    #[test]
    fn test_duplicates_count_repeats_of_earlier_rows() {
        let report = assess_quality(&Dataset::new(sample_frame()).unwrap()).unwrap();
        assert_eq!(report.duplicate_rows, 2);
        assert_eq!(report.duplicate_percentage, 40.0);
    }

    #[test]
    fn test_duplicate_count_is_order_independent() {
        let ds = Dataset::new(sample_frame()).unwrap();
        let shuffled = ds.take_rows(&[4, 3, 1, 0, 2]).unwrap();
        assert_eq!(
            count_duplicate_rows(&ds).unwrap(),
            count_duplicate_rows(&shuffled).unwrap()
        );
    }

    #[test]
    fn test_separator_characters_do_not_merge_rows() {
        let df = df!(
            "a" => ["x\u{1f}y", "x"],
            "b" => ["z", "y\u{1f}z"]
        )
        .unwrap();
        assert_eq!(count_duplicate_rows(&Dataset::new(df).unwrap()).unwrap(), 0);

        let nulls = df!("a" => [Some("\u{0}"), None], "b" => [Some(1i64), Some(1)]).unwrap();
        assert_eq!(count_duplicate_rows(&Dataset::new(nulls).unwrap()).unwrap(), 0);
    }

    #[test]
    fn test_nan_cells_count_as_missing() {
        let df = df!(
            "score" => [1.0, f64::NAN, 3.0, f64::NAN],
            "label" => ["a", "b", "c", "d"]
        )
        .unwrap();
        let ds = Dataset::new(df).unwrap();
        let report = assess_quality(&ds).unwrap();
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].column, "score");
        assert_eq!(report.missing[0].count, 2);
        assert_eq!(report.missing[0].percentage, 50.0);

        let stats = crate::summary::numeric_stats(ds.column("score").unwrap()).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, Some(2.0));
    }

    #[test]
    fn test_render_clean_dataset() {
        let df = df!("a" => [1i64, 2, 3]).unwrap();
        let text = assess_quality(&Dataset::new(df).unwrap()).unwrap().render();
        assert!(text.contains("• No missing values detected"));
        assert!(text.contains("• No duplicate rows detected"));
        assert!(text.contains("  • a: i64 (3 unique values)"));
    }
}
